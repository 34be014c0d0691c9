use std::time::Duration;

/// Tunables of the consensus engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often aged phase entries are dropped from the cache.
    pub cleanup_interval: Duration,
    /// Base interval between sync requests while dormant; each wait is
    /// jittered to between 50% and 100% of this value.
    pub sync_retry_interval: Duration,
    /// Phase entries this far behind the current phase are dropped by the
    /// periodic cleanup.
    pub remove_older_than_phases: u64,
    /// Capacity of the bounded phase cache.
    pub max_phases_cache: usize,
    /// Capacity of the pending batch pool.
    pub max_pending_batches: usize,
    /// Capacity of the client correlation map.
    pub max_correlation_map: usize,
    /// Depth of the critical worker's task queue. Exhaustion is fatal.
    pub critical_queue_depth: usize,
    /// How long `stop()` waits for the critical worker to drain.
    pub shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(60),
            sync_retry_interval: Duration::from_secs(5),
            remove_older_than_phases: 100,
            max_phases_cache: 1000,
            max_pending_batches: 10_000,
            max_correlation_map: 10_000,
            critical_queue_depth: 4096,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A profile with short intervals, suitable for tests.
    pub fn testing() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(1),
            sync_retry_interval: Duration::from_millis(100),
            ..Self::default()
        }
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_sync_retry_interval(mut self, interval: Duration) -> Self {
        self.sync_retry_interval = interval;
        self
    }

    pub fn with_remove_older_than_phases(mut self, phases: u64) -> Self {
        self.remove_older_than_phases = phases;
        self
    }

    pub fn with_max_phases_cache(mut self, capacity: usize) -> Self {
        self.max_phases_cache = capacity;
        self
    }

    pub fn with_max_pending_batches(mut self, capacity: usize) -> Self {
        self.max_pending_batches = capacity;
        self
    }

    pub fn with_max_correlation_map(mut self, capacity: usize) -> Self {
        self.max_correlation_map = capacity;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
