//! The pending batch pool: a bounded correlation-id map paired with a
//! priority queue ordered by `(timestamp, batch id, correlation id)`.
//!
//! Both structures live behind one mutex so insertion and removal stay
//! atomic. Removal by correlation id leaves a stale heap key behind; the
//! pop path skips keys whose batch is gone.

use phalanx_core::{BatchId, CommandBatch, CorrelationId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    timestamp: u64,
    id: BatchId,
    correlation_id: CorrelationId,
}

impl QueueKey {
    fn of(batch: &CommandBatch) -> Self {
        Self {
            timestamp: batch.timestamp,
            id: batch.id,
            correlation_id: batch.correlation_id,
        }
    }
}

#[derive(Debug)]
pub struct PendingPool {
    capacity: usize,
    by_correlation: HashMap<CorrelationId, CommandBatch>,
    queue: BinaryHeap<Reverse<QueueKey>>,
}

impl PendingPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            by_correlation: HashMap::new(),
            queue: BinaryHeap::new(),
        }
    }

    /// Add a batch to the pool and queue. Returns `false` when the batch is
    /// already present or the pool is at capacity.
    pub fn insert(&mut self, batch: CommandBatch) -> bool {
        if self.by_correlation.contains_key(&batch.correlation_id) {
            return false;
        }
        if self.by_correlation.len() >= self.capacity {
            return false;
        }
        self.queue.push(Reverse(QueueKey::of(&batch)));
        self.by_correlation.insert(batch.correlation_id, batch);
        true
    }

    /// Remove a batch by correlation id, typically because it committed.
    pub fn remove(&mut self, correlation_id: &CorrelationId) -> Option<CommandBatch> {
        self.by_correlation.remove(correlation_id)
    }

    /// Take the oldest pending batch out of the pool.
    pub fn pop_next(&mut self) -> Option<CommandBatch> {
        while let Some(Reverse(key)) = self.queue.pop() {
            if let Some(batch) = self.by_correlation.remove(&key.correlation_id) {
                return Some(batch);
            }
            // Stale key: the batch was removed out of band.
        }
        None
    }

    pub fn contains(&self, correlation_id: &CorrelationId) -> bool {
        self.by_correlation.contains_key(correlation_id)
    }

    /// A snapshot of every pending batch, for sync responses and
    /// deactivation.
    pub fn batches(&self) -> Vec<CommandBatch> {
        self.by_correlation.values().cloned().collect()
    }

    /// Empty the pool, handing every batch back.
    pub fn drain(&mut self) -> Vec<CommandBatch> {
        self.queue.clear();
        self.by_correlation.drain().map(|(_, batch)| batch).collect()
    }

    pub fn len(&self) -> usize {
        self.by_correlation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_correlation.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::Command;

    fn batch_at(timestamp: u64) -> CommandBatch {
        let mut batch = CommandBatch::new(vec![Command::new("SET k v")]);
        batch.timestamp = timestamp;
        batch
    }

    #[test]
    fn pops_in_timestamp_order() {
        let mut pool = PendingPool::new(16);
        let late = batch_at(30);
        let early = batch_at(10);
        let middle = batch_at(20);
        pool.insert(late.clone());
        pool.insert(early.clone());
        pool.insert(middle.clone());

        assert_eq!(pool.pop_next(), Some(early));
        assert_eq!(pool.pop_next(), Some(middle));
        assert_eq!(pool.pop_next(), Some(late));
        assert_eq!(pool.pop_next(), None);
    }

    #[test]
    fn equal_timestamps_fall_back_to_the_batch_id() {
        let mut pool = PendingPool::new(16);
        let a = batch_at(5);
        let b = batch_at(5);
        let first = if a.id < b.id { a.clone() } else { b.clone() };
        pool.insert(a);
        pool.insert(b);
        assert_eq!(pool.pop_next(), Some(first));
    }

    #[test]
    fn removal_by_correlation_skips_stale_heap_keys() {
        let mut pool = PendingPool::new(16);
        let doomed = batch_at(1);
        let survivor = batch_at(2);
        pool.insert(doomed.clone());
        pool.insert(survivor.clone());

        assert_eq!(pool.remove(&doomed.correlation_id), Some(doomed));
        assert_eq!(pool.pop_next(), Some(survivor));
        assert!(pool.is_empty());
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let mut pool = PendingPool::new(16);
        let batch = batch_at(1);
        assert!(pool.insert(batch.clone()));
        assert!(!pool.insert(batch));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut pool = PendingPool::new(2);
        assert!(pool.insert(batch_at(1)));
        assert!(pool.insert(batch_at(2)));
        assert!(!pool.insert(batch_at(3)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn popped_batches_can_be_requeued() {
        let mut pool = PendingPool::new(16);
        let batch = batch_at(1);
        pool.insert(batch.clone());
        let popped = pool.pop_next().unwrap();
        assert!(pool.insert(popped.clone()));
        assert_eq!(pool.pop_next(), Some(popped));
    }

    #[test]
    fn drain_returns_everything() {
        let mut pool = PendingPool::new(16);
        pool.insert(batch_at(1));
        pool.insert(batch_at(2));
        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert!(pool.is_empty());
        assert_eq!(pool.pop_next(), None);
    }
}
