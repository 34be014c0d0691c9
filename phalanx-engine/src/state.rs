//! Node lifecycle and the bridge to the application state machine.
//!
//! The state manager owns the phase counters and the active/in-phase flags,
//! signals activation to waiters, collects sync responses while dormant,
//! and coordinates snapshot persistence around the lifecycle transitions.

use bytes::Bytes;
use dashmap::DashMap;
use phalanx_core::persistence::{Persistence, SavedState};
use phalanx_core::state_machine::StateMachine;
use phalanx_core::{CommandBatch, NodeId, PhalanxError, Phase, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

pub struct StateManager<SM, PL> {
    current_phase: AtomicU64,
    last_committed_phase: AtomicU64,
    active: AtomicBool,
    in_phase: AtomicBool,
    started: watch::Sender<bool>,
    sync_responses: DashMap<NodeId, SavedState>,
    state_machine: Mutex<SM>,
    persistence: PL,
}

impl<SM, PL> StateManager<SM, PL>
where
    SM: StateMachine,
    PL: Persistence,
{
    pub fn new(state_machine: SM, persistence: PL) -> Self {
        let (started, _) = watch::channel(false);
        Self {
            current_phase: AtomicU64::new(0),
            last_committed_phase: AtomicU64::new(0),
            active: AtomicBool::new(false),
            in_phase: AtomicBool::new(false),
            started,
            sync_responses: DashMap::new(),
            state_machine: Mutex::new(state_machine),
            persistence,
        }
    }

    pub fn current_phase(&self) -> Phase {
        Phase::new(self.current_phase.load(Ordering::Acquire))
    }

    pub fn last_committed_phase(&self) -> Phase {
        Phase::new(self.last_committed_phase.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_in_phase(&self) -> bool {
        self.in_phase.load(Ordering::Acquire)
    }

    /// Mark this replica as participating in the current phase. Returns
    /// whether this call made the transition.
    pub fn enter_phase(&self) -> bool {
        self.in_phase
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Advance past a resolved phase: the current phase becomes the
    /// successor of `resolved` (never moving backwards) and phase
    /// participation is cleared.
    pub fn move_to_next_phase(&self, resolved: Phase) {
        self.current_phase
            .fetch_max(resolved.next().value(), Ordering::AcqRel);
        self.in_phase.store(false, Ordering::Release);
    }

    /// Activation: idempotent; fulfils the start signal and drops the
    /// collected sync responses.
    pub fn activate(&self) {
        if !self.active.swap(true, Ordering::AcqRel) {
            self.sync_responses.clear();
            self.started.send_replace(true);
            info!("node activated at phase {}", self.current_phase());
        }
    }

    /// Resolves once the node has activated.
    pub async fn wait_started(&self) {
        let mut receiver = self.started.subscribe();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }

    /// Full deactivation: persist a snapshot together with the pending
    /// batches, then reset to phase zero with an empty state machine and a
    /// re-armed start signal. Idempotent; only the deactivating call does
    /// the work.
    pub async fn deactivate(&self, pending_batches: Vec<CommandBatch>) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.started.send_replace(false);

        let snapshot = {
            let sm = self.state_machine.lock().await;
            match sm.make_snapshot().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("snapshot failed during deactivation, falling back to persisted state: {e}");
                    match self.persistence.load().await {
                        Ok(Some(saved)) => saved.snapshot,
                        _ => None,
                    }
                }
            }
        };
        let saved = SavedState::new(snapshot, self.last_committed_phase(), pending_batches);
        if let Err(e) = self.persistence.save(&saved).await {
            // The node still resets; peers re-seed it on reconnection.
            error!("failed to persist state during deactivation: {e}");
        }

        self.current_phase.store(0, Ordering::Release);
        self.last_committed_phase.store(0, Ordering::Release);
        self.in_phase.store(false, Ordering::Release);
        self.state_machine.lock().await.reset().await;
        info!("node deactivated");
    }

    /// Stop participating without resetting or persisting anything; used on
    /// engine shutdown.
    pub fn halt(&self) {
        self.active.store(false, Ordering::Release);
        self.in_phase.store(false, Ordering::Release);
    }

    /// Apply a committed batch to the state machine and record the phase as
    /// committed. A state machine failure here is unrecoverable for the
    /// engine.
    pub async fn commit_changes(&self, batch: &CommandBatch, phase: Phase) -> Result<Vec<Bytes>> {
        let results = {
            let mut sm = self.state_machine.lock().await;
            sm.process(&batch.commands).await?
        };
        self.last_committed_phase
            .fetch_max(phase.value(), Ordering::AcqRel);
        Ok(results)
    }

    /// Build the reply to a sync request. Active replicas answer with a
    /// fresh snapshot (falling back to the last persisted state if the
    /// snapshot fails); dormant replicas answer from persistence directly.
    pub async fn create_sync_response(&self, pending_batches: Vec<CommandBatch>) -> SavedState {
        if self.is_active() {
            let snapshot = {
                let sm = self.state_machine.lock().await;
                sm.make_snapshot().await
            };
            match snapshot {
                Ok(snapshot) => {
                    let saved = SavedState::new(
                        Some(snapshot),
                        self.last_committed_phase(),
                        pending_batches,
                    );
                    if let Err(e) = self.persistence.save(&saved).await {
                        warn!("failed to persist sync snapshot: {e}");
                    }
                    saved
                }
                Err(e) => {
                    warn!("snapshot failed, answering from persisted state: {e}");
                    self.persisted_or_initial().await
                }
            }
        } else {
            self.persisted_or_initial().await
        }
    }

    async fn persisted_or_initial(&self) -> SavedState {
        match self.persistence.load().await {
            Ok(Some(saved)) => saved,
            Ok(None) => SavedState::initial(),
            Err(e) => {
                warn!("failed to load persisted state: {e}");
                SavedState::initial()
            }
        }
    }

    /// Record a peer's sync response; returns how many distinct peers have
    /// answered so far.
    pub fn record_sync_response(&self, from: NodeId, saved: SavedState) -> usize {
        self.sync_responses.insert(from, saved);
        self.sync_responses.len()
    }

    /// The response with the highest committed phase.
    pub fn select_best_sync_response(&self) -> Option<SavedState> {
        self.sync_responses
            .iter()
            .max_by_key(|entry| entry.value().last_committed_phase)
            .map(|entry| entry.value().clone())
    }

    pub fn clear_sync_responses(&self) {
        self.sync_responses.clear();
    }

    /// Adopt a peer's saved state: restore (or reset) the state machine,
    /// move both phase counters to the saved committed phase, re-persist,
    /// and hand the saved pending batches back to the caller for merging.
    pub async fn restore_state(&self, saved: SavedState) -> Result<Vec<CommandBatch>> {
        {
            let mut sm = self.state_machine.lock().await;
            match &saved.snapshot {
                Some(snapshot) => sm
                    .restore_snapshot(snapshot)
                    .await
                    .map_err(|e| PhalanxError::restore_failed(e.to_string()))?,
                None => sm.reset().await,
            }
        }
        self.current_phase
            .store(saved.last_committed_phase.value(), Ordering::Release);
        self.last_committed_phase
            .store(saved.last_committed_phase.value(), Ordering::Release);
        self.in_phase.store(false, Ordering::Release);
        if let Err(e) = self.persistence.save(&saved).await {
            warn!("failed to re-persist restored state: {e}");
        }
        Ok(saved.pending_batches)
    }
}
