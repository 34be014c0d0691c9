//! Routing of protocol messages into per-phase state.
//!
//! The manager owns the bounded `Phase → PhaseData` cache and enforces the
//! phase-ordering rules: stale messages are dropped, future phases are
//! buffered, and outbound votes are produced only for the current phase
//! while this replica participates in it.

use crate::phase::{PhaseData, Round2Outcome};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use phalanx_core::{CommandBatch, NodeId, Phase, StateValue};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct PhaseSlot {
    data: Mutex<PhaseData>,
    decided: AtomicBool,
}

impl PhaseSlot {
    fn new(phase: Phase) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(PhaseData::new(phase)),
            decided: AtomicBool::new(false),
        })
    }
}

pub struct ConsensusManager {
    node_id: NodeId,
    quorum: usize,
    f_plus_one: usize,
    phases: RwLock<LruCache<Phase, Arc<PhaseSlot>>>,
}

impl ConsensusManager {
    pub fn new(node_id: NodeId, quorum: usize, f_plus_one: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self {
            node_id,
            quorum,
            f_plus_one,
            phases: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Phase entries are created lazily on first touch. Reads go through
    /// the shared lock; creation promotes under the exclusive lock, so the
    /// cache evicts the oldest phases first under normal forward progress.
    fn slot(&self, phase: Phase) -> Arc<PhaseSlot> {
        if let Some(slot) = self.phases.read().peek(&phase) {
            return slot.clone();
        }
        self.phases
            .write()
            .get_or_insert(phase, || PhaseSlot::new(phase))
            .clone()
    }

    /// Record a proposal. Returns the round-1 vote to broadcast when this
    /// observation completes the proposal quorum for the current phase.
    pub fn process_proposal(
        &self,
        sender: &NodeId,
        phase: Phase,
        batch: CommandBatch,
        current_phase: Phase,
        in_phase: bool,
    ) -> Option<StateValue> {
        if phase < current_phase {
            trace!("dropping stale proposal from {sender} for phase {phase}");
            return None;
        }
        let slot = self.slot(phase);
        let mut data = slot.data.lock();
        data.register_proposal(sender, batch);

        if phase == current_phase
            && in_phase
            && data.proposal_count() >= self.quorum
            && !data.has_round1_vote(&self.node_id)
        {
            let vote = data.evaluate_initial_vote(self.quorum);
            data.register_round1_vote(&self.node_id, vote);
            debug!("casting round-1 vote {vote} in phase {phase}");
            return Some(vote);
        }
        None
    }

    /// Record this replica's own proposal without producing a vote.
    pub fn register_own_proposal(&self, phase: Phase, batch: CommandBatch) {
        let slot = self.slot(phase);
        slot.data.lock().register_proposal(&self.node_id, batch);
    }

    /// Record a round-1 vote. Returns the round-2 vote to broadcast when
    /// the round-1 quorum for the current phase is complete.
    pub fn process_round1_vote(
        &self,
        sender: &NodeId,
        phase: Phase,
        value: StateValue,
        current_phase: Phase,
        in_phase: bool,
    ) -> Option<StateValue> {
        if phase < current_phase {
            trace!("dropping stale round-1 vote from {sender} for phase {phase}");
            return None;
        }
        let slot = self.slot(phase);
        let mut data = slot.data.lock();
        data.register_round1_vote(sender, value);

        if phase == current_phase
            && in_phase
            && data.round1_vote_count() >= self.quorum
            && !data.has_round2_vote(&self.node_id)
        {
            let vote = data.evaluate_round2_vote(self.quorum);
            data.register_round2_vote(&self.node_id, vote);
            debug!("casting round-2 vote {vote} in phase {phase}");
            return Some(vote);
        }
        None
    }

    /// Record a round-2 vote. Returns the phase outcome once a quorum of
    /// round-2 votes is in and the phase has not committed yet.
    pub fn process_round2_vote(
        &self,
        sender: &NodeId,
        phase: Phase,
        value: StateValue,
        current_phase: Phase,
        in_phase: bool,
    ) -> Option<Round2Outcome> {
        if phase < current_phase {
            trace!("dropping stale round-2 vote from {sender} for phase {phase}");
            return None;
        }
        let slot = self.slot(phase);
        let mut data = slot.data.lock();
        data.register_round2_vote(sender, value);

        if phase == current_phase
            && in_phase
            && data.round2_vote_count() >= self.quorum
            && !slot.decided.load(Ordering::Acquire)
        {
            return Some(data.process_round2_completion(self.f_plus_one));
        }
        None
    }

    /// Atomically claim the commit of `phase`. Exactly one caller per phase
    /// observes `true`; duplicate decisions become no-ops.
    pub fn should_commit_decision(&self, phase: Phase) -> bool {
        let slot = self.slot(phase);
        !slot.decided.swap(true, Ordering::AcqRel)
    }

    /// Drop entries more than `window` phases behind `current_phase`.
    pub fn remove_older_than(&self, current_phase: Phase, window: u64) -> usize {
        let cutoff = current_phase.value().saturating_sub(window);
        let mut phases = self.phases.write();
        let stale: Vec<Phase> = phases
            .iter()
            .map(|(phase, _)| *phase)
            .filter(|phase| phase.value() < cutoff)
            .collect();
        for phase in &stale {
            phases.pop(phase);
        }
        stale.len()
    }

    /// Forget all phase state; used when the cluster connection is lost.
    pub fn clear(&self) {
        self.phases.write().clear();
    }

    pub fn cached_phases(&self) -> usize {
        self.phases.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_core::Command;

    fn node(i: usize) -> NodeId {
        NodeId::new(format!("n{i}"))
    }

    fn manager() -> ConsensusManager {
        // n = 5: quorum = f + 1 = 3
        ConsensusManager::new(node(0), 3, 3, 16)
    }

    fn batch(tag: &str) -> CommandBatch {
        CommandBatch::new(vec![Command::new(format!("SET {tag} 1"))])
    }

    #[test]
    fn stale_messages_are_dropped_silently() {
        let m = manager();
        let vote = m.process_round1_vote(&node(1), Phase::ZERO, StateValue::V1, Phase::new(5), true);
        assert!(vote.is_none());
        // Nothing was created for the stale phase either.
        assert_eq!(m.cached_phases(), 0);
    }

    #[test]
    fn proposal_quorum_triggers_a_single_round1_vote() {
        let m = manager();
        let shared = batch("x");
        m.register_own_proposal(Phase::ZERO, shared.clone());

        assert!(m
            .process_proposal(&node(1), Phase::ZERO, shared.clone(), Phase::ZERO, true)
            .is_none());
        let vote = m.process_proposal(&node(2), Phase::ZERO, shared.clone(), Phase::ZERO, true);
        assert_eq!(vote, Some(StateValue::V1));

        // More proposals do not re-trigger the vote.
        assert!(m
            .process_proposal(&node(3), Phase::ZERO, shared, Phase::ZERO, true)
            .is_none());
    }

    #[test]
    fn no_votes_while_outside_the_phase() {
        let m = manager();
        let shared = batch("x");
        for i in 1..=3 {
            let vote = m.process_proposal(&node(i), Phase::ZERO, shared.clone(), Phase::ZERO, false);
            assert!(vote.is_none());
        }
    }

    #[test]
    fn future_phase_observations_are_buffered() {
        let m = manager();
        let future = Phase::new(3);
        let vote = m.process_round1_vote(&node(1), future, StateValue::V1, Phase::ZERO, true);
        assert!(vote.is_none());
        assert_eq!(m.cached_phases(), 1);
    }

    #[test]
    fn round1_quorum_triggers_round2_vote() {
        let m = manager();
        assert!(m
            .process_round1_vote(&node(1), Phase::ZERO, StateValue::V1, Phase::ZERO, true)
            .is_none());
        assert!(m
            .process_round1_vote(&node(2), Phase::ZERO, StateValue::V1, Phase::ZERO, true)
            .is_none());
        let vote = m.process_round1_vote(&node(3), Phase::ZERO, StateValue::V1, Phase::ZERO, true);
        assert_eq!(vote, Some(StateValue::V1));
    }

    #[test]
    fn round2_quorum_produces_an_outcome() {
        let m = manager();
        let shared = batch("x");
        m.register_own_proposal(Phase::ZERO, shared.clone());
        for i in 1..=3 {
            assert!(m
                .process_proposal(&node(i), Phase::ZERO, shared.clone(), Phase::ZERO, false)
                .is_none());
        }
        assert!(m
            .process_round2_vote(&node(1), Phase::ZERO, StateValue::V1, Phase::ZERO, true)
            .is_none());
        assert!(m
            .process_round2_vote(&node(2), Phase::ZERO, StateValue::V1, Phase::ZERO, true)
            .is_none());
        let outcome = m.process_round2_vote(&node(3), Phase::ZERO, StateValue::V1, Phase::ZERO, true);
        match outcome {
            Some(Round2Outcome::Decide { value, batch }) => {
                assert_eq!(value, StateValue::V1);
                assert_eq!(batch, shared);
            }
            other => panic!("expected a decision, got {other:?}"),
        }
    }

    #[test]
    fn should_commit_decision_fires_once() {
        let m = manager();
        assert!(m.should_commit_decision(Phase::ZERO));
        assert!(!m.should_commit_decision(Phase::ZERO));
        assert!(m.should_commit_decision(Phase::new(1)));
    }

    #[test]
    fn decided_phase_stops_producing_outcomes() {
        let m = manager();
        assert!(m.should_commit_decision(Phase::ZERO));
        for i in 1..=3 {
            let outcome =
                m.process_round2_vote(&node(i), Phase::ZERO, StateValue::V0, Phase::ZERO, true);
            assert!(outcome.is_none());
        }
    }

    #[test]
    fn cache_capacity_is_enforced() {
        let m = ConsensusManager::new(node(0), 3, 3, 4);
        for p in 0..10 {
            m.register_own_proposal(Phase::new(p), batch(&format!("b{p}")));
        }
        assert_eq!(m.cached_phases(), 4);
    }

    #[test]
    fn aged_phases_are_removed() {
        let m = ConsensusManager::new(node(0), 3, 3, 64);
        for p in 0..20 {
            m.register_own_proposal(Phase::new(p), CommandBatch::empty());
        }
        let removed = m.remove_older_than(Phase::new(19), 5);
        assert_eq!(removed, 14);
        assert_eq!(m.cached_phases(), 6);
    }

    #[test]
    fn clear_forgets_everything() {
        let m = manager();
        m.register_own_proposal(Phase::ZERO, CommandBatch::empty());
        m.clear();
        assert_eq!(m.cached_phases(), 0);
    }
}
