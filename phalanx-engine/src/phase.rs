//! Per-phase vote tally and the deterministic evaluation rules.
//!
//! [`PhaseData`] records what one replica has observed about a single phase
//! (proposals, round-1 votes, round-2 votes) and computes, deterministically,
//! the vote or decision this replica should emit next. All operations are
//! idempotent per sender: proposals are first-writer-wins, votes overwrite.

use phalanx_core::{BatchId, CommandBatch, CorrelationId, NodeId, Phase, StateValue};
use std::collections::HashMap;
use tracing::warn;

/// What the completed round 2 of a phase yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Round2Outcome {
    /// The phase decides: commit `batch` when `value` is `V1`, the empty
    /// no-op when `V0`.
    Decide {
        value: StateValue,
        batch: CommandBatch,
    },
    /// No decision this phase. The successor phase must respect the locked
    /// value; for `V1` the agreed batch is carried along to be re-proposed.
    CarryForward {
        locked: StateValue,
        batch: Option<CommandBatch>,
    },
}

/// The deterministic coin that breaks round-2 deadlocks.
///
/// A pure function of the phase number, so every replica computes the same
/// outcome. Even phases land on `V0`, odd phases on `V1`.
pub fn coin_flip(phase: Phase) -> StateValue {
    if phase.value() % 2 == 0 {
        StateValue::V0
    } else {
        StateValue::V1
    }
}

#[derive(Debug)]
pub struct PhaseData {
    phase: Phase,
    proposals: HashMap<NodeId, CommandBatch>,
    round1_votes: HashMap<NodeId, StateValue>,
    round2_votes: HashMap<NodeId, StateValue>,
    // Cached tallies, kept consistent with the maps on every write.
    round1_counts: [usize; 2],
    round2_counts: [usize; 3],
}

fn bucket(value: StateValue) -> usize {
    match value {
        StateValue::V0 => 0,
        StateValue::V1 => 1,
        StateValue::VQuestion => 2,
    }
}

impl PhaseData {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            proposals: HashMap::new(),
            round1_votes: HashMap::new(),
            round2_votes: HashMap::new(),
            round1_counts: [0; 2],
            round2_counts: [0; 3],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Record a proposal. The first proposal from a sender wins; later ones
    /// from the same sender are ignored.
    pub fn register_proposal(&mut self, sender: &NodeId, batch: CommandBatch) {
        self.proposals.entry(sender.clone()).or_insert(batch);
    }

    /// Record a round-1 vote. A later vote from the same sender replaces
    /// the earlier one, with the tallies adjusted accordingly. Round-1
    /// votes are always definite; abstentions are dropped.
    pub fn register_round1_vote(&mut self, sender: &NodeId, value: StateValue) {
        if !value.is_definite() {
            warn!("ignoring indefinite round-1 vote from {sender} in phase {}", self.phase);
            return;
        }
        match self.round1_votes.insert(sender.clone(), value) {
            Some(previous) if previous == value => {}
            Some(previous) => {
                self.round1_counts[bucket(previous)] -= 1;
                self.round1_counts[bucket(value)] += 1;
            }
            None => self.round1_counts[bucket(value)] += 1,
        }
    }

    /// Record a round-2 vote, overwrite semantics as for round 1.
    pub fn register_round2_vote(&mut self, sender: &NodeId, value: StateValue) {
        match self.round2_votes.insert(sender.clone(), value) {
            Some(previous) if previous == value => {}
            Some(previous) => {
                self.round2_counts[bucket(previous)] -= 1;
                self.round2_counts[bucket(value)] += 1;
            }
            None => self.round2_counts[bucket(value)] += 1,
        }
    }

    pub fn has_proposal(&self, sender: &NodeId) -> bool {
        self.proposals.contains_key(sender)
    }

    pub fn has_round1_vote(&self, sender: &NodeId) -> bool {
        self.round1_votes.contains_key(sender)
    }

    pub fn has_round2_vote(&self, sender: &NodeId) -> bool {
        self.round2_votes.contains_key(sender)
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn round1_vote_count(&self) -> usize {
        self.round1_votes.len()
    }

    pub fn round2_vote_count(&self) -> usize {
        self.round2_votes.len()
    }

    pub fn round1_tally(&self, value: StateValue) -> usize {
        match value {
            StateValue::VQuestion => 0,
            definite => self.round1_counts[bucket(definite)],
        }
    }

    pub fn round2_tally(&self, value: StateValue) -> usize {
        self.round2_counts[bucket(value)]
    }

    /// The vote this replica casts on entering round 1: `V1` iff at least
    /// `quorum` of the proposals seen so far carry the same non-empty
    /// correlation id.
    pub fn evaluate_initial_vote(&self, quorum: usize) -> StateValue {
        let mut tallies: HashMap<CorrelationId, usize> = HashMap::new();
        let mut best = 0;
        for batch in self.proposals.values() {
            if batch.is_empty() {
                continue;
            }
            let count = tallies.entry(batch.correlation_id).or_insert(0);
            *count += 1;
            best = best.max(*count);
        }
        if best >= quorum {
            StateValue::V1
        } else {
            StateValue::V0
        }
    }

    /// The vote this replica casts on entering round 2: a value with a
    /// round-1 quorum, otherwise abstention.
    ///
    /// `V0` is checked before `V1`. Quorum intersection forbids both from
    /// holding a quorum at once, so the order is unobservable in reachable
    /// states, but it is part of the protocol definition and is pinned by a
    /// test.
    pub fn evaluate_round2_vote(&self, quorum: usize) -> StateValue {
        if self.round1_counts[bucket(StateValue::V0)] >= quorum {
            StateValue::V0
        } else if self.round1_counts[bucket(StateValue::V1)] >= quorum {
            StateValue::V1
        } else {
            StateValue::VQuestion
        }
    }

    /// Resolve round 2 once enough votes are in.
    ///
    /// `f + 1` matching definite votes decide. A unanimous field of
    /// abstentions falls back to the deterministic coin. A mixed field
    /// without `f + 1` agreement carries the observed definite value into
    /// the next phase, with `V1` taking priority.
    pub fn process_round2_completion(&self, f_plus_one: usize) -> Round2Outcome {
        let v0 = self.round2_counts[bucket(StateValue::V0)];
        let v1 = self.round2_counts[bucket(StateValue::V1)];
        let undecided = self.round2_counts[bucket(StateValue::VQuestion)];

        if v1 >= f_plus_one {
            Round2Outcome::Decide {
                value: StateValue::V1,
                batch: self.agreed_proposal(),
            }
        } else if v0 >= f_plus_one {
            Round2Outcome::Decide {
                value: StateValue::V0,
                batch: CommandBatch::empty(),
            }
        } else if undecided > 0 && undecided == self.round2_votes.len() {
            let value = coin_flip(self.phase);
            let batch = if value == StateValue::V1 {
                self.agreed_proposal()
            } else {
                CommandBatch::empty()
            };
            Round2Outcome::Decide { value, batch }
        } else {
            let locked = if v1 > 0 { StateValue::V1 } else { StateValue::V0 };
            let batch = (locked == StateValue::V1).then(|| self.agreed_proposal());
            Round2Outcome::CarryForward { locked, batch }
        }
    }

    /// The batch backing a `V1` outcome: the non-empty proposal seen from
    /// the most senders, ties broken by the smaller `BatchId`. Falls back
    /// to the canonical empty batch when every proposal is empty.
    pub fn agreed_proposal(&self) -> CommandBatch {
        let mut tallies: HashMap<BatchId, (usize, &CommandBatch)> = HashMap::new();
        for batch in self.proposals.values() {
            if batch.is_empty() {
                continue;
            }
            let entry = tallies.entry(batch.id).or_insert((0, batch));
            entry.0 += 1;
        }
        tallies
            .into_iter()
            .max_by_key(|(id, (count, _))| (*count, std::cmp::Reverse(*id)))
            .map(|(_, (_, batch))| batch.clone())
            .unwrap_or_else(CommandBatch::empty)
    }
}
