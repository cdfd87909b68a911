//! Review votes
//!
//! A user holds at most one vote per review. Submitting the same type again
//! removes it, a different type replaces it. The optimistic ledger lets a
//! client show the new state immediately and restore the prior one if the
//! write fails.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::types::VoteType;

// ==================== Toggle planning ====================

/// Persistence action implied by a vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    Added,
    Changed { previous: VoteType },
    Removed,
}

impl VoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteAction::Added => "added",
            VoteAction::Changed { .. } => "changed",
            VoteAction::Removed => "removed",
        }
    }
}

pub fn plan_toggle(existing: Option<VoteType>, requested: VoteType) -> VoteAction {
    match existing {
        None => VoteAction::Added,
        Some(previous) if previous == requested => VoteAction::Removed,
        Some(previous) => VoteAction::Changed { previous },
    }
}

// ==================== Counts ====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub helpful: u32,
    pub missing_parts: u32,
    pub totally_wrong: u32,
    pub rage_bait: u32,
}

impl VoteCounts {
    pub fn from_votes<I: IntoIterator<Item = VoteType>>(votes: I) -> Self {
        let mut counts = Self::default();
        for vote in votes {
            counts.increment(vote);
        }
        counts
    }

    pub fn get(&self, vote: VoteType) -> u32 {
        match vote {
            VoteType::Helpful => self.helpful,
            VoteType::MissingParts => self.missing_parts,
            VoteType::TotallyWrong => self.totally_wrong,
            VoteType::RageBait => self.rage_bait,
        }
    }

    fn slot(&mut self, vote: VoteType) -> &mut u32 {
        match vote {
            VoteType::Helpful => &mut self.helpful,
            VoteType::MissingParts => &mut self.missing_parts,
            VoteType::TotallyWrong => &mut self.totally_wrong,
            VoteType::RageBait => &mut self.rage_bait,
        }
    }

    pub fn increment(&mut self, vote: VoteType) {
        let slot = self.slot(vote);
        *slot = slot.saturating_add(1);
    }

    /// Never goes below zero.
    pub fn decrement(&mut self, vote: VoteType) {
        let slot = self.slot(vote);
        *slot = slot.saturating_sub(1);
    }

    pub fn total(&self) -> u32 {
        self.helpful + self.missing_parts + self.totally_wrong + self.rage_bait
    }
}

/// Reviews with at least `threshold` rage-bait votes are flagged for moderators.
pub fn is_troll(counts: &VoteCounts, threshold: u32) -> bool {
    counts.rage_bait >= threshold
}

/// A viewer's vote on one review together with the review's counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteState {
    pub user_vote: Option<VoteType>,
    pub counts: VoteCounts,
}

impl VoteState {
    /// State after the viewer submits `requested`.
    pub fn toggled(&self, requested: VoteType) -> (VoteState, VoteAction) {
        let action = plan_toggle(self.user_vote, requested);
        let mut counts = self.counts;
        let user_vote = match action {
            VoteAction::Added => {
                counts.increment(requested);
                Some(requested)
            }
            VoteAction::Changed { previous } => {
                counts.decrement(previous);
                counts.increment(requested);
                Some(requested)
            }
            VoteAction::Removed => {
                counts.decrement(requested);
                None
            }
        };
        (VoteState { user_vote, counts }, action)
    }
}

// ==================== Optimistic ledger ====================

/// Handle for one optimistic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Local view of keyed state with undo for unconfirmed writes.
///
/// `apply` installs the new state and remembers what it replaced; the caller
/// later either `confirm`s the ticket once the write succeeds or `rollback`s
/// it to restore the snapshot.
#[derive(Debug, Clone)]
pub struct OptimisticLedger<K, S> {
    states: HashMap<K, S>,
    pending: HashMap<Ticket, (K, Option<S>)>,
    next_ticket: u64,
}

impl<K, S> Default for OptimisticLedger<K, S> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            pending: HashMap::new(),
            next_ticket: 0,
        }
    }
}

impl<K, S> OptimisticLedger<K, S>
where
    K: Eq + Hash + Clone,
    S: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets confirmed state, e.g. from a fresh server read.
    pub fn load(&mut self, key: K, state: S) {
        self.states.insert(key, state);
    }

    pub fn get(&self, key: &K) -> Option<&S> {
        self.states.get(key)
    }

    pub fn apply(&mut self, key: K, next: S) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        let prior = self.states.insert(key.clone(), next);
        self.pending.insert(ticket, (key, prior));
        ticket
    }

    /// Returns false for an unknown or already settled ticket.
    pub fn confirm(&mut self, ticket: Ticket) -> bool {
        self.pending.remove(&ticket).is_some()
    }

    /// Restores the state the ticket replaced.
    pub fn rollback(&mut self, ticket: Ticket) -> bool {
        let Some((key, prior)) = self.pending.remove(&ticket) else {
            return false;
        };
        match prior {
            Some(state) => {
                self.states.insert(key, state);
            }
            None => {
                self.states.remove(&key);
            }
        }
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_plans_add_change_remove() {
        assert_eq!(plan_toggle(None, VoteType::Helpful), VoteAction::Added);
        assert_eq!(
            plan_toggle(Some(VoteType::Helpful), VoteType::Helpful),
            VoteAction::Removed
        );
        assert_eq!(
            plan_toggle(Some(VoteType::Helpful), VoteType::RageBait),
            VoteAction::Changed {
                previous: VoteType::Helpful
            }
        );
    }

    #[test]
    fn toggled_moves_counts_between_types() {
        let start = VoteState {
            user_vote: Some(VoteType::Helpful),
            counts: VoteCounts {
                helpful: 4,
                ..Default::default()
            },
        };
        let (changed, action) = start.toggled(VoteType::TotallyWrong);
        assert_eq!(action.as_str(), "changed");
        assert_eq!(changed.user_vote, Some(VoteType::TotallyWrong));
        assert_eq!(changed.counts.helpful, 3);
        assert_eq!(changed.counts.totally_wrong, 1);

        let (removed, action) = changed.toggled(VoteType::TotallyWrong);
        assert_eq!(action, VoteAction::Removed);
        assert_eq!(removed.user_vote, None);
        assert_eq!(removed.counts.totally_wrong, 0);
    }

    #[test]
    fn counts_never_go_negative() {
        let state = VoteState {
            user_vote: Some(VoteType::RageBait),
            counts: VoteCounts::default(),
        };
        let (next, _) = state.toggled(VoteType::RageBait);
        assert_eq!(next.counts.rage_bait, 0);
    }

    #[test]
    fn troll_threshold_is_inclusive() {
        let counts = VoteCounts::from_votes([VoteType::RageBait; 3]);
        assert!(is_troll(&counts, 3));
        assert!(!is_troll(&counts, 4));
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn rollback_restores_prior_snapshot() {
        let mut ledger: OptimisticLedger<u32, VoteState> = OptimisticLedger::new();
        let initial = VoteState::default();
        ledger.load(7, initial);

        let (next, _) = initial.toggled(VoteType::Helpful);
        let ticket = ledger.apply(7, next);
        assert_eq!(ledger.get(&7).unwrap().counts.helpful, 1);

        assert!(ledger.rollback(ticket));
        assert_eq!(ledger.get(&7), Some(&initial));
        assert!(!ledger.rollback(ticket));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn rollback_of_first_write_removes_key() {
        let mut ledger: OptimisticLedger<&str, u32> = OptimisticLedger::new();
        let ticket = ledger.apply("r1", 1);
        assert!(ledger.rollback(ticket));
        assert_eq!(ledger.get(&"r1"), None);
    }

    #[test]
    fn confirm_keeps_new_state() {
        let mut ledger: OptimisticLedger<&str, u32> = OptimisticLedger::new();
        ledger.load("r1", 1);
        let ticket = ledger.apply("r1", 2);
        assert!(ledger.confirm(ticket));
        assert!(!ledger.rollback(ticket));
        assert_eq!(ledger.get(&"r1"), Some(&2));
    }
}
