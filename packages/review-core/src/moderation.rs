//! Pending-content moderation
//!
//! Tag suggestions, survival guides and uploaded files share one lifecycle:
//! they enter as `pending` and an administrator moves them once to
//! `approved` or `rejected`. This module owns the transition rule and the
//! case-insensitive tag comparison used when approving suggestions.

use serde::{Deserialize, Serialize};

use crate::types::ModerationStatus;

/// Administrator action on a pending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    Approve,
    Reject,
}

impl ModerationDecision {
    pub fn target(self) -> ModerationStatus {
        match self {
            ModerationDecision::Approve => ModerationStatus::Approved,
            ModerationDecision::Reject => ModerationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {decision:?} an item that is already {current}")]
pub struct TransitionError {
    pub current: ModerationStatus,
    pub decision: ModerationDecision,
}

impl ModerationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ModerationStatus::Pending)
    }

    /// Applies `decision`; only `pending` items can move.
    pub fn decide(self, decision: ModerationDecision) -> Result<ModerationStatus, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError {
                current: self,
                decision,
            });
        }
        Ok(decision.target())
    }
}

/// Comparison key for tag names: trimmed and lower-cased.
pub fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Returns the first existing name equal to `candidate` ignoring case.
pub fn find_duplicate_tag<'a, I>(existing: I, candidate: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let key = tag_key(candidate);
    existing.into_iter().find(|name| tag_key(name) == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_either_terminal_state() {
        assert_eq!(
            ModerationStatus::Pending.decide(ModerationDecision::Approve),
            Ok(ModerationStatus::Approved)
        );
        assert_eq!(
            ModerationStatus::Pending.decide(ModerationDecision::Reject),
            Ok(ModerationStatus::Rejected)
        );
    }

    #[test]
    fn terminal_states_do_not_move() {
        for current in [ModerationStatus::Approved, ModerationStatus::Rejected] {
            for decision in [ModerationDecision::Approve, ModerationDecision::Reject] {
                let err = current.decide(decision).unwrap_err();
                assert_eq!(err.current, current);
                assert_eq!(err.decision, decision);
            }
        }
    }

    #[test]
    fn duplicate_detection_ignores_case_and_padding() {
        let existing = ["Great Lecturer", "Hard Exams"];
        assert_eq!(
            find_duplicate_tag(existing.iter().copied(), "  great lecturer "),
            Some("Great Lecturer")
        );
        assert_eq!(find_duplicate_tag(existing.iter().copied(), "Easy Exams"), None);
    }

    #[test]
    fn tag_key_normalizes() {
        assert_eq!(tag_key("  ÇOK Zor "), "çok zor");
    }
}
