//! Claim lifecycle state machine
//!
//! ```text
//! submitted -> validated -> documents_prepared -> ready_to_file -> filed
//!   -> airline_acknowledged -> monitoring -> airline_responded
//!   -> approved | rejected -> completed
//!
//! submitted | validated | ready_to_file | filed | monitoring | rejected
//!   -> refunded (refund processor only, terminal)
//! ```
//!
//! `transition` never mutates a claim. It returns the patch the caller
//! persists through the record store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::{Claim, ClaimPatch, ClaimStatus, RefundTrigger, StatusChange};
use crate::error::ClaimError;

/// Who or what requested a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TransitionCause {
    /// A processor acting on its own schedule
    Auto,
    /// A named operator
    Operator(String),
    /// The refund processor, carrying its trigger
    Refund(RefundTrigger),
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionCause::Auto => f.write_str("auto"),
            TransitionCause::Operator(who) => write!(f, "operator:{}", who),
            TransitionCause::Refund(trigger) => write!(f, "refund:{}", trigger),
        }
    }
}

/// Result of a transition request
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The claim moved; persist the patch
    Applied(ClaimPatch),
    /// The claim was already at the target status
    Unchanged,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    /// The patch to persist, if any
    pub fn into_patch(self) -> Option<ClaimPatch> {
        match self {
            Transition::Applied(patch) => Some(patch),
            Transition::Unchanged => None,
        }
    }
}

/// Checks whether `to` is a direct successor of `from`
pub fn can_transition(from: ClaimStatus, to: ClaimStatus) -> bool {
    use ClaimStatus::*;
    matches!(
        (from, to),
        (Submitted, Validated) |
        (Validated, DocumentsPrepared) |
        (DocumentsPrepared, ReadyToFile) |
        (ReadyToFile, Filed) |
        (Filed, AirlineAcknowledged) |
        (AirlineAcknowledged, Monitoring) |
        (Monitoring, AirlineResponded) |
        (AirlineResponded, Approved) |
        (AirlineResponded, Rejected) |
        (Approved, Completed) |
        (Rejected, Completed) |
        (Submitted, Refunded) |
        (Validated, Refunded) |
        (ReadyToFile, Refunded) |
        (Filed, Refunded) |
        (Monitoring, Refunded) |
        (Rejected, Refunded)
    )
}

/// Direct successors of a status
pub fn successors(from: ClaimStatus) -> Vec<ClaimStatus> {
    ClaimStatus::ALL
        .into_iter()
        .filter(|to| can_transition(from, *to))
        .collect()
}

/// Computes the patch that moves `claim` to `target`
///
/// Already at `target` is success with no patch. `filed_at` is stamped on
/// entry to `filed`; `refunded_at` and `refund_reason` on entry to `refunded`,
/// which also requires a refund cause and drops `filed_at`. The filing time
/// stays in `status_history`.
pub fn transition(
    claim: &Claim,
    target: ClaimStatus,
    cause: TransitionCause,
    now: DateTime<Utc>,
) -> Result<Transition, ClaimError> {
    if claim.status == target {
        return Ok(Transition::Unchanged);
    }

    if !can_transition(claim.status, target) {
        return Err(ClaimError::IllegalTransition {
            from: claim.status,
            to: target,
        });
    }

    let mut patch = ClaimPatch {
        status: Some(target),
        updated_at: Some(now),
        ..Default::default()
    };

    match (target, &cause) {
        (ClaimStatus::Refunded, TransitionCause::Refund(trigger)) => {
            patch.refunded_at = Some(now);
            patch.refund_reason = Some(*trigger);
            patch.clear_filed_at = claim.filed_at.is_some();
        }
        (ClaimStatus::Refunded, _) => return Err(ClaimError::RefundCauseRequired),
        (ClaimStatus::Filed, _) => {
            patch.filed_at = Some(now);
        }
        _ => {}
    }

    patch.history.push(StatusChange {
        from: claim.status,
        to: target,
        cause: cause.to_string(),
        at: now,
    });

    Ok(Transition::Applied(patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_shortcut_to_filed() {
        assert!(!can_transition(ClaimStatus::Submitted, ClaimStatus::Filed));
        assert!(!can_transition(ClaimStatus::Validated, ClaimStatus::Filed));
        assert!(can_transition(ClaimStatus::ReadyToFile, ClaimStatus::Filed));
    }

    #[test]
    fn test_refunded_is_terminal() {
        assert!(successors(ClaimStatus::Refunded).is_empty());
    }

    #[test]
    fn test_refund_sources() {
        let sources: Vec<ClaimStatus> = ClaimStatus::ALL
            .into_iter()
            .filter(|s| can_transition(*s, ClaimStatus::Refunded))
            .collect();
        assert_eq!(
            sources,
            vec![
                ClaimStatus::Submitted,
                ClaimStatus::Validated,
                ClaimStatus::ReadyToFile,
                ClaimStatus::Filed,
                ClaimStatus::Monitoring,
                ClaimStatus::Rejected,
            ]
        );
    }

    #[test]
    fn test_cause_labels() {
        assert_eq!(TransitionCause::Auto.to_string(), "auto");
        assert_eq!(
            TransitionCause::Refund(RefundTrigger::IneligibleFlight).to_string(),
            "refund:ineligible_flight"
        );
        assert_eq!(TransitionCause::Operator("ops-1".into()).to_string(), "operator:ops-1");
    }
}
