//! Custom Test Assertions
//!
//! Assertion helpers that report the claim or batch state on failure.

use domain_claims::{Claim, ClaimStatus, ErrorKind, RefundBatchResult, RefundOutcome};

/// Asserts a claim's status and that its record invariants hold
pub fn assert_claim_status(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "claim {} expected {}, got {} (history: {:?})",
        claim.claim_id, expected, claim.status, claim.status_history
    );
    if let Err(e) = claim.check_invariants() {
        panic!("claim {} violates invariants: {}", claim.claim_id, e);
    }
}

/// Finds the outcome for `claim_id` in a refund batch
pub fn refund_outcome<'a>(batch: &'a RefundBatchResult, claim_id: &str) -> &'a RefundOutcome {
    batch
        .results
        .iter()
        .find(|r| r.claim_id == claim_id)
        .unwrap_or_else(|| panic!("no refund outcome for {} in {:?}", claim_id, batch.results))
}

/// Asserts a refund batch's summary counts
pub fn assert_refund_summary(batch: &RefundBatchResult, successful: usize, skipped: usize, failed: usize) {
    let s = &batch.summary;
    assert_eq!(
        (s.successful, s.skipped, s.failed),
        (successful, skipped, failed),
        "refund summary mismatch: {:?}",
        batch.results
    );
    assert_eq!(s.total, s.successful + s.skipped + s.failed);
}

/// Asserts a refund item failed with the given kind
pub fn assert_refund_failed(batch: &RefundBatchResult, claim_id: &str, kind: ErrorKind) {
    let outcome = refund_outcome(batch, claim_id);
    assert!(!outcome.success && !outcome.skipped, "{} did not fail: {:?}", claim_id, outcome);
    assert_eq!(outcome.error_kind, Some(kind), "{}: {:?}", claim_id, outcome.error);
}
