//! Processor run responses
//!
//! Every trigger answers `{success, results: {summary, details}, errors?}`.
//! `success` means the run happened; per-claim failures sit in `details`.

use rust_decimal::Decimal;
use serde::Serialize;

use domain_claims::{FilingResult, FollowUpReport, RefundBatchResult, RefundOutcome};

#[derive(Debug, Serialize)]
pub struct BatchResults<S, D> {
    pub summary: S,
    pub details: D,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse<S, D> {
    pub success: bool,
    pub results: BatchResults<S, D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<S, D> BatchResponse<S, D> {
    pub fn new(summary: S, details: D) -> Self {
        Self {
            success: true,
            results: BatchResults { summary, details },
            errors: None,
        }
    }

    /// Attaches error lines; an empty list leaves `errors` out
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = if errors.is_empty() { None } else { Some(errors) };
        self
    }
}

/// `<claim_id>: <message>` for each failed filing
pub fn filing_errors(results: &[FilingResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.claim_id, e)))
        .collect()
}

/// `<claim_id>: <message>` for each failed refund
pub fn refund_errors<'a>(outcomes: impl IntoIterator<Item = &'a RefundOutcome>) -> Vec<String> {
    outcomes
        .into_iter()
        .filter(|o| !o.success && !o.skipped)
        .filter_map(|o| o.error.as_ref().map(|e| format!("{}: {}", o.claim_id, e)))
        .collect()
}

/// Totals across the per-trigger batches of one refund run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefundRunSummary {
    pub batches: usize,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_amount: Decimal,
}

impl From<&[RefundBatchResult]> for RefundRunSummary {
    fn from(batches: &[RefundBatchResult]) -> Self {
        batches.iter().fold(
            RefundRunSummary {
                batches: batches.len(),
                ..Default::default()
            },
            |mut acc, batch| {
                acc.total += batch.summary.total;
                acc.successful += batch.summary.successful;
                acc.failed += batch.summary.failed;
                acc.skipped += batch.summary.skipped;
                acc.total_amount += batch.summary.total_amount;
                acc
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowUpSummary {
    pub overdue: usize,
    pub follow_ups: usize,
    pub airlines: usize,
    pub alerts_queued: usize,
}

impl From<&FollowUpReport> for FollowUpSummary {
    fn from(report: &FollowUpReport) -> Self {
        Self {
            overdue: report.overdue.len(),
            follow_ups: report.follow_ups.values().map(Vec::len).sum(),
            airlines: report.follow_ups.len(),
            alerts_queued: report.alerts_queued,
        }
    }
}
