//! Automatic refund processor
//!
//! Refunds the passenger's service fee when a claim cannot succeed. Money
//! moves at most once per claim and trigger: the status is re-read before
//! each refund, an already-refunded claim is skipped without calling the
//! processor, and the refund carries an idempotency key derived from the
//! claim id and trigger so overlapping runs collapse into one refund.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{BatchRunner, ClaimId, IdempotencyKey, Money};

use crate::alerts;
use crate::claim::{Claim, ClaimStatus, ClaimSummary, DocumentationStatus, FlightEligibility, RefundTrigger};
use crate::context::EngineContext;
use crate::error::{ClaimError, ErrorKind};
use crate::lifecycle::{can_transition, transition, Transition, TransitionCause};
use crate::policy::ProcessingPolicy;
use crate::ports::RefundRequest;

/// Claims eligible for an automatic refund, one bucket per trigger
///
/// Buckets are disjoint; a claim matching several triggers lands in the
/// highest-precedence one (rejected, ineligible, insufficient docs, overdue).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundCandidates {
    pub overdue_claims: Vec<ClaimSummary>,
    pub rejected_claims: Vec<ClaimSummary>,
    pub insufficient_doc_claims: Vec<ClaimSummary>,
    pub ineligible_claims: Vec<ClaimSummary>,
}

impl RefundCandidates {
    pub fn bucket(&self, trigger: RefundTrigger) -> &[ClaimSummary] {
        match trigger {
            RefundTrigger::ClaimNotFiledDeadline => &self.overdue_claims,
            RefundTrigger::ClaimRejectedByAirline => &self.rejected_claims,
            RefundTrigger::InsufficientDocumentation => &self.insufficient_doc_claims,
            RefundTrigger::IneligibleFlight => &self.ineligible_claims,
        }
    }

    fn bucket_mut(&mut self, trigger: RefundTrigger) -> &mut Vec<ClaimSummary> {
        match trigger {
            RefundTrigger::ClaimNotFiledDeadline => &mut self.overdue_claims,
            RefundTrigger::ClaimRejectedByAirline => &mut self.rejected_claims,
            RefundTrigger::InsufficientDocumentation => &mut self.insufficient_doc_claims,
            RefundTrigger::IneligibleFlight => &mut self.ineligible_claims,
        }
    }

    pub fn total(&self) -> usize {
        RefundTrigger::ALL.iter().map(|t| self.bucket(*t).len()).sum()
    }
}

/// Trigger that applies to `claim`, if any, by precedence
///
/// Documentation and eligibility triggers apply before filing. The deadline
/// trigger covers the overdue statuses, `ready_to_file` and `filed`, measured
/// against the refund deadline.
pub fn classify(claim: &Claim, now: chrono::DateTime<chrono::Utc>, policy: &ProcessingPolicy) -> Option<RefundTrigger> {
    let pre_filing = matches!(
        claim.status,
        ClaimStatus::Submitted | ClaimStatus::Validated | ClaimStatus::ReadyToFile
    );

    match claim.status {
        ClaimStatus::Rejected => Some(RefundTrigger::ClaimRejectedByAirline),
        _ if pre_filing && claim.eligibility == FlightEligibility::Ineligible => {
            Some(RefundTrigger::IneligibleFlight)
        }
        _ if pre_filing && claim.documentation_status == DocumentationStatus::Insufficient => {
            Some(RefundTrigger::InsufficientDocumentation)
        }
        ClaimStatus::ReadyToFile | ClaimStatus::Filed
            if crate::follow_up::is_overdue(claim, now, policy.refund_deadline_days) =>
        {
            Some(RefundTrigger::ClaimNotFiledDeadline)
        }
        _ => None,
    }
}

/// Per-claim refund outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub claim_id: String,
    pub success: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefundOutcome {
    fn refunded(claim_id: &ClaimId, refund_id: String, amount: Money) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            success: true,
            skipped: false,
            refund_id: Some(refund_id),
            amount: Some(amount),
            error_kind: None,
            error: None,
        }
    }

    fn already_refunded(claim_id: &ClaimId) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            success: false,
            skipped: true,
            refund_id: None,
            amount: None,
            error_kind: None,
            error: Some("already refunded".to_string()),
        }
    }

    fn failed(claim_id: impl Into<String>, kind: Option<ErrorKind>, message: String) -> Self {
        Self {
            claim_id: claim_id.into(),
            success: false,
            skipped: false,
            refund_id: None,
            amount: None,
            error_kind: kind,
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Sum of refunded amounts
    pub total_amount: Decimal,
}

/// Result of one refund batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundBatchResult {
    pub trigger: RefundTrigger,
    pub initiated_by: String,
    pub summary: RefundSummary,
    pub results: Vec<RefundOutcome>,
}

enum RefundDone {
    Refunded { refund_id: String, amount: Money },
    AlreadyRefunded,
}

pub struct RefundProcessor {
    ctx: EngineContext,
}

impl RefundProcessor {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Classifies every refundable claim by trigger; read-only
    pub async fn get_claims_needing_automatic_refunds(&self) -> Result<RefundCandidates, ClaimError> {
        let now = self.ctx.clock.now();
        let mut candidates = RefundCandidates::default();
        let mut seen = HashSet::new();

        for status in [
            ClaimStatus::Rejected,
            ClaimStatus::Submitted,
            ClaimStatus::Validated,
            ClaimStatus::ReadyToFile,
            ClaimStatus::Filed,
        ] {
            let claims = core_kernel::with_timeout(
                "store get_by_status",
                self.ctx.policy.call_timeout,
                self.ctx.store.get_by_status(status),
            )
            .await?;

            for claim in claims {
                if let Some(trigger) = classify(&claim, now, &self.ctx.policy) {
                    if seen.insert(claim.claim_id.clone()) {
                        candidates.bucket_mut(trigger).push(claim.summary());
                    }
                }
            }
        }

        Ok(candidates)
    }

    /// Refunds each listed claim under `trigger`
    ///
    /// Always returns a summary; per-claim failures are reported in `results`.
    #[instrument(skip(self, claim_ids), fields(count = claim_ids.len()))]
    pub async fn process_batch_automatic_refunds(
        &self,
        claim_ids: Vec<String>,
        trigger: RefundTrigger,
        initiated_by: &str,
    ) -> RefundBatchResult {
        let runner = self.ctx.policy.refund_runner();
        let outcomes = runner
            .run(claim_ids.clone(), |raw_id| {
                let runner = runner;
                async move { self.refund_claim(&runner, raw_id, trigger).await }
            })
            .await;

        let results: Vec<RefundOutcome> = claim_ids
            .iter()
            .zip(outcomes)
            .map(|(raw_id, outcome)| {
                outcome.unwrap_or_else(|panic| {
                    RefundOutcome::failed(raw_id.trim(), None, format!("internal error: {}", panic.message))
                })
            })
            .collect();

        let mut summary = RefundSummary {
            total: results.len(),
            ..Default::default()
        };
        for result in &results {
            if result.success {
                summary.successful += 1;
                if let Some(amount) = &result.amount {
                    summary.total_amount += amount.amount();
                }
            } else if result.skipped {
                summary.skipped += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!(
            trigger = %trigger,
            initiated_by,
            total = summary.total,
            successful = summary.successful,
            skipped = summary.skipped,
            failed = summary.failed,
            "refund batch finished"
        );

        RefundBatchResult {
            trigger,
            initiated_by: initiated_by.to_string(),
            summary,
            results,
        }
    }

    /// Classifies candidates and runs one batch per non-empty trigger
    pub async fn process_automatic_refunds(&self, initiated_by: &str) -> Result<Vec<RefundBatchResult>, ClaimError> {
        let candidates = self.get_claims_needing_automatic_refunds().await?;
        let mut batches = Vec::new();
        for trigger in RefundTrigger::ALL {
            let ids: Vec<String> = candidates
                .bucket(trigger)
                .iter()
                .map(|c| c.claim_id.to_string())
                .collect();
            if ids.is_empty() {
                continue;
            }
            batches.push(self.process_batch_automatic_refunds(ids, trigger, initiated_by).await);
        }
        Ok(batches)
    }

    async fn refund_claim(&self, runner: &BatchRunner, raw_id: String, trigger: RefundTrigger) -> RefundOutcome {
        let claim_id = match ClaimId::new(raw_id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                return RefundOutcome::failed(raw_id, Some(ErrorKind::Validation), e.to_string());
            }
        };

        match self.try_refund(runner, &claim_id, trigger).await {
            Ok(RefundDone::Refunded { refund_id, amount }) => RefundOutcome::refunded(&claim_id, refund_id, amount),
            Ok(RefundDone::AlreadyRefunded) => RefundOutcome::already_refunded(&claim_id),
            Err(e) => {
                warn!(claim_id = %claim_id, trigger = %trigger, error_kind = ?e.kind(), error = %e, "refund failed");
                RefundOutcome::failed(claim_id.to_string(), Some(e.kind()), e.to_string())
            }
        }
    }

    async fn try_refund(
        &self,
        runner: &BatchRunner,
        claim_id: &ClaimId,
        trigger: RefundTrigger,
    ) -> Result<RefundDone, ClaimError> {
        let claim = runner
            .call("store get_by_id", self.ctx.store.get_by_id(claim_id))
            .await?
            .ok_or_else(|| ClaimError::NotFound(claim_id.to_string()))?;

        if claim.status == ClaimStatus::Refunded {
            return Ok(RefundDone::AlreadyRefunded);
        }
        if !can_transition(claim.status, ClaimStatus::Refunded) {
            return Err(ClaimError::IllegalTransition {
                from: claim.status,
                to: ClaimStatus::Refunded,
            });
        }

        let payment = runner
            .call("store get_payment", self.ctx.store.get_payment(&claim.payment_id))
            .await?
            .ok_or_else(|| ClaimError::Validation(format!("no payment recorded for claim {}", claim_id)))?;
        if !payment.is_refundable() {
            return Err(ClaimError::Validation(format!(
                "payment {} is not refundable ({:?})",
                payment.payment_id, payment.status
            )));
        }

        let request = RefundRequest {
            transaction_id: payment.transaction_id.clone(),
            amount: None,
            idempotency_key: IdempotencyKey::for_refund(claim_id.as_str(), trigger.as_str()),
        };
        let receipt = runner
            .call("payment refund", self.ctx.payments.refund(&request))
            .await?;

        let now = self.ctx.clock.now();
        let patch = match transition(&claim, ClaimStatus::Refunded, TransitionCause::Refund(trigger), now)? {
            Transition::Applied(patch) => patch,
            Transition::Unchanged => return Ok(RefundDone::AlreadyRefunded),
        };
        let updated = runner
            .call("store update", self.ctx.store.update(claim_id, &patch))
            .await?;
        if !updated {
            return Err(ClaimError::NotFound(claim_id.to_string()));
        }

        info!(claim_id = %claim_id, trigger = %trigger, refund_id = %receipt.id, "claim refunded");

        alerts::enqueue(&self.ctx.queue, alerts::refund_issued(&claim, &payment, trigger)).await;

        Ok(RefundDone::Refunded {
            refund_id: receipt.id,
            amount: payment.amount,
        })
    }
}
