//! Automatic filing processor
//!
//! Picks up every `ready_to_file` claim, submits it through the airline's
//! channel and moves it to `filed`. Claims are processed with bounded
//! concurrency; one claim failing never affects the others. A claim that
//! reached `filed` is out of the candidate set on the next run, and the
//! filing idempotency key lets the airline channel collapse a resubmission
//! when a run dies between submitting and recording the result.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{BatchRunner, ClaimId, IdempotencyKey};

use crate::airline::AirlineSubmission;
use crate::alerts;
use crate::claim::ClaimStatus;
use crate::context::EngineContext;
use crate::error::{ClaimError, ErrorKind};
use crate::lifecycle::{transition, Transition, TransitionCause};

/// Per-claim filing outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingResult {
    pub claim_id: String,
    pub success: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FilingResult {
    fn filed(claim_id: &ClaimId, reference: String) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            success: true,
            skipped: false,
            airline_reference: Some(reference),
            error_kind: None,
            error: None,
        }
    }

    fn skipped(claim_id: &ClaimId, reason: String) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            success: false,
            skipped: true,
            airline_reference: None,
            error_kind: None,
            error: Some(reason),
        }
    }

    fn failed(claim_id: &ClaimId, kind: Option<ErrorKind>, message: String) -> Self {
        Self {
            claim_id: claim_id.to_string(),
            success: false,
            skipped: false,
            airline_reference: None,
            error_kind: kind,
            error: Some(message),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingSummary {
    pub total: usize,
    pub filed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one filing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRun {
    pub summary: FilingSummary,
    pub results: Vec<FilingResult>,
    /// Whether an operator alert about failures was queued
    pub alert_queued: bool,
}

enum FilingOutcome {
    Filed(String),
    Skipped(String),
}

pub struct FilingProcessor {
    ctx: EngineContext,
}

impl FilingProcessor {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Files every claim currently `ready_to_file`
    #[instrument(skip(self))]
    pub async fn process_automatic_filing(&self) -> Result<FilingRun, ClaimError> {
        let runner = self.ctx.policy.filing_runner();
        let candidates = runner
            .call("store get_by_status", self.ctx.store.get_by_status(ClaimStatus::ReadyToFile))
            .await?;

        let ids: Vec<ClaimId> = candidates.into_iter().map(|c| c.claim_id).collect();
        info!(candidates = ids.len(), "automatic filing run started");

        let outcomes = runner
            .run(ids.clone(), |claim_id| {
                let runner = runner;
                async move { self.file_claim(&runner, claim_id).await }
            })
            .await;

        let results: Vec<FilingResult> = ids
            .iter()
            .zip(outcomes)
            .map(|(claim_id, outcome)| {
                outcome.unwrap_or_else(|panic| {
                    FilingResult::failed(claim_id, None, format!("internal error: {}", panic.message))
                })
            })
            .collect();

        let mut summary = FilingSummary {
            total: results.len(),
            ..Default::default()
        };
        for result in &results {
            if result.success {
                summary.filed += 1;
            } else if result.skipped {
                summary.skipped += 1;
            } else {
                summary.failed += 1;
            }
        }

        let failures: Vec<(String, String)> = results
            .iter()
            .filter(|r| !r.success && !r.skipped)
            .map(|r| (r.claim_id.clone(), r.error.clone().unwrap_or_default()))
            .collect();
        let alert_queued = if failures.is_empty() {
            false
        } else {
            alerts::enqueue(
                &self.ctx.queue,
                alerts::filing_failures(&self.ctx.policy.operator_email, &failures),
            )
            .await
        };

        info!(
            total = summary.total,
            filed = summary.filed,
            skipped = summary.skipped,
            failed = summary.failed,
            "automatic filing run finished"
        );

        Ok(FilingRun {
            summary,
            results,
            alert_queued,
        })
    }

    async fn file_claim(&self, runner: &BatchRunner, claim_id: ClaimId) -> FilingResult {
        match self.try_file(runner, &claim_id).await {
            Ok(FilingOutcome::Filed(reference)) => FilingResult::filed(&claim_id, reference),
            Ok(FilingOutcome::Skipped(reason)) => FilingResult::skipped(&claim_id, reason),
            Err(e) => {
                warn!(claim_id = %claim_id, error_kind = ?e.kind(), error = %e, "claim filing failed");
                FilingResult::failed(&claim_id, Some(e.kind()), e.to_string())
            }
        }
    }

    async fn try_file(&self, runner: &BatchRunner, claim_id: &ClaimId) -> Result<FilingOutcome, ClaimError> {
        let claim = runner
            .call("store get_by_id", self.ctx.store.get_by_id(claim_id))
            .await?
            .ok_or_else(|| ClaimError::NotFound(claim_id.to_string()))?;

        // Another run may have moved it since the candidate query
        if claim.status != ClaimStatus::ReadyToFile {
            return Ok(FilingOutcome::Skipped(format!("claim is {}", claim.status)));
        }

        let config = self.ctx.registry.require(&claim.airline_code)?;
        config.validate_claim(&claim)?;

        let submission = AirlineSubmission::generate(config, &claim);
        let key = IdempotencyKey::for_filing(claim_id.as_str(), config.code.as_str());

        let receipt = runner
            .call("airline submission", self.ctx.airlines.submit(config, &submission, &key))
            .await?;

        let now = self.ctx.clock.now();
        let patch = match transition(&claim, ClaimStatus::Filed, TransitionCause::Auto, now)? {
            Transition::Applied(patch) => patch,
            Transition::Unchanged => return Ok(FilingOutcome::Skipped("claim is filed".to_string())),
        };
        let patch = patch
            .with_airline_reference(receipt.reference.clone())
            .with_next_follow_up(now + Duration::days(i64::from(config.expected_response_days)));

        let updated = runner
            .call("store update", self.ctx.store.update(claim_id, &patch))
            .await?;
        if !updated {
            return Err(ClaimError::NotFound(claim_id.to_string()));
        }

        info!(
            claim_id = %claim_id,
            airline = %config.code,
            reference = %receipt.reference,
            "claim filed"
        );

        alerts::enqueue(
            &self.ctx.queue,
            alerts::claim_filed(&claim, &config.name, &receipt.reference),
        )
        .await;

        Ok(FilingOutcome::Filed(receipt.reference))
    }
}
