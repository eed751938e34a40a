//! Cron trigger handlers
//!
//! `POST` runs a processor; the cron-auth middleware has already checked the
//! secret. `GET` on the same path reports counts without touching anything.

use axum::{extract::State, Json};
use tracing::{info, warn};

use domain_claims::{
    ClaimStatus, FilingProcessor, FilingResult, FilingSummary, FollowUpDetector, FollowUpReport,
    RefundBatchResult, RefundProcessor, RefundTrigger,
};
use domain_notification::{DrainReport, QueueMetrics};

use crate::dto::batch::{filing_errors, refund_errors};
use crate::dto::{BatchResponse, FollowUpSummary, RefundRunSummary, TriggerStatus};
use crate::error::ApiError;
use crate::AppState;

/// Runs automatic filing
pub async fn automatic_filing(
    State(state): State<AppState>,
) -> Result<Json<BatchResponse<FilingSummary, Vec<FilingResult>>>, ApiError> {
    let run = FilingProcessor::new(state.ctx.clone())
        .process_automatic_filing()
        .await?;

    info!(filed = run.summary.filed, failed = run.summary.failed, "automatic filing triggered");
    let errors = filing_errors(&run.results);
    Ok(Json(BatchResponse::new(run.summary, run.results).with_errors(errors)))
}

pub async fn automatic_filing_status(State(state): State<AppState>) -> Json<TriggerStatus> {
    let status = TriggerStatus::new("automatic-filing", state.cron_configured());
    let status = match state.ctx.store.get_by_status(ClaimStatus::ReadyToFile).await {
        Ok(claims) => status.count("ready_to_file", claims.len()),
        Err(e) => {
            warn!(error = %e, "filing status probe could not read the store");
            status.degraded()
        }
    };
    Json(status)
}

/// Runs follow-up and overdue detection
pub async fn follow_up(
    State(state): State<AppState>,
) -> Json<BatchResponse<FollowUpSummary, FollowUpReport>> {
    let report = FollowUpDetector::new(state.ctx.clone())
        .run_follow_up_check()
        .await;

    let summary = FollowUpSummary::from(&report);
    let errors = report.errors.clone();
    Json(BatchResponse::new(summary, report).with_errors(errors))
}

pub async fn follow_up_status(State(state): State<AppState>) -> Json<TriggerStatus> {
    let detector = FollowUpDetector::new(state.ctx.clone());
    let status = TriggerStatus::new("follow-up", state.cron_configured());

    let overdue = detector.detect_overdue(state.ctx.policy.filing_sla_days).await;
    let due = detector.detect_needing_follow_up().await;
    let status = match (overdue, due) {
        (Ok(overdue), Ok(due)) => status
            .count("overdue", overdue.len())
            .count("needing_follow_up", due.len()),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "follow-up status probe could not read the store");
            status.degraded()
        }
    };
    Json(status)
}

/// Runs automatic refunds, one batch per trigger with candidates
pub async fn automatic_refunds(
    State(state): State<AppState>,
) -> Result<Json<BatchResponse<RefundRunSummary, Vec<RefundBatchResult>>>, ApiError> {
    let batches = RefundProcessor::new(state.ctx.clone())
        .process_automatic_refunds("cron")
        .await?;

    let summary = RefundRunSummary::from(batches.as_slice());
    let errors = refund_errors(batches.iter().flat_map(|b| b.results.iter()));
    Ok(Json(BatchResponse::new(summary, batches).with_errors(errors)))
}

pub async fn automatic_refunds_status(State(state): State<AppState>) -> Json<TriggerStatus> {
    let status = TriggerStatus::new("automatic-refunds", state.cron_configured());
    let status = match RefundProcessor::new(state.ctx.clone())
        .get_claims_needing_automatic_refunds()
        .await
    {
        Ok(candidates) => RefundTrigger::ALL
            .iter()
            .fold(status, |s, trigger| s.count(trigger.as_str(), candidates.bucket(*trigger).len()))
            .count("total", candidates.total()),
        Err(e) => {
            warn!(error = %e, "refund status probe could not read the store");
            status.degraded()
        }
    };
    Json(status)
}

/// Drains one batch of the email queue
///
/// The drain runs on its own task so a dropped request cannot abandon items
/// mid-delivery.
pub async fn process_email_queue(
    State(state): State<AppState>,
) -> Result<Json<BatchResponse<DrainReport, QueueMetrics>>, ApiError> {
    let queue = state.ctx.queue.clone();
    let report = tokio::spawn(async move { queue.process_batch().await })
        .await
        .map_err(|e| ApiError::Internal(format!("email drain task failed: {}", e)))?;
    let metrics = state.ctx.queue.metrics().await;
    Ok(Json(BatchResponse::new(report, metrics)))
}

pub async fn email_queue_status(State(state): State<AppState>) -> Json<TriggerStatus> {
    let metrics = state.ctx.queue.metrics().await;
    Json(
        TriggerStatus::new("process-email-queue", state.cron_configured())
            .count("total", metrics.total)
            .count("pending", metrics.pending)
            .count("processing", metrics.processing)
            .count("sent", metrics.sent)
            .count("retry", metrics.retry)
            .count("failed", metrics.failed),
    )
}
