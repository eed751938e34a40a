//! Operator handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::EmailId;
use domain_claims::{RefundBatchResult, RefundProcessor, RefundSummary};

use crate::auth::OperatorClaims;
use crate::dto::batch::refund_errors;
use crate::dto::{
    BatchResponse, ClearedResponse, EmailQueueQuery, EmailQueueResponse, ManualRefundRequest,
    RetryResponse,
};
use crate::error::ApiError;
use crate::AppState;

/// Refunds the listed claims under the given trigger
pub async fn manual_refunds(
    State(state): State<AppState>,
    Extension(operator): Extension<OperatorClaims>,
    Json(request): Json<ManualRefundRequest>,
) -> Result<Json<BatchResponse<RefundSummary, RefundBatchResult>>, ApiError> {
    request.validate()?;

    info!(
        operator = %operator.sub,
        trigger = %request.trigger,
        count = request.claim_ids.len(),
        "manual refund batch"
    );
    let initiated_by = format!("operator:{}", operator.sub);
    let batch = RefundProcessor::new(state.ctx.clone())
        .process_batch_automatic_refunds(request.claim_ids, request.trigger, &initiated_by)
        .await;

    let errors = refund_errors(&batch.results);
    Ok(Json(BatchResponse::new(batch.summary, batch).with_errors(errors)))
}

/// Lists queued emails, optionally filtered by status
pub async fn list_email_queue(
    State(state): State<AppState>,
    Query(query): Query<EmailQueueQuery>,
) -> Json<EmailQueueResponse> {
    let queue = &state.ctx.queue;
    Json(EmailQueueResponse {
        metrics: queue.metrics().await,
        emails: queue.list(query.status).await,
    })
}

/// Moves a failed email back to pending
pub async fn retry_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RetryResponse>, ApiError> {
    let email_id: EmailId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid email id '{}'", id)))?;

    state.ctx.queue.retry_failed_email(email_id).await?;
    let email = state
        .ctx
        .queue
        .get(email_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("queued email {}", email_id)))?;

    Ok(Json(RetryResponse {
        id: email_id.to_string(),
        status: email.status,
    }))
}

/// Drops sent emails from the queue
pub async fn clear_sent_emails(State(state): State<AppState>) -> Json<ClearedResponse> {
    Json(ClearedResponse {
        cleared: state.ctx.queue.clear_sent_emails().await,
    })
}
