//! Operator surface DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use domain_claims::RefundTrigger;
use domain_notification::{EmailStatus, QueueMetrics, QueuedEmail};

/// Manual refund of specific claims under one trigger
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ManualRefundRequest {
    #[validate(length(min = 1, max = 100))]
    pub claim_ids: Vec<String>,
    pub trigger: RefundTrigger,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailQueueQuery {
    pub status: Option<EmailStatus>,
}

#[derive(Debug, Serialize)]
pub struct EmailQueueResponse {
    pub metrics: QueueMetrics,
    pub emails: Vec<QueuedEmail>,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub id: String,
    pub status: EmailStatus,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}
