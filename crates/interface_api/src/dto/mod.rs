//! Request/response data transfer objects

pub mod batch;
pub mod admin;
pub mod status;

pub use batch::{BatchResponse, BatchResults, RefundRunSummary, FollowUpSummary};
pub use admin::{ManualRefundRequest, EmailQueueQuery, EmailQueueResponse, ClearedResponse, RetryResponse};
pub use status::{TriggerStatus, HealthResponse, ReadinessResponse};
