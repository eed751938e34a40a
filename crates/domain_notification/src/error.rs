//! Notification domain errors

use thiserror::Error;

use core_kernel::EmailId;
use crate::email::EmailStatus;

/// Errors that can occur in the notification domain
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Queued email not found: {0}")]
    EmailNotFound(EmailId),

    #[error("Email {id} is {status:?}; only failed emails can be retried")]
    NotRetryable { id: EmailId, status: EmailStatus },

    #[error("Template {template} is missing variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
}
