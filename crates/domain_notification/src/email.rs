//! Queued email records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::EmailId;
use crate::templates::EmailTemplate;

/// Delivery priority; higher tiers drain first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailPriority {
    High,
    Normal,
    Low,
}

impl EmailPriority {
    /// Sort rank, lowest drains first
    pub fn rank(&self) -> u8 {
        match self {
            EmailPriority::High => 0,
            EmailPriority::Normal => 1,
            EmailPriority::Low => 2,
        }
    }
}

impl Default for EmailPriority {
    fn default() -> Self {
        EmailPriority::Normal
    }
}

/// Delivery status of a queued email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailStatus {
    /// Waiting for the next drain cycle
    Pending,
    /// Handed to the provider in the current cycle
    Processing,
    /// Accepted by the provider
    Sent,
    /// Failed, waiting out the retry delay
    Retry,
    /// Exhausted its attempts; needs an operator retry
    Failed,
}

/// Request to enqueue an email
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub to: String,
    pub template: EmailTemplate,
    pub variables: BTreeMap<String, String>,
    pub priority: EmailPriority,
}

impl EmailRequest {
    pub fn new(to: impl Into<String>, template: EmailTemplate) -> Self {
        Self {
            to: to.into(),
            template,
            variables: BTreeMap::new(),
            priority: EmailPriority::Normal,
        }
    }

    /// Sets a template variable
    pub fn var(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.variables.insert(key.into(), value.to_string());
        self
    }

    pub fn priority(mut self, priority: EmailPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// An email held by the notification queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEmail {
    pub id: EmailId,
    pub to: String,
    pub template: EmailTemplate,
    pub variables: BTreeMap<String, String>,
    pub priority: EmailPriority,
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: EmailStatus,
    pub created_at: DateTime<Utc>,
    pub last_attempt: Option<DateTime<Utc>>,
    /// When a `retry` item becomes `pending` again
    pub retry_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// Provider message id once sent
    pub message_id: Option<String>,
    /// Enqueue order, FIFO tie-break within a priority tier
    pub sequence: u64,
}

impl QueuedEmail {
    pub(crate) fn from_request(
        request: EmailRequest,
        max_attempts: u32,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EmailId::new_v7(),
            to: request.to,
            template: request.template,
            variables: request.variables,
            priority: request.priority,
            attempts: 0,
            max_attempts,
            status: EmailStatus::Pending,
            created_at: now,
            last_attempt: None,
            retry_at: None,
            error: None,
            message_id: None,
            sequence,
        }
    }
}

/// A rendered message ready for the delivery provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}
