//! Claims domain errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::PortError;
use crate::claim::ClaimStatus;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Claim not found: {0}")]
    NotFound(String),

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: ClaimStatus, to: ClaimStatus },

    #[error("Refunded can only be reached through the refund processor")]
    RefundCauseRequired,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External service error: {0}")]
    ExternalService(#[from] PortError),
}

impl ClaimError {
    /// Classification carried on per-item results
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimError::NotFound(_) | ClaimError::Validation(_) => ErrorKind::Validation,
            ClaimError::IllegalTransition { .. } | ClaimError::RefundCauseRequired => {
                ErrorKind::IllegalTransition
            }
            ClaimError::Configuration(_) => ErrorKind::Configuration,
            ClaimError::ExternalService(_) => ErrorKind::ExternalService,
        }
    }
}

/// Per-item failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Configuration,
    ExternalService,
    IllegalTransition,
}
