//! Kernel error type

use thiserror::Error;

/// Rejection of a kernel value at construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid {kind}: {reason}")]
    InvalidIdentifier { kind: &'static str, reason: &'static str },
}
