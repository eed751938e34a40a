//! Strongly-typed identifiers for domain entities
//!
//! Claim and payment identifiers are issued by the intake flow and arrive as
//! opaque strings (`CLM001`, `pay_8f2...`), so they are wrapped as string
//! newtypes. Queue items are generated locally and use time-ordered UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_string_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting blank input
            pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(CoreError::InvalidIdentifier {
                        kind: $label,
                        reason: "must not be empty",
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(ClaimId, "claim id");
define_string_id!(PaymentId, "payment id");
define_string_id!(AirlineCode, "airline code");

/// Identifier of a queued outbound email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailId(Uuid);

impl EmailId {
    /// Creates a new time-ordered identifier (v7)
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EmailId {
    fn default() -> Self {
        Self::new_v7()
    }
}

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EML-{}", self.0)
    }
}

impl FromStr for EmailId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid_str = s.strip_prefix("EML-").unwrap_or(s);
        Ok(Self(Uuid::parse_str(uuid_str)?))
    }
}

impl From<Uuid> for EmailId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_id_trims_whitespace() {
        let id = ClaimId::new("  CLM001 ").unwrap();
        assert_eq!(id.as_str(), "CLM001");
    }

    #[test]
    fn test_blank_claim_id_rejected() {
        assert!(ClaimId::new("   ").is_err());
    }

    #[test]
    fn test_email_id_parsing() {
        let original = EmailId::new_v7();
        let parsed: EmailId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
