//! Deterministic idempotency keys
//!
//! The record store offers no compare-and-swap, so two overlapping processor
//! runs can both decide to act on the same claim. What keeps the side effect
//! single is the key passed to the external call: the same claim and trigger
//! always produce the same key, and the provider collapses repeats into one
//! effect.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum key length accepted by the payment processor
pub const MAX_KEY_LENGTH: usize = 255;

/// A token identifying one logical side effect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Key for refunding a claim's payment under a given trigger
    pub fn for_refund(claim_id: &str, trigger: &str) -> Self {
        Self::from_parts(&["refund", claim_id, trigger])
    }

    /// Key for submitting a claim to an airline
    pub fn for_filing(claim_id: &str, airline_code: &str) -> Self {
        Self::from_parts(&["filing", claim_id, airline_code])
    }

    /// Key for the intake payment intent of a passenger's claim
    ///
    /// The email is reduced to its alphanumeric characters so the key stays
    /// within the processor's accepted alphabet.
    pub fn for_payment_intent(email: &str, flight_number: &str, flight_date: &str) -> Self {
        let email = strip_non_alphanumeric(&email.to_lowercase());
        Self::from_parts(&["intent", &email, flight_number, flight_date])
    }

    fn from_parts(parts: &[&str]) -> Self {
        let joined = parts
            .iter()
            .map(|p| sanitize_segment(p))
            .collect::<Vec<_>>()
            .join("_");
        let capped: String = joined.chars().take(MAX_KEY_LENGTH).collect();
        Self(capped)
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_non_alphanumeric(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn sanitize_segment(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
