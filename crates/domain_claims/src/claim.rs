//! Claim record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AirlineCode, ClaimId, Money, PaymentId};
use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Received from the passenger, payment captured
    Submitted,
    /// Eligibility checks passed
    Validated,
    /// Supporting documents assembled
    DocumentsPrepared,
    /// Waiting for the filing processor
    ReadyToFile,
    /// Submitted to the airline
    Filed,
    /// Airline confirmed receipt
    AirlineAcknowledged,
    /// Waiting on the airline, follow-ups scheduled
    Monitoring,
    /// Airline sent a decision
    AirlineResponded,
    Approved,
    Rejected,
    Completed,
    /// Service fee returned to the passenger; terminal
    Refunded,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 12] = [
        ClaimStatus::Submitted,
        ClaimStatus::Validated,
        ClaimStatus::DocumentsPrepared,
        ClaimStatus::ReadyToFile,
        ClaimStatus::Filed,
        ClaimStatus::AirlineAcknowledged,
        ClaimStatus::Monitoring,
        ClaimStatus::AirlineResponded,
        ClaimStatus::Approved,
        ClaimStatus::Rejected,
        ClaimStatus::Completed,
        ClaimStatus::Refunded,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Validated => "validated",
            ClaimStatus::DocumentsPrepared => "documents_prepared",
            ClaimStatus::ReadyToFile => "ready_to_file",
            ClaimStatus::Filed => "filed",
            ClaimStatus::AirlineAcknowledged => "airline_acknowledged",
            ClaimStatus::Monitoring => "monitoring",
            ClaimStatus::AirlineResponded => "airline_responded",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Refunded => "refunded",
        }
    }

    /// Statuses that carry `filed_at`
    pub fn is_filed(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Filed
                | ClaimStatus::AirlineAcknowledged
                | ClaimStatus::Monitoring
                | ClaimStatus::AirlineResponded
                | ClaimStatus::Approved
                | ClaimStatus::Rejected
                | ClaimStatus::Completed
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ClaimError::Validation(format!("unknown claim status '{}'", s)))
    }
}

/// Why a claim's service fee is refunded automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundTrigger {
    ClaimNotFiledDeadline,
    ClaimRejectedByAirline,
    InsufficientDocumentation,
    IneligibleFlight,
}

impl RefundTrigger {
    pub const ALL: [RefundTrigger; 4] = [
        RefundTrigger::ClaimNotFiledDeadline,
        RefundTrigger::ClaimRejectedByAirline,
        RefundTrigger::InsufficientDocumentation,
        RefundTrigger::IneligibleFlight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundTrigger::ClaimNotFiledDeadline => "claim_not_filed_deadline",
            RefundTrigger::ClaimRejectedByAirline => "claim_rejected_by_airline",
            RefundTrigger::InsufficientDocumentation => "insufficient_documentation",
            RefundTrigger::IneligibleFlight => "ineligible_flight",
        }
    }

    /// Passenger-facing explanation used in the refund email
    pub fn description(&self) -> &'static str {
        match self {
            RefundTrigger::ClaimNotFiledDeadline => "We could not file your claim within our deadline",
            RefundTrigger::ClaimRejectedByAirline => "The airline rejected your claim",
            RefundTrigger::InsufficientDocumentation => "The documentation provided was not sufficient to file",
            RefundTrigger::IneligibleFlight => "Your flight is not eligible for compensation",
        }
    }
}

impl fmt::Display for RefundTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefundTrigger {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefundTrigger::ALL
            .iter()
            .find(|trigger| trigger.as_str() == s)
            .copied()
            .ok_or_else(|| ClaimError::Validation(format!("unknown refund trigger '{}'", s)))
    }
}

/// State of the passenger's supporting documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentationStatus {
    #[default]
    Pending,
    Complete,
    Insufficient,
}

/// Outcome of the flight eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightEligibility {
    #[default]
    Unverified,
    Eligible,
    Ineligible,
}

/// One applied status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    /// `auto`, `operator:<id>` or `refund:<trigger>`
    pub cause: String,
    pub at: DateTime<Utc>,
}

/// A flight-delay compensation claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub passenger_name: String,
    pub passenger_email: String,
    pub flight_number: String,
    pub flight_date: NaiveDate,
    pub airline_code: AirlineCode,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub delay_minutes: u32,
    pub booking_reference: Option<String>,
    pub status: ClaimStatus,
    pub documentation_status: DocumentationStatus,
    pub eligibility: FlightEligibility,
    pub submitted_at: DateTime<Utc>,
    pub filed_at: Option<DateTime<Utc>>,
    pub airline_reference: Option<String>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
    pub estimated_compensation: Money,
    pub payment_id: PaymentId,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<RefundTrigger>,
    pub status_history: Vec<StatusChange>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Applies a patch produced by the lifecycle or a processor
    pub fn apply(&mut self, patch: &ClaimPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.clear_filed_at {
            self.filed_at = None;
        } else if let Some(filed_at) = patch.filed_at {
            self.filed_at = Some(filed_at);
        }
        if let Some(reference) = &patch.airline_reference {
            self.airline_reference = Some(reference.clone());
        }
        if let Some(next) = patch.next_follow_up_date {
            self.next_follow_up_date = Some(next);
        }
        if let Some(refunded_at) = patch.refunded_at {
            self.refunded_at = Some(refunded_at);
        }
        if let Some(reason) = patch.refund_reason {
            self.refund_reason = Some(reason);
        }
        self.status_history.extend(patch.history.iter().cloned());
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }

    /// Verifies the record-level invariants
    pub fn check_invariants(&self) -> Result<(), ClaimError> {
        if !self.status.is_filed() && self.filed_at.is_some() {
            return Err(ClaimError::Validation(format!(
                "claim {} is {} but has filed_at set",
                self.claim_id, self.status
            )));
        }
        if self.status.is_filed() && self.filed_at.is_none() {
            return Err(ClaimError::Validation(format!(
                "claim {} is {} but has no filed_at",
                self.claim_id, self.status
            )));
        }
        let refunded = self.status == ClaimStatus::Refunded;
        if refunded != self.refunded_at.is_some() {
            return Err(ClaimError::Validation(format!(
                "claim {} refunded_at does not match status {}",
                self.claim_id, self.status
            )));
        }
        if refunded && self.refund_reason.is_none() {
            return Err(ClaimError::Validation(format!(
                "claim {} is refunded without a reason",
                self.claim_id
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> ClaimSummary {
        ClaimSummary::from(self)
    }
}

/// Partial update persisted through the record store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimPatch {
    pub status: Option<ClaimStatus>,
    pub filed_at: Option<DateTime<Utc>>,
    /// Drops `filed_at`; set when a filed claim is refunded
    #[serde(default)]
    pub clear_filed_at: bool,
    pub airline_reference: Option<String>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<RefundTrigger>,
    /// Entries appended to `status_history`
    pub history: Vec<StatusChange>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ClaimPatch {
    pub fn with_airline_reference(mut self, reference: impl Into<String>) -> Self {
        self.airline_reference = Some(reference.into());
        self
    }

    pub fn with_next_follow_up(mut self, at: DateTime<Utc>) -> Self {
        self.next_follow_up_date = Some(at);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == ClaimPatch::default()
    }
}

/// Compact view used in alerts and run reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub claim_id: ClaimId,
    pub passenger_name: String,
    pub flight_number: String,
    pub flight_date: NaiveDate,
    pub airline_code: AirlineCode,
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
    pub next_follow_up_date: Option<DateTime<Utc>>,
}

impl From<&Claim> for ClaimSummary {
    fn from(claim: &Claim) -> Self {
        Self {
            claim_id: claim.claim_id.clone(),
            passenger_name: claim.passenger_name.clone(),
            flight_number: claim.flight_number.clone(),
            flight_date: claim.flight_date,
            airline_code: claim.airline_code.clone(),
            status: claim.status,
            submitted_at: claim.submitted_at,
            next_follow_up_date: claim.next_follow_up_date,
        }
    }
}

impl fmt::Display for ClaimSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {} on {} ({}, submitted {})",
            self.claim_id,
            self.passenger_name,
            self.flight_number,
            self.flight_date,
            self.status,
            self.submitted_at.format("%Y-%m-%d")
        )
    }
}
