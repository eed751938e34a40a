//! Test Data Builders
//!
//! Provides builder patterns for constructing claims and payments with
//! sensible defaults. Passenger details are generated with `fake`; tests set
//! only the fields they assert on.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal_macros::dec;

use core_kernel::{AirlineCode, ClaimId, Currency, Money, PaymentId};
use domain_claims::{
    Claim, ClaimStatus, DocumentationStatus, FlightEligibility, Payment, PaymentStatus,
    RefundTrigger,
};

use crate::fixtures::TimeFixtures;

/// Builder for constructing test claims
///
/// `build` keeps the record consistent with its status: filed statuses get a
/// `filed_at`, refunded claims get `refunded_at` and a reason.
pub struct ClaimBuilder {
    claim_id: String,
    passenger_name: String,
    passenger_email: String,
    flight_number: String,
    flight_date: Option<NaiveDate>,
    airline_code: String,
    departure_airport: String,
    arrival_airport: String,
    delay_minutes: u32,
    booking_reference: Option<String>,
    status: ClaimStatus,
    documentation_status: DocumentationStatus,
    eligibility: FlightEligibility,
    submitted_at: DateTime<Utc>,
    filed_at: Option<DateTime<Utc>>,
    next_follow_up_date: Option<DateTime<Utc>>,
    compensation: Money,
}

impl ClaimBuilder {
    /// Creates a new builder with default values
    pub fn new(claim_id: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            passenger_name: Name().fake(),
            passenger_email: SafeEmail().fake(),
            flight_number: "LH400".to_string(),
            flight_date: None,
            airline_code: "LH".to_string(),
            departure_airport: "FRA".to_string(),
            arrival_airport: "JFK".to_string(),
            delay_minutes: 245,
            booking_reference: Some("XK7Q2P".to_string()),
            status: ClaimStatus::Submitted,
            documentation_status: DocumentationStatus::Complete,
            eligibility: FlightEligibility::Eligible,
            submitted_at: TimeFixtures::now(),
            filed_at: None,
            next_follow_up_date: None,
            compensation: Money::new(dec!(600.00), Currency::EUR),
        }
    }

    pub fn status(mut self, status: ClaimStatus) -> Self {
        self.status = status;
        self
    }

    pub fn airline(mut self, code: impl Into<String>, flight_number: impl Into<String>) -> Self {
        self.airline_code = code.into();
        self.flight_number = flight_number.into();
        self
    }

    pub fn passenger(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.passenger_name = name.into();
        self.passenger_email = email.into();
        self
    }

    pub fn submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = at;
        self
    }

    /// Submission time relative to `TimeFixtures::now()`
    pub fn submitted_days_ago(self, days: i64) -> Self {
        self.submitted_at(TimeFixtures::now() - Duration::days(days))
    }

    pub fn filed_at(mut self, at: DateTime<Utc>) -> Self {
        self.filed_at = Some(at);
        self
    }

    pub fn next_follow_up(mut self, at: DateTime<Utc>) -> Self {
        self.next_follow_up_date = Some(at);
        self
    }

    pub fn documentation(mut self, status: DocumentationStatus) -> Self {
        self.documentation_status = status;
        self
    }

    pub fn eligibility(mut self, eligibility: FlightEligibility) -> Self {
        self.eligibility = eligibility;
        self
    }

    pub fn without_booking_reference(mut self) -> Self {
        self.booking_reference = None;
        self
    }

    pub fn compensation(mut self, amount: Money) -> Self {
        self.compensation = amount;
        self
    }

    /// Payment id the built claim points at
    pub fn payment_id(&self) -> String {
        format!("PAY-{}", self.claim_id)
    }

    /// Builds the claim
    ///
    /// # Panics
    ///
    /// Panics on a blank claim id or airline code.
    pub fn build(self) -> Claim {
        let filed_at = if self.status.is_filed() {
            Some(self.filed_at.unwrap_or(self.submitted_at + Duration::days(1)))
        } else {
            None
        };
        let refunded = self.status == ClaimStatus::Refunded;
        let payment_id = self.payment_id();

        Claim {
            claim_id: ClaimId::new(self.claim_id).expect("claim id"),
            passenger_name: self.passenger_name,
            passenger_email: self.passenger_email,
            flight_number: self.flight_number,
            flight_date: self
                .flight_date
                .unwrap_or_else(|| (self.submitted_at - Duration::days(3)).date_naive()),
            airline_code: AirlineCode::new(self.airline_code).expect("airline code"),
            departure_airport: self.departure_airport,
            arrival_airport: self.arrival_airport,
            delay_minutes: self.delay_minutes,
            booking_reference: self.booking_reference,
            status: self.status,
            documentation_status: self.documentation_status,
            eligibility: self.eligibility,
            submitted_at: self.submitted_at,
            filed_at,
            airline_reference: filed_at.map(|_| "REF-EXISTING".to_string()),
            next_follow_up_date: self.next_follow_up_date,
            estimated_compensation: self.compensation,
            payment_id: PaymentId::new(payment_id).expect("payment id"),
            refunded_at: refunded.then_some(self.submitted_at + Duration::days(2)),
            refund_reason: refunded.then_some(RefundTrigger::ClaimNotFiledDeadline),
            status_history: Vec::new(),
            updated_at: self.submitted_at,
        }
    }
}

/// Builder for the service-fee payment of a claim
pub struct PaymentBuilder {
    payment_id: PaymentId,
    claim_id: ClaimId,
    transaction_id: String,
    amount: Money,
    status: PaymentStatus,
}

impl PaymentBuilder {
    /// Payment matching `claim.payment_id`
    pub fn for_claim(claim: &Claim) -> Self {
        Self {
            payment_id: claim.payment_id.clone(),
            claim_id: claim.claim_id.clone(),
            transaction_id: format!("ch_{}", claim.claim_id.as_str().to_lowercase()),
            amount: Money::new(dec!(49.00), Currency::EUR),
            status: PaymentStatus::Succeeded,
        }
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = PaymentStatus::Failed;
        self
    }

    pub fn transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = id.into();
        self
    }

    pub fn build(self) -> Payment {
        Payment {
            payment_id: self.payment_id,
            claim_id: self.claim_id,
            transaction_id: self.transaction_id,
            amount: self.amount,
            status: self.status,
        }
    }
}
