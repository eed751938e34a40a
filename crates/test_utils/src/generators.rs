//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating claims that maintain the
//! record invariants.

use chrono::Duration;
use proptest::prelude::*;

use core_kernel::{Currency, Money};
use domain_claims::{Claim, ClaimStatus, DocumentationStatus, FlightEligibility, TransitionCause, RefundTrigger};

use crate::builders::ClaimBuilder;
use crate::fixtures::TimeFixtures;

/// Strategy for any lifecycle status
pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    proptest::sample::select(ClaimStatus::ALL.to_vec())
}

pub fn refund_trigger_strategy() -> impl Strategy<Value = RefundTrigger> {
    proptest::sample::select(RefundTrigger::ALL.to_vec())
}

/// Strategy for transition causes
pub fn transition_cause_strategy() -> impl Strategy<Value = TransitionCause> {
    prop_oneof![
        Just(TransitionCause::Auto),
        "[a-z]{3,8}".prop_map(TransitionCause::Operator),
        refund_trigger_strategy().prop_map(TransitionCause::Refund),
    ]
}

pub fn documentation_strategy() -> impl Strategy<Value = DocumentationStatus> {
    prop_oneof![
        Just(DocumentationStatus::Pending),
        Just(DocumentationStatus::Complete),
        Just(DocumentationStatus::Insufficient),
    ]
}

pub fn eligibility_strategy() -> impl Strategy<Value = FlightEligibility> {
    prop_oneof![
        Just(FlightEligibility::Unverified),
        Just(FlightEligibility::Eligible),
        Just(FlightEligibility::Ineligible),
    ]
}

/// Strategy for EUR compensation amounts between 250 and 600
pub fn compensation_strategy() -> impl Strategy<Value = Money> {
    (25_000i64..=60_000i64).prop_map(|cents| Money::from_minor(cents, Currency::EUR))
}

/// Strategy for consistent claims in any status, submitted up to 90 days ago
pub fn claim_strategy() -> impl Strategy<Value = Claim> {
    (
        1u32..100_000u32,
        claim_status_strategy(),
        documentation_strategy(),
        eligibility_strategy(),
        0i64..(90 * 24 * 3600),
        compensation_strategy(),
    )
        .prop_map(|(n, status, docs, eligibility, age_secs, compensation)| {
            ClaimBuilder::new(format!("CLM{:06}", n))
                .status(status)
                .documentation(docs)
                .eligibility(eligibility)
                .submitted_at(TimeFixtures::now() - Duration::seconds(age_secs))
                .compensation(compensation)
                .build()
        })
}
