//! Pre-built Test Fixtures
//!
//! Fixed instants, airline configuration, and a `TestHarness` that wires the
//! processors to in-memory collaborators and a pinned clock.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeZone, Utc};

use core_kernel::{AirlineCode, FixedClock};
use domain_claims::ports::mock::{InMemoryClaimStore, MockAirlineSubmitter, MockPaymentProcessor};
use domain_claims::{
    AirlineConfig, AirlineRegistry, Claim, ClaimField, EngineContext, FilingProcessor,
    FollowUpDetector, ProcessingPolicy, RefundProcessor, SubmissionMethod,
};
use domain_notification::ports::mock::MockEmailSender;
use domain_notification::{NotificationQueue, QueueConfig};

use crate::builders::PaymentBuilder;

/// Fixture for temporal test data
pub struct TimeFixtures;

impl TimeFixtures {
    /// The instant every harness clock starts at (2 Mar 2026, 09:00 UTC)
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    pub fn days_ago(days: i64) -> DateTime<Utc> {
        Self::now() - chrono::Duration::days(days)
    }
}

/// Fixture for airline configuration
pub struct AirlineFixtures;

impl AirlineFixtures {
    pub fn code(code: &str) -> AirlineCode {
        AirlineCode::new(code).unwrap()
    }

    /// An API-channel airline with a minimal field set
    pub fn api_airline(code: &str, name: &str) -> AirlineConfig {
        AirlineConfig {
            code: Self::code(code),
            name: name.to_string(),
            method: SubmissionMethod::Api,
            endpoint: format!("https://claims.{}.example/api", code.to_lowercase()),
            required_fields: vec![ClaimField::PassengerName, ClaimField::FlightNumber, ClaimField::FlightDate],
            required_documents: vec!["boarding_pass".to_string()],
            expected_response_days: 21,
        }
    }

    /// The built-in registry
    pub fn registry() -> AirlineRegistry {
        AirlineRegistry::builtin()
    }
}

/// Processors wired to in-memory collaborators
pub struct TestHarness {
    pub store: Arc<InMemoryClaimStore>,
    pub payments: Arc<MockPaymentProcessor>,
    pub airlines: Arc<MockAirlineSubmitter>,
    pub email: Arc<MockEmailSender>,
    pub queue: Arc<NotificationQueue>,
    pub clock: Arc<FixedClock>,
    pub ctx: EngineContext,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_policy(ProcessingPolicy::default())
    }

    pub fn with_policy(policy: ProcessingPolicy) -> Self {
        Self::build(policy, AirlineFixtures::registry())
    }

    pub fn with_registry(registry: AirlineRegistry) -> Self {
        Self::build(ProcessingPolicy::default(), registry)
    }

    fn build(policy: ProcessingPolicy, registry: AirlineRegistry) -> Self {
        let store = Arc::new(InMemoryClaimStore::new());
        let payments = Arc::new(MockPaymentProcessor::new());
        let airlines = Arc::new(MockAirlineSubmitter::new());
        let email = Arc::new(MockEmailSender::new());
        let clock = Arc::new(FixedClock::new(TimeFixtures::now()));
        let queue = Arc::new(NotificationQueue::new(
            email.clone(),
            clock.clone(),
            QueueConfig {
                send_timeout: StdDuration::from_secs(1),
                ..Default::default()
            },
        ));

        let ctx = EngineContext {
            store: store.clone(),
            payments: payments.clone(),
            airlines: airlines.clone(),
            registry: Arc::new(registry),
            queue: queue.clone(),
            clock: clock.clone(),
            policy,
        };

        Self {
            store,
            payments,
            airlines,
            email,
            queue,
            clock,
            ctx,
        }
    }

    pub fn filing(&self) -> FilingProcessor {
        FilingProcessor::new(self.ctx.clone())
    }

    pub fn follow_up(&self) -> FollowUpDetector {
        FollowUpDetector::new(self.ctx.clone())
    }

    pub fn refunds(&self) -> RefundProcessor {
        RefundProcessor::new(self.ctx.clone())
    }

    /// Stores the claim together with a captured service-fee payment
    pub async fn seed(&self, claim: Claim) {
        self.store.insert_payment(PaymentBuilder::for_claim(&claim).build()).await;
        self.store.insert_claim(claim).await;
    }

    /// Current state of a stored claim
    ///
    /// # Panics
    ///
    /// Panics if the claim is not in the store.
    pub async fn claim(&self, claim_id: &str) -> Claim {
        self.store
            .claim(claim_id)
            .await
            .unwrap_or_else(|| panic!("claim {} not in store", claim_id))
    }
}
