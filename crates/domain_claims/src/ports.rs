//! Claims Domain Ports
//!
//! The processors reach the record store, the payment processor and airline
//! filing channels only through these traits. PostgreSQL and HTTP adapters
//! live in `infra_db` and `infra_external`; in-memory implementations are
//! available behind the `mock` feature.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, DomainPort, IdempotencyKey, Money, PaymentId, PortError};
use crate::airline::{AirlineConfig, AirlineSubmission};
use crate::claim::{Claim, ClaimPatch, ClaimStatus};
use crate::payment::Payment;

/// Port for the claim record store
#[async_trait]
pub trait ClaimStorePort: DomainPort {
    /// All claims currently in `status`
    async fn get_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError>;

    async fn get_by_id(&self, claim_id: &ClaimId) -> Result<Option<Claim>, PortError>;

    /// Applies a partial update; `false` when the claim does not exist
    async fn update(&self, claim_id: &ClaimId, patch: &ClaimPatch) -> Result<bool, PortError>;

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PortError>;
}

/// Refund request against a captured payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub transaction_id: String,
    /// Partial amount; `None` refunds the full charge
    pub amount: Option<Money>,
    pub idempotency_key: IdempotencyKey,
}

/// Processor acknowledgement of a refund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub id: String,
    pub status: String,
}

/// Request to open a payment intent for a new claim's service fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub amount: Money,
    pub metadata: BTreeMap<String, String>,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Port for the payment processor
#[async_trait]
pub trait PaymentProcessorPort: DomainPort {
    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, PortError>;

    async fn create_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PortError>;
}

/// Airline acknowledgement of a filed claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub reference: String,
}

/// Port for airline filing channels
#[async_trait]
pub trait AirlineSubmissionPort: DomainPort {
    async fn submit(
        &self,
        config: &AirlineConfig,
        submission: &AirlineSubmission,
        idempotency_key: &IdempotencyKey,
    ) -> Result<SubmissionReceipt, PortError>;
}

/// In-memory implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// In-memory record store
    #[derive(Debug, Default)]
    pub struct InMemoryClaimStore {
        claims: RwLock<HashMap<ClaimId, Claim>>,
        payments: RwLock<HashMap<PaymentId, Payment>>,
        failing_statuses: RwLock<HashSet<ClaimStatus>>,
        updates: AtomicUsize,
    }

    impl InMemoryClaimStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert_claim(&self, claim: Claim) {
            self.claims.write().await.insert(claim.claim_id.clone(), claim);
        }

        pub async fn insert_payment(&self, payment: Payment) {
            self.payments.write().await.insert(payment.payment_id.clone(), payment);
        }

        /// Makes `get_by_status(status)` fail with a connection error
        pub async fn fail_status_query(&self, status: ClaimStatus) {
            self.failing_statuses.write().await.insert(status);
        }

        /// Snapshot of a stored claim
        pub async fn claim(&self, claim_id: &str) -> Option<Claim> {
            let id = ClaimId::new(claim_id).ok()?;
            self.claims.read().await.get(&id).cloned()
        }

        pub async fn all_claims(&self) -> Vec<Claim> {
            let mut claims: Vec<Claim> = self.claims.read().await.values().cloned().collect();
            claims.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));
            claims
        }

        /// Number of applied updates
        pub fn update_count(&self) -> usize {
            self.updates.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for InMemoryClaimStore {}

    #[async_trait]
    impl ClaimStorePort for InMemoryClaimStore {
        async fn get_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError> {
            if self.failing_statuses.read().await.contains(&status) {
                return Err(PortError::connection(format!(
                    "record store unavailable for status {}",
                    status
                )));
            }
            let mut claims: Vec<Claim> = self
                .claims
                .read()
                .await
                .values()
                .filter(|c| c.status == status)
                .cloned()
                .collect();
            claims.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));
            Ok(claims)
        }

        async fn get_by_id(&self, claim_id: &ClaimId) -> Result<Option<Claim>, PortError> {
            Ok(self.claims.read().await.get(claim_id).cloned())
        }

        async fn update(&self, claim_id: &ClaimId, patch: &ClaimPatch) -> Result<bool, PortError> {
            let mut claims = self.claims.write().await;
            match claims.get_mut(claim_id) {
                Some(claim) => {
                    claim.apply(patch);
                    self.updates.fetch_add(1, Ordering::SeqCst);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PortError> {
            Ok(self.payments.read().await.get(payment_id).cloned())
        }
    }

    /// Payment processor that collapses repeated idempotency keys
    #[derive(Debug, Default)]
    pub struct MockPaymentProcessor {
        refunds: RwLock<HashMap<String, RefundReceipt>>,
        intents: RwLock<HashMap<String, PaymentIntent>>,
        failing_transactions: RwLock<HashSet<String>>,
        refund_calls: AtomicUsize,
    }

    impl MockPaymentProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Declines refunds for `transaction_id`
        pub async fn fail_for(&self, transaction_id: &str) {
            self.failing_transactions.write().await.insert(transaction_id.to_string());
        }

        /// Number of refund requests received, repeats included
        pub fn refund_calls(&self) -> usize {
            self.refund_calls.load(Ordering::SeqCst)
        }

        /// Number of distinct refunds executed
        pub async fn refunds_executed(&self) -> usize {
            self.refunds.read().await.len()
        }
    }

    impl DomainPort for MockPaymentProcessor {}

    #[async_trait]
    impl PaymentProcessorPort for MockPaymentProcessor {
        async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, PortError> {
            self.refund_calls.fetch_add(1, Ordering::SeqCst);

            if self.failing_transactions.read().await.contains(&request.transaction_id) {
                return Err(PortError::rejected(
                    "payment processor",
                    format!("charge {} cannot be refunded", request.transaction_id),
                ));
            }

            let mut refunds = self.refunds.write().await;
            let next = refunds.len() + 1;
            let receipt = refunds
                .entry(request.idempotency_key.as_str().to_string())
                .or_insert_with(|| RefundReceipt {
                    id: format!("re_{}", next),
                    status: "succeeded".to_string(),
                });
            Ok(receipt.clone())
        }

        async fn create_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PortError> {
            let mut intents = self.intents.write().await;
            let next = intents.len() + 1;
            let intent = intents
                .entry(request.idempotency_key.as_str().to_string())
                .or_insert_with(|| PaymentIntent {
                    id: format!("pi_{}", next),
                    client_secret: format!("pi_{}_secret", next),
                });
            Ok(intent.clone())
        }
    }

    /// Records submissions; fails or stalls on demand per airline
    #[derive(Debug, Default)]
    pub struct MockAirlineSubmitter {
        submissions: RwLock<Vec<AirlineSubmission>>,
        receipts: RwLock<HashMap<String, SubmissionReceipt>>,
        failing_airlines: RwLock<HashSet<String>>,
        stalled_airlines: RwLock<HashSet<String>>,
    }

    impl MockAirlineSubmitter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Rejects every submission to `airline_code`
        pub async fn fail_for(&self, airline_code: &str) {
            self.failing_airlines.write().await.insert(airline_code.to_string());
        }

        /// Never answers submissions to `airline_code`
        pub async fn stall_for(&self, airline_code: &str) {
            self.stalled_airlines.write().await.insert(airline_code.to_string());
        }

        pub async fn submissions(&self) -> Vec<AirlineSubmission> {
            self.submissions.read().await.clone()
        }
    }

    impl DomainPort for MockAirlineSubmitter {}

    #[async_trait]
    impl AirlineSubmissionPort for MockAirlineSubmitter {
        async fn submit(
            &self,
            config: &AirlineConfig,
            submission: &AirlineSubmission,
            idempotency_key: &IdempotencyKey,
        ) -> Result<SubmissionReceipt, PortError> {
            let code = config.code.as_str().to_string();

            if self.stalled_airlines.read().await.contains(&code) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing_airlines.read().await.contains(&code) {
                return Err(PortError::ServiceUnavailable {
                    service: format!("{} claims channel", config.name),
                });
            }

            let mut receipts = self.receipts.write().await;
            if let Some(existing) = receipts.get(idempotency_key.as_str()) {
                return Ok(existing.clone());
            }
            self.submissions.write().await.push(submission.clone());
            let receipt = SubmissionReceipt {
                reference: format!("{}-{}", code, receipts.len() + 1000),
            };
            receipts.insert(idempotency_key.as_str().to_string(), receipt.clone());
            Ok(receipt)
        }
    }
}
