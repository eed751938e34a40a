//! PostgreSQL Claim Store Adapter
//!
//! Implements `ClaimStorePort` on top of `ClaimsRepository`. Database errors
//! are translated to `PortError` so the processors see the store like any
//! other external service.
//!
//! ```rust,ignore
//! use infra_db::PostgresClaimStore;
//! use domain_claims::ClaimStorePort;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn ClaimStorePort> = Arc::new(PostgresClaimStore::new(pool));
//! let ready = store.get_by_status(ClaimStatus::ReadyToFile).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PaymentId, PortError,
};
use domain_claims::{Claim, ClaimPatch, ClaimStatus, ClaimStorePort, Payment};

use crate::repositories::ClaimsRepository;

const ADAPTER_ID: &str = "postgres-claim-store";

/// PostgreSQL-backed record store
#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    repository: ClaimsRepository,
    pool: PgPool,
}

impl PostgresClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    /// The underlying repository, for intake and seeding paths the port does not cover
    pub fn repository(&self) -> &ClaimsRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ClaimStorePort for PostgresClaimStore {
    #[instrument(skip_all, fields(status = %status))]
    async fn get_by_status(&self, status: ClaimStatus) -> Result<Vec<Claim>, PortError> {
        Ok(self.repository.get_by_status(status).await?)
    }

    #[instrument(skip_all, fields(claim_id = %claim_id))]
    async fn get_by_id(&self, claim_id: &ClaimId) -> Result<Option<Claim>, PortError> {
        Ok(self.repository.get_by_id(claim_id).await?)
    }

    #[instrument(skip_all, fields(claim_id = %claim_id, status = ?patch.status))]
    async fn update(&self, claim_id: &ClaimId, patch: &ClaimPatch) -> Result<bool, PortError> {
        if patch.is_empty() {
            debug!("empty patch, nothing to write");
            return Ok(self.repository.get_by_id(claim_id).await?.is_some());
        }
        Ok(self.repository.apply_patch(claim_id, patch).await?)
    }

    #[instrument(skip_all, fields(payment_id = %payment_id))]
    async fn get_payment(&self, payment_id: &PaymentId) -> Result<Option<Payment>, PortError> {
        Ok(self.repository.get_payment(payment_id).await?)
    }
}
