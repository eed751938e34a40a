//! Domain Adapters
//!
//! Implementations of domain ports backed by PostgreSQL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimStore;
//! use domain_claims::ClaimStorePort;
//!
//! let store: Arc<dyn ClaimStorePort> = Arc::new(PostgresClaimStore::new(pool));
//! let ready = store.get_by_status(ClaimStatus::ReadyToFile).await?;
//! ```

pub mod claims;

pub use claims::PostgresClaimStore;
