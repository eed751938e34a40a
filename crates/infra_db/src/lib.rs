//! Infrastructure Database Layer
//!
//! The durable record store for claims and their service-fee payments,
//! implemented on PostgreSQL with SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: `ClaimsRepository` owns the SQL,
//! `PostgresClaimStore` adapts it to the domain's `ClaimStorePort`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, run_migrations};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresClaimStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::ClaimsRepository;
pub use adapters::PostgresClaimStore;
