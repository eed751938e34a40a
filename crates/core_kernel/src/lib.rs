//! Core Kernel - Foundational types for the claim orchestration engine
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Port error taxonomy and the `Clock` port
//! - Deterministic idempotency keys for side-effecting external calls
//! - Bounded-concurrency batch execution with per-call timeouts

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod idempotency;
pub mod batch;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{ClaimId, PaymentId, EmailId, AirlineCode};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    Clock, SystemClock, FixedClock,
};
pub use idempotency::IdempotencyKey;
pub use batch::{BatchRunner, ItemPanic, with_timeout};
pub use error::CoreError;
