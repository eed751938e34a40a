//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the claim
//! orchestration test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed instants, airline data, and the wired `TestHarness`
//! - `builders`: Builder patterns for claims and payments
//! - `assertions`: Assertion helpers for claims and batch results
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
