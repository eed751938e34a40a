//! Claims Domain
//!
//! This crate implements the flight-delay claim lifecycle and the periodic
//! processors that drive it: automatic filing with airlines, follow-up and
//! overdue detection, and automatic service-fee refunds.
//!
//! # Claim Lifecycle
//!
//! ```text
//! submitted -> validated -> documents_prepared -> ready_to_file -> filed
//!   -> airline_acknowledged -> monitoring -> airline_responded
//!   -> approved | rejected -> completed
//!
//! refunded <- submitted | validated | ready_to_file | filed | monitoring | rejected
//! ```
//!
//! Processors are plain async functions invoked by an external trigger. They
//! share no in-process locks; overlapping runs stay correct by re-reading a
//! claim before acting on it and by passing deterministic idempotency keys on
//! every side-effecting call.

pub mod claim;
pub mod lifecycle;
pub mod payment;
pub mod airline;
pub mod policy;
pub mod ports;
pub mod context;
pub mod filing;
pub mod follow_up;
pub mod refund;
pub mod error;
mod alerts;

pub use claim::{
    Claim, ClaimStatus, ClaimPatch, ClaimSummary, DocumentationStatus, FlightEligibility,
    RefundTrigger, StatusChange,
};
pub use lifecycle::{transition, can_transition, Transition, TransitionCause};
pub use payment::{Payment, PaymentStatus};
pub use airline::{AirlineConfig, AirlineRegistry, AirlineSubmission, ClaimField, SubmissionMethod};
pub use policy::ProcessingPolicy;
pub use ports::{
    ClaimStorePort, PaymentProcessorPort, AirlineSubmissionPort, RefundRequest, RefundReceipt,
    PaymentIntentRequest, PaymentIntent, SubmissionReceipt,
};
pub use context::EngineContext;
pub use filing::{FilingProcessor, FilingResult, FilingRun, FilingSummary};
pub use follow_up::{FollowUpDetector, FollowUpReport};
pub use refund::{RefundProcessor, RefundCandidates, RefundBatchResult, RefundOutcome, RefundSummary};
pub use error::{ClaimError, ErrorKind};
