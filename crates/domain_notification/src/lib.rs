//! Notification Domain
//!
//! Outbound email for the claim processors. Processors enqueue messages and
//! return immediately; the queue drains on its own interval, retrying failed
//! deliveries with a fixed delay until `max_attempts` is exhausted.
//!
//! # Queue item lifecycle
//!
//! ```text
//! pending -> processing -> sent
//!                       -> retry --(retry delay)--> pending
//!                       -> failed --(operator retry)--> pending
//! ```

pub mod email;
pub mod templates;
pub mod ports;
pub mod queue;
pub mod error;

pub use email::{QueuedEmail, EmailPriority, EmailStatus, EmailRequest, OutboundEmail};
pub use templates::{EmailTemplate, RenderedEmail, escape_html};
pub use ports::{EmailSenderPort, SentMessage};
pub use queue::{NotificationQueue, QueueConfig, QueueMetrics, DrainReport, QueueHandle};
pub use error::NotificationError;
