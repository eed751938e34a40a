//! External Service Adapters
//!
//! HTTP implementations of the ports the claim processors call out through:
//!
//! - `HttpPaymentProcessor` - refunds and payment intents
//! - `HttpEmailSender` - transactional email
//! - `HttpAirlineSubmitter` - airline filing by API, web form or email
//!
//! Every adapter reports failures as `PortError`; see [`http`] for the
//! status code mapping.

pub mod http;
pub mod payment;
pub mod email;
pub mod airline;

pub use http::HttpServiceConfig;
pub use payment::HttpPaymentProcessor;
pub use email::HttpEmailSender;
pub use airline::HttpAirlineSubmitter;
