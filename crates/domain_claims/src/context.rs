//! Collaborators shared by the processors

use std::sync::Arc;

use core_kernel::Clock;
use domain_notification::NotificationQueue;

use crate::airline::AirlineRegistry;
use crate::policy::ProcessingPolicy;
use crate::ports::{AirlineSubmissionPort, ClaimStorePort, PaymentProcessorPort};

/// Everything a processor needs, wired once at startup
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn ClaimStorePort>,
    pub payments: Arc<dyn PaymentProcessorPort>,
    pub airlines: Arc<dyn AirlineSubmissionPort>,
    pub registry: Arc<AirlineRegistry>,
    pub queue: Arc<NotificationQueue>,
    pub clock: Arc<dyn Clock>,
    pub policy: ProcessingPolicy,
}
