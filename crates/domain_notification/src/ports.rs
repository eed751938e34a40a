//! Notification Ports
//!
//! The transactional email provider is consumed through `EmailSenderPort`.
//! The HTTP implementation lives in `infra_external`; an in-memory recorder is
//! available behind the `mock` feature.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};
use crate::email::OutboundEmail;

/// Provider acknowledgement of a delivered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

/// Port for the transactional email provider
#[async_trait]
pub trait EmailSenderPort: DomainPort {
    /// Sends one message, returning the provider's message id
    async fn send(&self, email: &OutboundEmail) -> Result<SentMessage, PortError>;
}

/// Mock implementation of EmailSenderPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tokio::sync::RwLock;

    /// Records sent messages and fails on demand
    #[derive(Debug, Default)]
    pub struct MockEmailSender {
        sent: RwLock<Vec<OutboundEmail>>,
        /// Remaining forced failures per recipient
        failures: RwLock<HashMap<String, u32>>,
        fail_all: AtomicBool,
        /// Provider latency applied before each send
        latency: RwLock<Option<std::time::Duration>>,
        next_id: AtomicU64,
    }

    impl MockEmailSender {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fails the next `times` sends to `recipient`
        pub async fn fail_next(&self, recipient: &str, times: u32) {
            self.failures.write().await.insert(recipient.to_string(), times);
        }

        /// Fails every send until switched off
        pub fn set_fail_all(&self, fail: bool) {
            self.fail_all.store(fail, Ordering::SeqCst);
        }

        /// Delays every send by `latency`; `None` answers immediately
        pub async fn set_latency(&self, latency: Option<std::time::Duration>) {
            *self.latency.write().await = latency;
        }

        pub async fn sent(&self) -> Vec<OutboundEmail> {
            self.sent.read().await.clone()
        }

        pub async fn sent_to(&self, recipient: &str) -> Vec<OutboundEmail> {
            self.sent
                .read()
                .await
                .iter()
                .filter(|e| e.to == recipient)
                .cloned()
                .collect()
        }
    }

    impl DomainPort for MockEmailSender {}

    #[async_trait]
    impl EmailSenderPort for MockEmailSender {
        async fn send(&self, email: &OutboundEmail) -> Result<SentMessage, PortError> {
            let latency = *self.latency.read().await;
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            if self.fail_all.load(Ordering::SeqCst) {
                return Err(PortError::ServiceUnavailable {
                    service: "mock email provider".to_string(),
                });
            }

            {
                let mut failures = self.failures.write().await;
                if let Some(remaining) = failures.get_mut(&email.to) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(PortError::connection(format!(
                            "forced failure for {}",
                            email.to
                        )));
                    }
                }
            }

            self.sent.write().await.push(email.clone());
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SentMessage { id: format!("msg_{}", id) })
        }
    }
}
