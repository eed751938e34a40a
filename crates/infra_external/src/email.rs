//! Transactional email provider adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use core_kernel::{DomainPort, PortError};
use domain_notification::{EmailSenderPort, OutboundEmail, SentMessage};

use crate::http::{self, HttpServiceConfig};

const SERVICE: &str = "email provider";

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// HTTP implementation of `EmailSenderPort` for a Resend-style JSON API
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    client: Client,
    config: HttpServiceConfig,
    from: String,
}

impl HttpEmailSender {
    pub fn new(config: HttpServiceConfig, from: impl Into<String>) -> Result<Self, PortError> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            config,
            from: from.into(),
        })
    }
}

impl DomainPort for HttpEmailSender {}

#[async_trait]
impl EmailSenderPort for HttpEmailSender {
    #[instrument(skip_all, fields(to = %email.to))]
    async fn send(&self, email: &OutboundEmail) -> Result<SentMessage, PortError> {
        let body = SendEmailBody {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(self.config.url("/emails"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::map_transport("email send", self.config.timeout, e))?;

        let response = http::check(SERVICE, response).await?;
        let sent: SendEmailResponse = http::decode("email send", response).await?;

        debug!(message_id = %sent.id, "email accepted by provider");
        Ok(SentMessage { id: sent.id })
    }
}
