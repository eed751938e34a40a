//! Airline submission channels
//!
//! One adapter covers the three delivery methods an airline can require:
//! - `api`: JSON POST to the airline's claims API
//! - `web_form`: form POST of the claim fields to the airline's web form
//! - `email`: the claim letter sent through the email provider
//!
//! HTTP channels carry the filing idempotency key as `Idempotency-Key`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{DomainPort, IdempotencyKey, PortError};
use domain_claims::{
    AirlineConfig, AirlineSubmission, AirlineSubmissionPort, SubmissionMethod, SubmissionReceipt,
};
use domain_notification::{escape_html, EmailSenderPort, OutboundEmail};

use crate::http;

#[derive(Debug, Serialize)]
struct ApiClaimBody<'a> {
    claim_id: &'a str,
    airline_code: &'a str,
    subject: &'a str,
    fields: &'a BTreeMap<String, String>,
    documents: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ApiClaimResponse {
    #[serde(alias = "claim_reference", alias = "case_id")]
    reference: String,
}

/// Airline filing over HTTP and email
pub struct HttpAirlineSubmitter {
    client: Client,
    email: Arc<dyn EmailSenderPort>,
    timeout: Duration,
}

impl HttpAirlineSubmitter {
    pub fn new(email: Arc<dyn EmailSenderPort>, timeout: Duration) -> Result<Self, PortError> {
        Ok(Self {
            client: http::build_client(timeout)?,
            email,
            timeout,
        })
    }

    async fn submit_api(
        &self,
        config: &AirlineConfig,
        submission: &AirlineSubmission,
        key: &IdempotencyKey,
    ) -> Result<SubmissionReceipt, PortError> {
        let body = ApiClaimBody {
            claim_id: &submission.claim_id,
            airline_code: submission.airline_code.as_str(),
            subject: &submission.subject,
            fields: &submission.fields,
            documents: &submission.documents,
        };

        let response = self
            .client
            .post(&config.endpoint)
            .header("Idempotency-Key", key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| http::map_transport("airline api submission", self.timeout, e))?;

        let response = http::check(&config.name, response).await?;
        let receipt: ApiClaimResponse = http::decode("airline api submission", response).await?;
        Ok(SubmissionReceipt { reference: receipt.reference })
    }

    async fn submit_form(
        &self,
        config: &AirlineConfig,
        submission: &AirlineSubmission,
        key: &IdempotencyKey,
    ) -> Result<SubmissionReceipt, PortError> {
        let response = self
            .client
            .post(&config.endpoint)
            .header("Idempotency-Key", key.as_str())
            .form(&submission.fields)
            .send()
            .await
            .map_err(|e| http::map_transport("airline form submission", self.timeout, e))?;

        let response = http::check(&config.name, response).await?;

        // Forms rarely answer with a case number; fall back to our own reference
        let text = response.text().await.unwrap_or_default();
        let reference = serde_json::from_str::<ApiClaimResponse>(&text)
            .map(|r| r.reference)
            .unwrap_or_else(|_| form_reference(submission));
        Ok(SubmissionReceipt { reference })
    }

    async fn submit_email(
        &self,
        config: &AirlineConfig,
        submission: &AirlineSubmission,
    ) -> Result<SubmissionReceipt, PortError> {
        let email = OutboundEmail {
            to: config.endpoint.clone(),
            subject: submission.subject.clone(),
            html: format!("<pre>{}</pre>", escape_html(&submission.body)),
            text: submission.body.clone(),
        };
        let sent = self.email.send(&email).await?;
        Ok(SubmissionReceipt {
            reference: format!("{}-EM-{}", submission.airline_code, sent.id),
        })
    }
}

impl DomainPort for HttpAirlineSubmitter {}

fn form_reference(submission: &AirlineSubmission) -> String {
    format!("{}-WF-{}", submission.airline_code, submission.claim_id)
}

#[async_trait]
impl AirlineSubmissionPort for HttpAirlineSubmitter {
    #[instrument(skip_all, fields(claim_id = %submission.claim_id, airline = %config.code, method = ?config.method))]
    async fn submit(
        &self,
        config: &AirlineConfig,
        submission: &AirlineSubmission,
        idempotency_key: &IdempotencyKey,
    ) -> Result<SubmissionReceipt, PortError> {
        let receipt = match config.method {
            SubmissionMethod::Api => self.submit_api(config, submission, idempotency_key).await?,
            SubmissionMethod::WebForm => self.submit_form(config, submission, idempotency_key).await?,
            SubmissionMethod::Email => self.submit_email(config, submission).await?,
        };
        info!(reference = %receipt.reference, "claim submitted to airline");
        Ok(receipt)
    }
}
