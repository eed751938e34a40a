//! Payment processor adapter
//!
//! Talks to a Stripe-compatible REST API: form-encoded requests, bearer
//! secret key, and the `Idempotency-Key` header on every mutating call so a
//! repeated refund or intent collapses into the original one.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument};

use core_kernel::{DomainPort, PortError};
use domain_claims::{
    PaymentIntent, PaymentIntentRequest, PaymentProcessorPort, RefundReceipt, RefundRequest,
};

use crate::http::{self, HttpServiceConfig};

const SERVICE: &str = "payment processor";

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

/// HTTP implementation of `PaymentProcessorPort`
#[derive(Debug, Clone)]
pub struct HttpPaymentProcessor {
    client: Client,
    config: HttpServiceConfig,
}

impl HttpPaymentProcessor {
    pub fn new(config: HttpServiceConfig) -> Result<Self, PortError> {
        Ok(Self {
            client: http::build_client(config.timeout)?,
            config,
        })
    }
}

impl DomainPort for HttpPaymentProcessor {}

#[async_trait]
impl PaymentProcessorPort for HttpPaymentProcessor {
    #[instrument(skip_all, fields(transaction_id = %request.transaction_id, key = %request.idempotency_key))]
    async fn refund(&self, request: &RefundRequest) -> Result<RefundReceipt, PortError> {
        let mut form = vec![("charge", request.transaction_id.clone())];
        if let Some(amount) = request.amount {
            let minor = amount
                .to_minor()
                .map_err(|e| PortError::validation(format!("refund amount: {}", e)))?;
            form.push(("amount", minor.to_string()));
        }

        let response = self
            .client
            .post(self.config.url("/v1/refunds"))
            .bearer_auth(&self.config.api_key)
            .header("Idempotency-Key", request.idempotency_key.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| http::map_transport("refund", self.config.timeout, e))?;

        let response = http::check(SERVICE, response).await?;
        let body: RefundResponse = http::decode("refund", response).await?;

        if body.status == "failed" || body.status == "canceled" {
            return Err(PortError::rejected(
                SERVICE,
                body.failure_reason
                    .unwrap_or_else(|| format!("refund {} {}", body.id, body.status)),
            ));
        }

        info!(refund_id = %body.id, status = %body.status, "refund accepted");
        Ok(RefundReceipt { id: body.id, status: body.status })
    }

    #[instrument(skip_all, fields(key = %request.idempotency_key))]
    async fn create_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent, PortError> {
        let minor = request
            .amount
            .to_minor()
            .map_err(|e| PortError::validation(format!("intent amount: {}", e)))?;

        let mut form = vec![
            ("amount".to_string(), minor.to_string()),
            ("currency".to_string(), request.amount.currency().code().to_lowercase()),
        ];
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let response = self
            .client
            .post(self.config.url("/v1/payment_intents"))
            .bearer_auth(&self.config.api_key)
            .header("Idempotency-Key", request.idempotency_key.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| http::map_transport("create payment intent", self.config.timeout, e))?;

        let response = http::check(SERVICE, response).await?;
        let body: IntentResponse = http::decode("create payment intent", response).await?;

        Ok(PaymentIntent { id: body.id, client_secret: body.client_secret })
    }
}
