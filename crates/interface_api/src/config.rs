//! API configuration

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use domain_claims::ProcessingPolicy;
use domain_notification::QueueConfig;

/// Placeholder JWT secret of the default configuration; never accepted at startup
const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Settings the server refuses to start with
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("API_{0} must be set")]
    Missing(&'static str),
    #[error("API_JWT_SECRET still has the placeholder value")]
    PlaceholderJwtSecret,
}

/// API configuration, read from `API_*` environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Shared secret for the cron trigger endpoints; unset disables them
    pub cron_secret: Option<String>,
    /// JWT secret for operator authentication
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub database_url: String,
    pub log_level: String,
    /// Upper bound on a whole HTTP request
    pub request_timeout_secs: u64,

    pub payment_api_url: String,
    pub payment_api_key: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub operator_email: String,
    /// JSON airline registry; the built-in registry is used when unset
    pub airlines_file: Option<String>,

    pub filing_sla_days: i64,
    pub follow_up_cadence_days: i64,
    pub refund_deadline_days: i64,
    pub filing_concurrency: usize,
    pub refund_concurrency: usize,
    pub external_call_timeout_secs: u64,

    pub queue_batch_size: usize,
    pub queue_max_attempts: u32,
    pub queue_retry_delay_secs: u64,
    pub queue_drain_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let policy = ProcessingPolicy::default();
        let queue = QueueConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cron_secret: None,
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/claims".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 300,
            payment_api_url: "https://api.stripe.com".to_string(),
            payment_api_key: String::new(),
            email_api_url: "https://api.resend.com".to_string(),
            email_api_key: String::new(),
            email_from: "claims@flightclaims.example".to_string(),
            operator_email: policy.operator_email,
            airlines_file: None,
            filing_sla_days: policy.filing_sla_days,
            follow_up_cadence_days: policy.follow_up_cadence_days,
            refund_deadline_days: policy.refund_deadline_days,
            filing_concurrency: policy.filing_concurrency,
            refund_concurrency: policy.refund_concurrency,
            external_call_timeout_secs: policy.call_timeout.as_secs(),
            queue_batch_size: queue.batch_size,
            queue_max_attempts: queue.max_attempts,
            queue_retry_delay_secs: queue.retry_delay.as_secs(),
            queue_drain_interval_secs: 60,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Checks the credentials and addresses the processors cannot run without
    ///
    /// The cron secret is not checked here: without it the triggers answer 503.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigValidationError::Missing("JWT_SECRET"));
        }
        if self.jwt_secret == PLACEHOLDER_JWT_SECRET {
            return Err(ConfigValidationError::PlaceholderJwtSecret);
        }

        let required = [
            ("PAYMENT_API_URL", &self.payment_api_url),
            ("PAYMENT_API_KEY", &self.payment_api_key),
            ("EMAIL_API_URL", &self.email_api_url),
            ("EMAIL_API_KEY", &self.email_api_key),
            ("EMAIL_FROM", &self.email_from),
            ("OPERATOR_EMAIL", &self.operator_email),
            ("DATABASE_URL", &self.database_url),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ConfigValidationError::Missing(*name)),
            None => Ok(()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured cron secret, treating an empty value as unset
    pub fn cron_secret(&self) -> Option<&str> {
        self.cron_secret.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }

    pub fn processing_policy(&self) -> ProcessingPolicy {
        ProcessingPolicy {
            filing_sla_days: self.filing_sla_days,
            follow_up_cadence_days: self.follow_up_cadence_days,
            refund_deadline_days: self.refund_deadline_days,
            filing_concurrency: self.filing_concurrency.max(1),
            refund_concurrency: self.refund_concurrency.max(1),
            call_timeout: self.call_timeout(),
            operator_email: self.operator_email.clone(),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            batch_size: self.queue_batch_size.max(1),
            max_attempts: self.queue_max_attempts.max(1),
            retry_delay: Duration::from_secs(self.queue_retry_delay_secs),
            send_timeout: self.call_timeout(),
            ..QueueConfig::default()
        }
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.queue_drain_interval_secs.max(1))
    }
}
