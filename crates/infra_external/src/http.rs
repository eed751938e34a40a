//! Shared HTTP plumbing
//!
//! Provider responses are mapped to `PortError` the same way for every
//! adapter:
//! - 401/403 -> `PortError::Unauthorized`
//! - 404 -> `PortError::NotFound`
//! - 409 -> `PortError::Conflict`
//! - 429 -> `PortError::RateLimited`
//! - other 4xx -> `PortError::Rejected`
//! - 5xx -> `PortError::ServiceUnavailable`
//! - timeouts -> `PortError::Timeout`, connect failures -> `PortError::Connection`

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use core_kernel::PortError;

/// Connection settings for one provider
#[derive(Debug, Clone)]
pub struct HttpServiceConfig {
    /// Base URL without trailing slash, e.g. `https://api.stripe.com`
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl HttpServiceConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Builds a client with the provider timeout applied to every request
pub fn build_client(timeout: Duration) -> Result<Client, PortError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PortError::internal(format!("failed to build HTTP client: {}", e)))
}

/// Maps a non-success status to a port error
pub fn map_status(
    service: &str,
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> PortError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, truncate(body, 500))
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized {
            message: format!("{} refused credentials ({})", service, status),
        },
        StatusCode::NOT_FOUND => PortError::not_found(service, detail),
        StatusCode::CONFLICT => PortError::Conflict { message: detail },
        StatusCode::TOO_MANY_REQUESTS => PortError::RateLimited {
            retry_after_secs: retry_after_secs.unwrap_or(60),
        },
        s if s.is_server_error() => PortError::ServiceUnavailable {
            service: format!("{} ({})", service, s),
        },
        _ => PortError::rejected(service, detail),
    }
}

/// Maps a transport failure to a port error
pub fn map_transport(operation: &str, timeout: Duration, error: reqwest::Error) -> PortError {
    if error.is_timeout() {
        PortError::timeout(operation, timeout)
    } else if error.is_connect() {
        PortError::Connection {
            message: format!("{}: {}", operation, error),
            source: Some(Box::new(error)),
        }
    } else if error.is_decode() {
        PortError::Transformation {
            message: format!("{}: undecodable response: {}", operation, error),
        }
    } else {
        PortError::Internal {
            message: format!("{}: {}", operation, error),
            source: Some(Box::new(error)),
        }
    }
}

/// Passes successful responses through, turns the rest into port errors
pub async fn check(service: &str, response: Response) -> Result<Response, PortError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    warn!(service, status = %status, "provider returned an error");
    Err(map_status(service, status, retry_after, &body))
}

/// Decodes a JSON body, reporting malformed payloads as transformation errors
pub async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T, PortError> {
    let bytes = response.bytes().await.map_err(|e| PortError::Transformation {
        message: format!("{}: failed to read response: {}", operation, e),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| PortError::Transformation {
        message: format!("{}: unexpected response: {}", operation, e),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = map_status("stripe", status, None, "");
            assert!(matches!(err, PortError::Unauthorized { .. }));
        }
    }

    #[test]
    fn test_rate_limit_uses_retry_after() {
        let err = map_status("resend", StatusCode::TOO_MANY_REQUESTS, Some(12), "");
        assert!(matches!(err, PortError::RateLimited { retry_after_secs: 12 }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_server_errors_are_transient() {
        let err = map_status("airline", StatusCode::BAD_GATEWAY, None, "upstream down");
        assert!(matches!(err, PortError::ServiceUnavailable { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_rejections() {
        let err = map_status("stripe", StatusCode::PAYMENT_REQUIRED, None, "charge_already_refunded");
        match err {
            PortError::Rejected { service, message } => {
                assert_eq!(service, "stripe");
                assert!(message.contains("charge_already_refunded"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_found_and_conflict() {
        assert!(map_status("x", StatusCode::NOT_FOUND, None, "").is_not_found());
        assert!(matches!(
            map_status("x", StatusCode::CONFLICT, None, "dup"),
            PortError::Conflict { .. }
        ));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[test]
    fn test_config_url_joining() {
        let config = HttpServiceConfig::new("https://api.example.com/", "key");
        assert_eq!(config.url("/v1/refunds"), "https://api.example.com/v1/refunds");
    }
}
