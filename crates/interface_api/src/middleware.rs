//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use crate::auth::{self, roles, CronAuth, OperatorClaims};
use crate::error::ApiError;
use crate::AppState;

fn authorization(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Cron trigger authentication
///
/// `GET` is the unauthenticated status probe and passes through. Every other
/// method needs the cron secret: 401 when it is missing or wrong, 503 when
/// no secret is configured. Rejected requests never reach the processors.
pub async fn cron_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::GET {
        return next.run(request).await;
    }

    match auth::verify_cron_secret(authorization(&request), state.config.cron_secret()) {
        CronAuth::Authorized => next.run(request).await,
        CronAuth::Rejected => {
            warn!(uri = %request.uri(), "cron trigger rejected: bad or missing secret");
            ApiError::Unauthorized.into_response()
        }
        CronAuth::Unconfigured => {
            warn!(uri = %request.uri(), "cron trigger refused: no cron secret configured");
            ApiError::ServiceUnavailable("cron secret is not configured".to_string()).into_response()
        }
    }
}

/// Operator authentication
///
/// Validates the JWT and requires the `operator` role (or `admin`).
pub async fn operator_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = auth::bearer_token(authorization(&request)) else {
        warn!("Missing or invalid Authorization header");
        return ApiError::Unauthorized.into_response();
    };

    match auth::validate_token(token, &state.config.jwt_secret) {
        Ok(claims) if auth::has_role(&claims, roles::OPERATOR) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Ok(claims) => {
            warn!(user = %claims.sub, "operator role missing");
            ApiError::Forbidden(format!("role '{}' required", roles::OPERATOR)).into_response()
        }
        Err(e) => {
            warn!("Token validation failed: {:?}", e);
            ApiError::Unauthorized.into_response()
        }
    }
}

/// Audit logging middleware
///
/// Logs every operator request with the acting user.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_id = request
        .extensions()
        .get::<OperatorClaims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        user = %user_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "operator request"
    );

    response
}
