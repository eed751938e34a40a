//! HTTP API Layer
//!
//! The trigger and operator surface of the claim engine, built on Axum.
//!
//! # Routes
//!
//! - `/api/cron/*` - processor triggers. `POST` runs the processor and needs
//!   `Authorization: Bearer <cron secret>`; `GET` is an unauthenticated,
//!   side-effect-free status probe.
//! - `/api/admin/*` - operator actions behind a JWT with the `operator` role,
//!   audit-logged.
//! - `/health`, `/health/ready` - liveness and adapter readiness.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(ctx, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_claims::EngineContext;

use crate::config::ApiConfig;
use crate::handlers::{admin, cron, health};
use crate::middleware::{audit_middleware, cron_auth_middleware, operator_auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ctx: EngineContext,
    pub config: Arc<ApiConfig>,
    /// Adapters consulted by `/health/ready`
    pub health_checks: Vec<Arc<dyn HealthCheckable>>,
}

impl AppState {
    pub fn new(ctx: EngineContext, config: ApiConfig) -> Self {
        Self {
            ctx,
            config: Arc::new(config),
            health_checks: Vec::new(),
        }
    }

    pub fn with_health_check(mut self, check: Arc<dyn HealthCheckable>) -> Self {
        self.health_checks.push(check);
        self
    }

    pub fn cron_configured(&self) -> bool {
        self.config.cron_secret().is_some()
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let cron_routes = Router::new()
        .route(
            "/automatic-filing",
            post(cron::automatic_filing).get(cron::automatic_filing_status),
        )
        .route("/follow-up", post(cron::follow_up).get(cron::follow_up_status))
        .route(
            "/automatic-refunds",
            post(cron::automatic_refunds).get(cron::automatic_refunds_status),
        )
        .route(
            "/process-email-queue",
            post(cron::process_email_queue).get(cron::email_queue_status),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), cron_auth_middleware));

    let admin_routes = Router::new()
        .route("/refunds", post(admin::manual_refunds))
        .route("/email-queue", get(admin::list_email_queue))
        .route("/email-queue/:id/retry", post(admin::retry_email))
        .route("/email-queue/sent", delete(admin::clear_sent_emails))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), operator_auth_middleware));

    let request_timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));

    Router::new()
        .merge(public_routes)
        .nest("/api/cron", cron_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
