//! Claim Orchestrator - API Server Binary
//!
//! Wires the PostgreSQL record store, the HTTP provider adapters and the
//! email queue into the processors, then serves the trigger and operator API.
//!
//! # Usage
//!
//! ```bash
//! API_CRON_SECRET=... API_DATABASE_URL=postgres://... cargo run --bin claims-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST`, `API_PORT` - bind address (default: 0.0.0.0:8080)
//! * `API_CRON_SECRET` - bearer secret for `/api/cron/*` (unset: triggers answer 503)
//! * `API_JWT_SECRET` - operator token signing secret (required)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - log filter when `RUST_LOG` is unset (default: info)
//! * `API_PAYMENT_API_URL`, `API_PAYMENT_API_KEY` - payment processor (required)
//! * `API_EMAIL_API_URL`, `API_EMAIL_API_KEY`, `API_EMAIL_FROM` - email provider (required)
//! * `API_OPERATOR_EMAIL` - recipient of operator alerts
//! * `API_AIRLINES_FILE` - JSON airline registry (default: built-in registry)
//! * `API_FILING_SLA_DAYS`, `API_FOLLOW_UP_CADENCE_DAYS`, `API_REFUND_DEADLINE_DAYS`
//! * `API_FILING_CONCURRENCY`, `API_REFUND_CONCURRENCY`, `API_EXTERNAL_CALL_TIMEOUT_SECS`
//! * `API_QUEUE_BATCH_SIZE`, `API_QUEUE_MAX_ATTEMPTS`, `API_QUEUE_RETRY_DELAY_SECS`,
//!   `API_QUEUE_DRAIN_INTERVAL_SECS`

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::SystemClock;
use domain_claims::{AirlineRegistry, EngineContext};
use domain_notification::{EmailSenderPort, NotificationQueue};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimStore};
use infra_external::{HttpAirlineSubmitter, HttpEmailSender, HttpPaymentProcessor, HttpServiceConfig};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;
    config.validate().context("refusing to start")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        cron_enabled = config.cron_secret().is_some(),
        "Starting claim orchestrator API server"
    );

    let pool = create_pool(
        DatabaseConfig::new(&config.database_url)
            .max_connections((config.filing_concurrency + config.refund_concurrency + 2) as u32),
    )
    .await
    .context("database connection failed")?;
    run_migrations(&pool).await.context("database migrations failed")?;

    let store = Arc::new(PostgresClaimStore::new(pool));

    let email: Arc<dyn EmailSenderPort> = Arc::new(HttpEmailSender::new(
        HttpServiceConfig::new(&config.email_api_url, &config.email_api_key)
            .timeout(config.call_timeout()),
        &config.email_from,
    )?);
    let payments = Arc::new(HttpPaymentProcessor::new(
        HttpServiceConfig::new(&config.payment_api_url, &config.payment_api_key)
            .timeout(config.call_timeout()),
    )?);
    let airlines = Arc::new(HttpAirlineSubmitter::new(email.clone(), config.call_timeout())?);
    let registry = load_registry(&config).await?;

    let queue = Arc::new(NotificationQueue::new(
        email,
        Arc::new(SystemClock),
        config.queue_config(),
    ));
    let drain = queue.start(config.drain_interval());

    let ctx = EngineContext {
        store: store.clone(),
        payments,
        airlines,
        registry: Arc::new(registry),
        queue,
        clock: Arc::new(SystemClock),
        policy: config.processing_policy(),
    };

    let addr: SocketAddr = config.server_addr().parse().context("invalid bind address")?;
    let app = create_router(AppState::new(ctx, config).with_health_check(store));

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain.stop().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over `API_LOG_LEVEL`
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

async fn load_registry(config: &ApiConfig) -> anyhow::Result<AirlineRegistry> {
    let Some(path) = &config.airlines_file else {
        let registry = AirlineRegistry::builtin();
        tracing::info!(airlines = registry.len(), "using built-in airline registry");
        return Ok(registry);
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read airline registry {}", path))?;
    let registry = AirlineRegistry::from_json(&json)
        .with_context(|| format!("invalid airline registry {}", path))?;
    tracing::info!(airlines = registry.len(), path = %path, "loaded airline registry");
    Ok(registry)
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
