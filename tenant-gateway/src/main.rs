use std::sync::Arc;
use std::time::Duration;

use tenant_gateway::{
    build_router,
    config::GatewayConfig,
    services::{FixedWindowLimiter, HttpDirectoryStore, HttpIdentityProvider},
    AppState, BackendClients,
};

use guard_core::observability::logging::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), guard_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = GatewayConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting tenant gateway"
    );

    // Missing credentials are not fatal here: the guard answers each
    // protected request with a configuration error instead.
    let backend = match config.backend.credentials() {
        Some((url, key)) => {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            tracing::info!(backend_url = %url, "Backend clients initialized");
            Some(BackendClients {
                identity: Arc::new(HttpIdentityProvider::new(http.clone(), &url, &key)),
                directory: Arc::new(HttpDirectoryStore::new(http, &url, &key)),
            })
        }
        None => {
            tracing::warn!("Backend credentials not set; all guarded requests will be refused");
            None
        }
    };

    let membership_limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit.membership_attempts,
        Duration::from_secs(config.rate_limit.membership_window_seconds),
    ));
    let sweeper = membership_limiter
        .spawn_sweeper(Duration::from_secs(config.rate_limit.sweep_interval_seconds));
    tracing::info!(
        attempts = config.rate_limit.membership_attempts,
        window_seconds = config.rate_limit.membership_window_seconds,
        "Membership rate limiter initialized"
    );

    let state = AppState {
        config: config.clone(),
        backend,
        membership_limiter,
    };

    let app = build_router(state);

    let addr = config.common.bind_addr()?;
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
