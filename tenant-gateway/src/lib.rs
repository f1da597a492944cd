pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::services::{DirectoryStore, FixedWindowLimiter, IdentityProvider};
use guard_core::error::AppError;
use guard_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};

/// Clients for the hosted backend. Absent when credentials were not
/// configured, in which case the guard refuses protected traffic per request.
#[derive(Clone)]
pub struct BackendClients {
    pub identity: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn DirectoryStore>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub backend: Option<BackendClients>,
    pub membership_limiter: Arc<FixedWindowLimiter>,
}

impl AppState {
    pub fn backend(&self) -> Result<&BackendClients, AppError> {
        self.backend.as_ref().ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("Backend credentials are not configured"))
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/healthz", get(handlers::health::health_check))
        .route("/login", get(handlers::pages::login_page))
        .route("/app", get(handlers::pages::app_home))
        .route("/app/onboarding/org", get(handlers::pages::onboarding_page))
        .route("/api/org/switch", post(handlers::org::switch_org))
        .route("/api/org/memberships", get(handlers::org::list_memberships))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::edge_guard_middleware,
        ))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
