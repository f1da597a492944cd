//! Minimal page surface behind the guard.
//!
//! The real product pages live in the web frontend; these endpoints exist so
//! the guard has a surface to protect and return useful context for it.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::middleware::{AuthSession, TenantContext};
use crate::AppState;
use guard_core::error::AppError;

/// GET /login: public.
pub async fn login_page() -> Json<Value> {
    Json(json!({ "page": "login" }))
}

/// GET /app: reachable only with a verified membership. Echoes the context
/// the guard resolved for the request.
pub async fn app_home(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    tenant: TenantContext,
) -> Result<Json<Value>, AppError> {
    let backend = state.backend()?;
    let organization = backend
        .directory
        .find_organization(tenant.org_id, &session.access_token)
        .await?;

    Ok(Json(json!({
        "user": {
            "id": session.principal.id,
            "email": session.principal.email,
        },
        "organization": {
            "id": tenant.org_id,
            "role": tenant.role,
            "name": organization.map(|org| org.name),
        },
    })))
}

/// GET /app/onboarding/org: authenticated, but exempt from the membership
/// check so users without an organization can land here.
pub async fn onboarding_page(AuthSession(session): AuthSession) -> Json<Value> {
    Json(json!({
        "page": "onboarding",
        "user": { "id": session.principal.id },
    }))
}
