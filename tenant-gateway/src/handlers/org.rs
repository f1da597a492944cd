//! Organization context endpoints: switching the active organization and
//! listing the caller's memberships for the switcher UI.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::tenant::active_org_cookie;
use crate::middleware::AuthSession;
use crate::models::Role;
use crate::AppState;
use guard_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SwitchOrgRequest {
    pub org_id: Option<String>,
}

/// Switch the caller's active organization.
///
/// POST /api/org/switch
///
/// Verifies membership before touching the cookie, so a client can never
/// point its own context at an organization it does not belong to.
pub async fn switch_org(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    jar: CookieJar,
    Json(req): Json<SwitchOrgRequest>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let org_id = req
        .org_id
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Organization ID is required")))?;

    let org_id = Uuid::parse_str(org_id)
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid organization ID")))?;

    let backend = state.backend()?;
    let user_id = session.principal.id;

    let decision = state.membership_limiter.check(&user_id.to_string());
    if !decision.allowed {
        return Err(AppError::TooManyRequests(
            "Too many requests. Please try again later.".to_string(),
            None,
        ));
    }

    let membership = backend
        .directory
        .find_membership(org_id, user_id, &session.access_token)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, user_id = %user_id, org_id = %org_id, "Membership query failed during switch");
            err
        })?;

    if membership.is_none() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not a member of this organization"
        )));
    }

    tracing::info!(user_id = %user_id, org_id = %org_id, "Active organization switched");

    let jar = jar.add(active_org_cookie(org_id, state.config.secure_cookies()));
    Ok((jar, Json(json!({ "success": true }))))
}

#[derive(Debug, Serialize)]
pub struct MembershipSummary {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

/// List the caller's organizations with their role in each.
///
/// GET /api/org/memberships
pub async fn list_memberships(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<MembershipSummary>>, AppError> {
    let backend = state.backend()?;

    let rows = backend
        .directory
        .list_memberships(session.principal.id, &session.access_token)
        .await?;

    let memberships = rows
        .into_iter()
        .map(|row| MembershipSummary {
            id: row.organization_id,
            name: row
                .organizations
                .map(|org| org.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            role: row.role,
        })
        .collect();

    Ok(Json(memberships))
}
