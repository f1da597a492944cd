//! Edge guard: the per-request access-control chain.
//!
//! Order is fixed: configuration, session, path class, tenant cookie, rate
//! limit, membership. Every outcome is terminal for the request; nothing is
//! retried, and every failure converts into a redirect or an error body
//! before it can escape this layer.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::middleware::tenant::{
    active_org_cookie, removal_cookie, resolve_tenant_cookie, Session, TenantContext,
    TenantCookie,
};
use crate::AppState;
use guard_core::error::AppError;

pub const PROTECTED_PREFIX: &str = "/app";
pub const ONBOARDING_PREFIX: &str = "/app/onboarding";
pub const ONBOARDING_PATH: &str = "/app/onboarding/org";
pub const LOGIN_PATH: &str = "/login";

const ASSET_EXTENSIONS: &[&str] = &[
    ".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp", ".ico", ".css", ".js",
];

/// Static assets and liveness probes skip the guard entirely.
fn bypasses_guard(path: &str) -> bool {
    path == "/healthz"
        || path.starts_with("/assets/")
        || ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn redirect(location: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Redirect to login, preserving the original path so the client can return.
fn login_redirect(original_path: &str) -> Response {
    let query = serde_urlencoded::to_string([("redirect", original_path)]).unwrap_or_default();
    redirect(&format!("{}?{}", LOGIN_PATH, query))
}

fn append_cookie(response: &mut Response, cookie: Cookie<'static>) {
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

fn onboarding_redirect(clear_cookie: bool) -> Response {
    let mut response = redirect(ONBOARDING_PATH);
    if clear_cookie {
        append_cookie(&mut response, removal_cookie());
    }
    response
}

pub async fn edge_guard_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if bypasses_guard(&path) {
        return next.run(request).await;
    }

    let Some(backend) = state.backend.clone() else {
        tracing::error!(path = %path, "Backend credentials missing; refusing request");
        return AppError::ConfigError(anyhow::anyhow!("Backend credentials are not configured"))
            .into_response();
    };

    // Session lookup runs for every guarded path so expired sessions surface
    // before any tenant decision.
    let session = match jar.get(state.config.session_cookie.as_str()) {
        None => None,
        Some(cookie) => {
            let token = cookie.value().to_string();
            match backend.identity.current_principal(&token).await {
                Ok(Some(principal)) => Some(Session {
                    principal,
                    access_token: token,
                }),
                Ok(None) => None,
                Err(err) => {
                    tracing::error!(error = %err, path = %path, "Identity lookup failed");
                    return err.into_response();
                }
            }
        }
    };

    if let Some(session) = &session {
        request.extensions_mut().insert(session.clone());
    }

    if !path.starts_with(PROTECTED_PREFIX) {
        return next.run(request).await;
    }

    let Some(session) = session else {
        tracing::debug!(path = %path, "Unauthenticated request to protected path");
        return login_redirect(&path);
    };

    // Onboarding must stay reachable without a tenant, or the redirect below
    // would loop. The session check above still applies to it.
    if path.starts_with(ONBOARDING_PREFIX) {
        return next.run(request).await;
    }

    let user_id = session.principal.id;

    let (named_org, had_malformed_cookie) = match resolve_tenant_cookie(&jar) {
        TenantCookie::Valid(org_id) => (Some(org_id), false),
        TenantCookie::Missing => (None, false),
        TenantCookie::Malformed => {
            tracing::warn!(user_id = %user_id, "Malformed active-tenant cookie; clearing it");
            (None, true)
        }
    };

    let Some(org_id) = named_org else {
        return assign_default_or_onboard(&state, &backend, &session, request, next, had_malformed_cookie)
            .await;
    };

    let decision = state.membership_limiter.check(&user_id.to_string());
    if !decision.allowed {
        tracing::warn!(user_id = %user_id, "Membership check quota exceeded");
        return AppError::TooManyRequests(
            "Too many requests. Please try again later.".to_string(),
            None,
        )
        .into_response();
    }

    match backend
        .directory
        .find_membership(org_id, user_id, &session.access_token)
        .await
    {
        Ok(Some(membership)) => {
            request.extensions_mut().insert(TenantContext {
                org_id,
                role: membership.role,
            });
            next.run(request).await
        }
        Ok(None) => {
            tracing::info!(
                user_id = %user_id,
                org_id = %org_id,
                "Cookie names an organization the user is not a member of"
            );
            onboarding_redirect(true)
        }
        Err(err) => {
            // A failed query is logged as a potential backend incident but
            // the decision still fails closed.
            tracing::error!(
                error = %err,
                user_id = %user_id,
                org_id = %org_id,
                "Membership query failed; treating as not a member"
            );
            onboarding_redirect(true)
        }
    }
}

/// No tenant named: assign the single default membership when one exists,
/// otherwise route the user into onboarding.
async fn assign_default_or_onboard(
    state: &AppState,
    backend: &crate::BackendClients,
    session: &Session,
    mut request: Request,
    next: Next,
    clear_stale_cookie: bool,
) -> Response {
    match backend
        .directory
        .find_default_membership(session.principal.id, &session.access_token)
        .await
    {
        Ok(Some(default)) => {
            tracing::info!(
                user_id = %session.principal.id,
                org_id = %default.organization_id,
                "Auto-assigning default organization"
            );
            request.extensions_mut().insert(TenantContext {
                org_id: default.organization_id,
                role: default.role,
            });
            let mut response = next.run(request).await;
            append_cookie(
                &mut response,
                active_org_cookie(default.organization_id, state.config.secure_cookies()),
            );
            response
        }
        Ok(None) => onboarding_redirect(clear_stale_cookie),
        Err(err) => {
            tracing::error!(
                error = %err,
                user_id = %session.principal.id,
                "Default-membership query failed; routing to onboarding"
            );
            onboarding_redirect(clear_stale_cookie)
        }
    }
}
