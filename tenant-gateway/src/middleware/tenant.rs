//! Active-tenant cookie handling and per-request context types.
//!
//! The cookie names which organization the client is acting in. Its value is
//! attacker-controlled, so nothing trusts it before it parses as a UUID.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::models::{Principal, Role};
use guard_core::error::AppError;

pub const ACTIVE_ORG_COOKIE: &str = "active_org_id";

const ACTIVE_ORG_COOKIE_MAX_AGE: time::Duration = time::Duration::days(365);

/// Outcome of reading the active-tenant cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantCookie {
    Missing,
    /// Present but not a UUID. Never forwarded to a query.
    Malformed,
    Valid(Uuid),
}

pub fn resolve_tenant_cookie(jar: &CookieJar) -> TenantCookie {
    match jar.get(ACTIVE_ORG_COOKIE) {
        None => TenantCookie::Missing,
        Some(cookie) => match Uuid::parse_str(cookie.value()) {
            Ok(id) => TenantCookie::Valid(id),
            Err(_) => TenantCookie::Malformed,
        },
    }
}

pub fn active_org_cookie(org_id: Uuid, secure: bool) -> Cookie<'static> {
    Cookie::build((ACTIVE_ORG_COOKIE, org_id.to_string()))
        .path("/")
        .max_age(ACTIVE_ORG_COOKIE_MAX_AGE)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Expired variant of the cookie, used to delete it client-side.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((ACTIVE_ORG_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// Authenticated session, inserted into request extensions by the edge guard
/// for every guarded path with a live session.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    /// The caller's own token, forwarded on data-API queries so backend
    /// row-level policies apply to them.
    pub access_token: String,
}

/// Extractor for handlers that require a signed-in caller.
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthSession)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unauthorized")))
    }
}

/// Verified tenant context for the request, set by the edge guard after the
/// membership check passes.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub org_id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("No active organization")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn jar_with_cookie(value: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", ACTIVE_ORG_COOKIE, value)).unwrap(),
        );
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn missing_cookie_resolves_to_missing() {
        let jar = CookieJar::new();
        assert_eq!(resolve_tenant_cookie(&jar), TenantCookie::Missing);
    }

    #[test]
    fn valid_uuid_resolves_to_valid() {
        let id = Uuid::new_v4();
        let jar = jar_with_cookie(&id.to_string());
        assert_eq!(resolve_tenant_cookie(&jar), TenantCookie::Valid(id));
    }

    #[test]
    fn non_uuid_values_are_malformed() {
        for bad in [
            "not-a-uuid",
            "'; DROP TABLE org_members; --",
            "123",
            "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx",
        ] {
            let jar = jar_with_cookie(bad);
            assert_eq!(resolve_tenant_cookie(&jar), TenantCookie::Malformed, "{bad}");
        }
    }

    #[test]
    fn active_org_cookie_attributes() {
        let id = Uuid::new_v4();
        let cookie = active_org_cookie(id, true);
        assert_eq!(cookie.name(), ACTIVE_ORG_COOKIE);
        assert_eq!(cookie.value(), id.to_string());
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(365)));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie();
        assert_eq!(cookie.name(), ACTIVE_ORG_COOKIE);
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
