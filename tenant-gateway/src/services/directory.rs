//! Queries against the backend data API.
//!
//! Every request carries the caller's own access token, so the backend's
//! row-level policies remain a second enforcement layer: even a malformed
//! query here can never return another tenant's membership rows.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::models::{DefaultMembershipRow, MembershipListRow, MembershipRow, OrganizationRow};
use guard_core::error::AppError;

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Membership lookup for one (organization, user) pair.
    ///
    /// `Ok(None)` means no row, which is a benign outcome. `Err` means the
    /// query itself failed and must not be read as "not a member" anywhere
    /// except the guard's final fail-closed decision.
    async fn find_membership(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        session_token: &str,
    ) -> Result<Option<MembershipRow>, AppError>;

    /// The user's membership flagged as default, when exactly one exists.
    async fn find_default_membership(
        &self,
        user_id: Uuid,
        session_token: &str,
    ) -> Result<Option<DefaultMembershipRow>, AppError>;

    async fn find_organization(
        &self,
        org_id: Uuid,
        session_token: &str,
    ) -> Result<Option<OrganizationRow>, AppError>;

    async fn list_memberships(
        &self,
        user_id: Uuid,
        session_token: &str,
    ) -> Result<Vec<MembershipListRow>, AppError>;
}

pub struct HttpDirectoryStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDirectoryStore {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        session_token: &str,
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .http
            .get(format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(session_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BackendError(anyhow::anyhow!(
                "Data API returned {} for {}",
                status,
                table
            )));
        }

        // Shape mismatch is a query failure, never a silent empty result.
        response.json::<Vec<T>>().await.map_err(|e| {
            AppError::BackendError(anyhow::anyhow!(
                "Malformed rows from data API for {}: {}",
                table,
                e
            ))
        })
    }
}

#[async_trait]
impl DirectoryStore for HttpDirectoryStore {
    async fn find_membership(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        session_token: &str,
    ) -> Result<Option<MembershipRow>, AppError> {
        let rows: Vec<MembershipRow> = self
            .fetch_rows(
                "org_members",
                &[
                    ("select", "id,role".to_string()),
                    ("organization_id", format!("eq.{}", org_id)),
                    ("user_id", format!("eq.{}", user_id)),
                    ("limit", "1".to_string()),
                ],
                session_token,
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn find_default_membership(
        &self,
        user_id: Uuid,
        session_token: &str,
    ) -> Result<Option<DefaultMembershipRow>, AppError> {
        let rows: Vec<DefaultMembershipRow> = self
            .fetch_rows(
                "org_members",
                &[
                    ("select", "id,organization_id,role".to_string()),
                    ("user_id", format!("eq.{}", user_id)),
                    ("is_default", "eq.true".to_string()),
                ],
                session_token,
            )
            .await?;

        if rows.len() > 1 {
            tracing::warn!(
                user_id = %user_id,
                count = rows.len(),
                "Multiple default memberships flagged; refusing to auto-assign"
            );
            return Ok(None);
        }

        Ok(rows.into_iter().next())
    }

    async fn find_organization(
        &self,
        org_id: Uuid,
        session_token: &str,
    ) -> Result<Option<OrganizationRow>, AppError> {
        let rows: Vec<OrganizationRow> = self
            .fetch_rows(
                "organizations",
                &[
                    ("select", "id,name,created_at".to_string()),
                    ("id", format!("eq.{}", org_id)),
                    ("limit", "1".to_string()),
                ],
                session_token,
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn list_memberships(
        &self,
        user_id: Uuid,
        session_token: &str,
    ) -> Result<Vec<MembershipListRow>, AppError> {
        self.fetch_rows(
            "org_members",
            &[
                (
                    "select",
                    "organization_id,role,organizations(id,name)".to_string(),
                ),
                ("user_id", format!("eq.{}", user_id)),
            ],
            session_token,
        )
        .await
    }
}
