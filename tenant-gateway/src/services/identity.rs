use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::Principal;
use guard_core::error::AppError;

/// Session lookup against the hosted identity provider.
///
/// "No session" is a normal outcome and comes back as `Ok(None)`. Transport
/// and payload failures are `Err` so the guard answers 500 instead of
/// treating the caller as signed out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self, session_token: &str)
        -> Result<Option<Principal>, AppError>;
}

pub struct HttpIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_principal(
        &self,
        session_token: &str,
    ) -> Result<Option<Principal>, AppError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(session_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let principal = response.json::<Principal>().await.map_err(|e| {
                    AppError::BackendError(anyhow::anyhow!(
                        "Malformed user payload from identity provider: {}",
                        e
                    ))
                })?;
                Ok(Some(principal))
            }
            // Expired or bogus token: not an error, just no session.
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(AppError::BackendError(anyhow::anyhow!(
                "Identity provider returned {}",
                status
            ))),
        }
    }
}
