use guard_core::config as core_config;
use guard_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub backend: BackendConfig,
    /// Name of the cookie carrying the identity provider's access token.
    pub session_cookie: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

/// Credentials for the hosted backend (auth + data API).
///
/// Both values are optional at boot: a deploy with missing credentials still
/// serves health checks, and the guard refuses protected traffic with a 500
/// on each request instead of crash-looping.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

impl BackendConfig {
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.url, &self.anon_key) {
            (Some(url), Some(key)) => Some((url.clone(), key.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub membership_attempts: u32,
    pub membership_window_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = GatewayConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("tenant-gateway"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            backend: BackendConfig {
                url: non_empty_env("BACKEND_URL"),
                anon_key: non_empty_env("BACKEND_ANON_KEY"),
            },
            session_cookie: get_env("SESSION_COOKIE_NAME", Some("sb-access-token"), is_prod)?,
            allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit: RateLimitConfig {
                membership_attempts: parse_env("RATE_LIMIT_MEMBERSHIP_ATTEMPTS", 10)?,
                membership_window_seconds: parse_env("RATE_LIMIT_MEMBERSHIP_WINDOW_SECONDS", 60)?,
                sweep_interval_seconds: parse_env("RATE_LIMIT_SWEEP_INTERVAL_SECONDS", 60)?,
            },
        };

        Ok(config)
    }

    /// Secure cookies everywhere except local dev over plain HTTP.
    pub fn secure_cookies(&self) -> bool {
        self.environment == Environment::Prod
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} is not a valid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
