use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::net::SocketAddr;

/// Listener settings shared by every binary in the workspace.
/// Service-specific settings live in the service's own config module.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("gateway").required(false))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Socket address to bind the listener to.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid bind address {}:{}: {}",
                self.host,
                self.port,
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_combines_host_and_port() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9000,
        };
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(config.bind_addr().unwrap(), addr);
    }

    #[test]
    fn bind_addr_rejects_an_unparseable_host() {
        let config = Config {
            host: "not a host".to_string(),
            port: 8080,
        };
        assert!(config.bind_addr().is_err());
    }
}
