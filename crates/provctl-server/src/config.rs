//! Server configuration, read from a TOML file.

use std::path::Path;

use provctl_auth::AuthConfig;
use provctl_db::{DbConfig, StoreOptions};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Top-level server configuration. Every section is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    pub listen: String,
    /// Default tracing filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub store: StoreOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            log_filter: "provctl=info".into(),
            database: DbConfig::default(),
            auth: AuthConfig::default(),
            store: StoreOptions::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_toml(&content, &display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::from_toml("", "provctl.toml").unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.database.namespace, "provctl");
        assert_eq!(config.auth.access_token_lifetime_secs, 900);
        assert!(!config.store.exclusive_default);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            listen = "127.0.0.1:9000"
            log_filter = "provctl=debug"

            [database]
            url = "db.internal:8000"

            [auth]
            jwt_issuer = "provctl-prod"

            [store]
            exclusive_default = true
            "#,
            "provctl.toml",
        )
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.log_filter, "provctl=debug");
        assert_eq!(config.database.url, "db.internal:8000");
        assert_eq!(config.database.database, "main");
        assert_eq!(config.auth.jwt_issuer, "provctl-prod");
        assert!(config.store.exclusive_default);
    }

    #[test]
    fn parse_error_names_the_file() {
        let err = ServerConfig::from_toml("listen = [", "bad.toml").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse bad.toml"));
    }
}
