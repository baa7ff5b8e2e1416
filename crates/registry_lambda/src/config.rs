use std::collections::BTreeSet;
use std::fmt;

use registry_core::settings::{RegistrySettings, DEFAULT_MAX_USERS};
use thiserror::Error;

pub const DEFAULT_TABLE_NAME: &str = "republicofgamers";
pub const DEFAULT_PORT: u16 = 3000;
pub const LAMBDA_ENV_MARKER: &str = "AWS_LAMBDA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    /// Invoked by the Lambda runtime behind API Gateway.
    Lambda,
    /// Standalone HTTP server.
    Local,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub mode: RuntimeMode,
    pub port: u16,
    pub table_name: String,
    pub region: Option<String>,
    pub credentials: Option<StaticCredentials>,
    pub registry: RegistrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("REGISTRY_DEFAULT_FAVORITES must list at least one value")]
    EmptyFavorites,
    #[error("{present} is set but {missing} is not")]
    IncompleteCredentials {
        present: &'static str,
        missing: &'static str,
    },
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mode = if var("REGISTRY_ENV").as_deref() == Some(LAMBDA_ENV_MARKER)
            || var("AWS_LAMBDA_RUNTIME_API").is_some()
        {
            RuntimeMode::Lambda
        } else {
            RuntimeMode::Local
        };

        let port = match var("PORT") {
            Some(value) => parse_positive("PORT", &value)?,
            None => DEFAULT_PORT,
        };

        let max_users = match var("REGISTRY_MAX_USERS") {
            Some(value) => parse_positive("REGISTRY_MAX_USERS", &value)?,
            None => DEFAULT_MAX_USERS,
        };

        let mut registry = RegistrySettings {
            max_users,
            ..RegistrySettings::default()
        };
        if let Some(value) = var("REGISTRY_DEFAULT_FAVORITES") {
            let favorites: BTreeSet<String> = value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
            if favorites.is_empty() {
                return Err(ConfigError::EmptyFavorites);
            }
            registry.default_favorites = favorites;
        }

        let credentials = match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (Some(_), None) => {
                return Err(ConfigError::IncompleteCredentials {
                    present: "AWS_ACCESS_KEY_ID",
                    missing: "AWS_SECRET_ACCESS_KEY",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteCredentials {
                    present: "AWS_SECRET_ACCESS_KEY",
                    missing: "AWS_ACCESS_KEY_ID",
                });
            }
            (None, None) => None,
        };

        Ok(Self {
            mode,
            port,
            table_name: var("REGISTRY_TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            region: var("AWS_REGION"),
            credentials,
            registry,
        })
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        }),
    }
}
