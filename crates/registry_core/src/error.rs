use std::fmt::Display;

use thiserror::Error;

use crate::contract::messages;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
    #[error("malformed item for key '{key}': {reason}")]
    Malformed { key: String, reason: String },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Display) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }

    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("user limit of {limit} reached")]
    UserLimitReached { limit: u64 },
    #[error("username '{0}' is already registered")]
    UsernameTaken(String),
    #[error("failed to register user: {0}")]
    Registration(StoreError),
    #[error("failed to fetch registered user count: {0}")]
    CountFetch(StoreError),
    #[error("no username registered for address '{0}'")]
    NotFound(String),
    #[error("failed to look up username: {0}")]
    Lookup(StoreError),
    #[error("{0}")]
    Validation(String),
}

impl RegistryError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UserLimitReached { .. } | Self::UsernameTaken(_) | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Registration(_) | Self::CountFetch(_) | Self::Lookup(_) => 500,
        }
    }

    /// Message safe to return to callers; never carries store detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::UserLimitReached { .. } => messages::USER_LIMIT_REACHED.to_string(),
            Self::UsernameTaken(_) => messages::USERNAME_TAKEN.to_string(),
            Self::Registration(_) => messages::REGISTRATION_FAILED.to_string(),
            Self::CountFetch(_) => messages::COUNT_FETCH_FAILED.to_string(),
            Self::NotFound(_) => messages::USERNAME_NOT_FOUND.to_string(),
            Self::Lookup(_) => messages::LOOKUP_FAILED.to_string(),
            Self::Validation(message) => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_failures_map_to_500_without_leaking_detail() {
        let error = RegistryError::Registration(StoreError::backend(
            "put_item",
            "ProvisionedThroughputExceededException",
        ));

        assert_eq!(error.status_code(), 500);
        assert_eq!(error.user_message(), "Error registering user.");
        assert!(error.to_string().contains("ProvisionedThroughputExceededException"));
    }

    #[test]
    fn validation_failures_map_to_400() {
        assert_eq!(RegistryError::UserLimitReached { limit: 500 }.status_code(), 400);
        assert_eq!(
            RegistryError::UsernameTaken("alice".to_string()).status_code(),
            400
        );
        assert_eq!(
            RegistryError::NotFound("0xC".to_string()).status_code(),
            404
        );
    }
}
