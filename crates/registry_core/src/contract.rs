use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const ADDRESS_ATTRIBUTE: &str = "ethereum_address";
pub const USERNAME_ATTRIBUTE: &str = "username";
pub const FAVORITES_ATTRIBUTE: &str = "favorites";

/// User-facing response messages.
pub mod messages {
    pub const USER_CREATED: &str = "User account created successfully";
    pub const USER_UPDATED: &str = "User account updated successfully";
    pub const USER_LIMIT_REACHED: &str = "User limit reached, cannot add more users.";
    pub const USERNAME_TAKEN: &str =
        "Username already exists. Please choose a different username.";
    pub const REGISTRATION_FAILED: &str = "Error registering user.";
    pub const COUNT_FETCH_FAILED: &str = "Error fetching usernames count.";
    pub const USERNAME_NOT_FOUND: &str = "Username not found";
    pub const LOOKUP_FAILED: &str = "Error fetching username.";
    pub const NOT_FOUND: &str = "Not found";
}

/// A row of the registry table, keyed by `ethereum_address`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub ethereum_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub favorites: BTreeSet<String>,
}

impl UserRecord {
    pub fn new(
        ethereum_address: impl Into<String>,
        username: impl Into<String>,
        favorites: BTreeSet<String>,
    ) -> Self {
        Self {
            ethereum_address: ethereum_address.into(),
            username: Some(username.into()),
            favorites,
        }
    }

    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(rename = "userAddress")]
    pub user_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    Updated,
}

impl RegistrationOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Created => messages::USER_CREATED,
            Self::Updated => messages::USER_UPDATED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsernameResponse {
    pub username: String,
}
