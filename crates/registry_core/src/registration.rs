//! Registration workflow over a [`RecordStore`].
//!
//! `register_user` runs three independent checks before it writes: the
//! registered-user count against `max_users`, a scan for the requested
//! username, and a lookup of the caller's address. Nothing isolates those
//! reads from the final write, so two concurrent registrations can both pass
//! the capacity and uniqueness checks. Creation itself is conditional on the
//! address being absent, which keeps a racing create from replacing a record.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::contract::{RegistrationOutcome, UserRecord};
use crate::error::{RegistryError, StoreError};
use crate::settings::RegistrySettings;
use crate::store::{CreateOutcome, RecordStore};

const COMPONENT: &str = "registration";

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RecordStore>,
    settings: RegistrySettings,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn RecordStore>, settings: RegistrySettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub async fn count_registered_users(&self) -> Result<u64, RegistryError> {
        self.store.count_with_username().await.map_err(|source| {
            error!(
                component = COMPONENT,
                event = "count_failed",
                error = %source,
                "failed to count registered users"
            );
            RegistryError::CountFetch(source)
        })
    }

    pub async fn register_user(
        &self,
        username: &str,
        user_address: &str,
    ) -> Result<RegistrationOutcome, RegistryError> {
        if username.is_empty() {
            return Err(RegistryError::Validation(
                "username cannot be empty".to_string(),
            ));
        }
        if user_address.is_empty() {
            return Err(RegistryError::Validation(
                "userAddress cannot be empty".to_string(),
            ));
        }

        let registered = self.count_registered_users().await?;
        if registered >= self.settings.max_users {
            info!(
                component = COMPONENT,
                event = "user_limit_reached",
                registered,
                limit = self.settings.max_users,
                "rejecting registration"
            );
            return Err(RegistryError::UserLimitReached {
                limit: self.settings.max_users,
            });
        }

        let holders = self
            .store
            .find_by_username(username)
            .await
            .map_err(registration_failure("find_by_username", user_address))?;
        if !holders.is_empty() {
            info!(
                component = COMPONENT,
                event = "username_taken",
                user_address,
                "rejecting registration"
            );
            return Err(RegistryError::UsernameTaken(username.to_string()));
        }

        let existing = self
            .store
            .get_user(user_address)
            .await
            .map_err(registration_failure("get_user", user_address))?;
        if existing.is_some() {
            return self.update_username(username, user_address).await;
        }

        let record = UserRecord::new(
            user_address,
            username,
            self.settings.default_favorites.clone(),
        );
        let created = self
            .store
            .create_user(&record)
            .await
            .map_err(registration_failure("create_user", user_address))?;

        match created {
            CreateOutcome::Created => {
                info!(
                    component = COMPONENT,
                    event = "user_created",
                    user_address,
                    "registered new user"
                );
                Ok(RegistrationOutcome::Created)
            }
            CreateOutcome::AlreadyExists => {
                warn!(
                    component = COMPONENT,
                    event = "create_raced",
                    user_address,
                    "record appeared after lookup, updating instead"
                );
                self.update_username(username, user_address).await
            }
        }
    }

    pub async fn username_by_address(&self, address: &str) -> Result<String, RegistryError> {
        if address.is_empty() {
            return Err(RegistryError::NotFound(address.to_string()));
        }

        match self.store.get_username(address).await {
            Ok(Some(username)) if !username.is_empty() => Ok(username),
            Ok(_) => Err(RegistryError::NotFound(address.to_string())),
            Err(source) => {
                error!(
                    component = COMPONENT,
                    event = "lookup_failed",
                    address,
                    error = %source,
                    "failed to fetch username"
                );
                Err(RegistryError::Lookup(source))
            }
        }
    }

    async fn update_username(
        &self,
        username: &str,
        user_address: &str,
    ) -> Result<RegistrationOutcome, RegistryError> {
        self.store
            .update_username(user_address, username)
            .await
            .map_err(registration_failure("update_username", user_address))?;
        info!(
            component = COMPONENT,
            event = "user_updated",
            user_address,
            "updated username"
        );
        Ok(RegistrationOutcome::Updated)
    }
}

fn registration_failure<'a>(
    step: &'static str,
    user_address: &'a str,
) -> impl FnOnce(StoreError) -> RegistryError + 'a {
    move |source| {
        error!(
            component = COMPONENT,
            event = "registration_failed",
            step,
            user_address,
            error = %source,
            "store call failed during registration"
        );
        RegistryError::Registration(source)
    }
}
