//! Domain primitives for the user registry.
//!
//! This crate owns the user record model, request/response contracts and the
//! registration workflow. It intentionally excludes AWS SDK and Lambda runtime
//! concerns; storage is reached through the [`store::RecordStore`] port.

pub mod contract;
pub mod error;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod registration;
pub mod settings;
pub mod store;

pub use contract::{RegisterRequest, RegistrationOutcome, UserRecord};
pub use error::{RegistryError, StoreError};
pub use registration::RegistrationService;
pub use settings::RegistrySettings;
pub use store::{CreateOutcome, RecordStore};
