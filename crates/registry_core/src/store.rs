use async_trait::async_trait;

use crate::contract::UserRecord;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record with the same address was already present; nothing was written.
    AlreadyExists,
}

/// Port onto the table holding user records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Number of records carrying a `username` attribute.
    async fn count_with_username(&self) -> Result<u64, StoreError>;

    /// Records whose `username` equals `username`. Implementations may leave
    /// `favorites` unread.
    async fn find_by_username(&self, username: &str) -> Result<Vec<UserRecord>, StoreError>;

    async fn get_user(&self, address: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Reads only the `username` attribute of the record at `address`.
    async fn get_username(&self, address: &str) -> Result<Option<String>, StoreError>;

    /// Writes `record` only if no record exists for its address.
    async fn create_user(&self, record: &UserRecord) -> Result<CreateOutcome, StoreError>;

    async fn update_username(&self, address: &str, username: &str) -> Result<(), StoreError>;
}
