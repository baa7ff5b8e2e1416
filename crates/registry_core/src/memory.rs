//! In-memory [`RecordStore`] used by tests and local experiments.
//!
//! Records live in a `BTreeMap` keyed by address. Individual operations can be
//! made to fail so callers can exercise their error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::contract::UserRecord;
use crate::error::StoreError;
use crate::store::{CreateOutcome, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreOperation {
    Count,
    FindByUsername,
    GetUser,
    GetUsername,
    Create,
    Update,
}

impl StoreOperation {
    fn name(self) -> &'static str {
        match self {
            Self::Count => "scan_count",
            Self::FindByUsername => "scan_username",
            Self::GetUser => "get_item",
            Self::GetUsername => "get_item_projection",
            Self::Create => "put_item",
            Self::Update => "update_item",
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<String, UserRecord>>,
    failing: Mutex<BTreeSet<StoreOperation>>,
    writes: Mutex<usize>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let store = Self::new();
        store.seed(records);
        store
    }

    /// Inserts records directly, bypassing write accounting.
    pub fn seed(&self, records: impl IntoIterator<Item = UserRecord>) {
        let mut guard = lock(&self.records);
        for record in records {
            guard.insert(record.ethereum_address.clone(), record);
        }
    }

    /// Makes every later call to `operation` fail with a backend error.
    pub fn fail_on(&self, operation: StoreOperation) {
        lock(&self.failing).insert(operation);
    }

    pub fn recover(&self, operation: StoreOperation) {
        lock(&self.failing).remove(&operation);
    }

    pub fn records(&self) -> Vec<UserRecord> {
        lock(&self.records).values().cloned().collect()
    }

    pub fn record(&self, address: &str) -> Option<UserRecord> {
        lock(&self.records).get(address).cloned()
    }

    /// Number of successful create and update calls.
    pub fn write_count(&self) -> usize {
        *lock(&self.writes)
    }

    fn check(&self, operation: StoreOperation) -> Result<(), StoreError> {
        if lock(&self.failing).contains(&operation) {
            return Err(StoreError::backend(
                operation.name(),
                "injected store failure",
            ));
        }
        Ok(())
    }

    fn record_write(&self) {
        *lock(&self.writes) += 1;
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn count_with_username(&self) -> Result<u64, StoreError> {
        self.check(StoreOperation::Count)?;
        let count = lock(&self.records)
            .values()
            .filter(|record| record.has_username())
            .count();
        Ok(count as u64)
    }

    async fn find_by_username(&self, username: &str) -> Result<Vec<UserRecord>, StoreError> {
        self.check(StoreOperation::FindByUsername)?;
        Ok(lock(&self.records)
            .values()
            .filter(|record| record.username.as_deref() == Some(username))
            .cloned()
            .collect())
    }

    async fn get_user(&self, address: &str) -> Result<Option<UserRecord>, StoreError> {
        self.check(StoreOperation::GetUser)?;
        Ok(lock(&self.records).get(address).cloned())
    }

    async fn get_username(&self, address: &str) -> Result<Option<String>, StoreError> {
        self.check(StoreOperation::GetUsername)?;
        Ok(lock(&self.records)
            .get(address)
            .and_then(|record| record.username.clone()))
    }

    async fn create_user(&self, record: &UserRecord) -> Result<CreateOutcome, StoreError> {
        self.check(StoreOperation::Create)?;
        let mut records = lock(&self.records);
        if records.contains_key(&record.ethereum_address) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        records.insert(record.ethereum_address.clone(), record.clone());
        drop(records);
        self.record_write();
        Ok(CreateOutcome::Created)
    }

    async fn update_username(&self, address: &str, username: &str) -> Result<(), StoreError> {
        self.check(StoreOperation::Update)?;
        // Mirrors UpdateItem, which upserts a bare record when the key is absent.
        lock(&self.records)
            .entry(address.to_string())
            .or_insert_with(|| UserRecord {
                ethereum_address: address.to_string(),
                username: None,
                favorites: BTreeSet::new(),
            })
            .username = Some(username.to_string());
        self.record_write();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
