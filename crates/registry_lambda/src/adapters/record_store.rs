use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use aws_sdk_dynamodb::Client;
use registry_core::contract::{
    UserRecord, ADDRESS_ATTRIBUTE, FAVORITES_ATTRIBUTE, USERNAME_ATTRIBUTE,
};
use registry_core::error::StoreError;
use registry_core::store::{CreateOutcome, RecordStore};

use crate::config::RuntimeConfig;

type Item = HashMap<String, AttributeValue>;

/// [`RecordStore`] backed by a single DynamoDB table keyed by `ethereum_address`.
#[derive(Debug, Clone)]
pub struct DynamoRecordStore {
    client: Client,
    table_name: String,
}

impl DynamoRecordStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Loads the shared SDK configuration once and builds the client from it.
    pub async fn from_runtime_config(config: &RuntimeConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
                None,
                None,
                "registry-environment",
            ));
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.table_name.clone())
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn address_key(address: &str) -> AttributeValue {
        AttributeValue::S(address.to_string())
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn count_with_username(&self) -> Result<u64, StoreError> {
        let mut pages = self
            .client
            .scan()
            .table_name(&self.table_name)
            .select(Select::Count)
            .filter_expression("attribute_exists(#username)")
            .expression_attribute_names("#username", USERNAME_ATTRIBUTE)
            .into_paginator()
            .send();

        let mut total = 0u64;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|error| backend_error("scan_count", error))?;
            total += u64::try_from(page.count()).unwrap_or_default();
        }
        Ok(total)
    }

    async fn find_by_username(&self, username: &str) -> Result<Vec<UserRecord>, StoreError> {
        let mut pages = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("#username = :username")
            .projection_expression("#address, #username")
            .expression_attribute_names("#address", ADDRESS_ATTRIBUTE)
            .expression_attribute_names("#username", USERNAME_ATTRIBUTE)
            .expression_attribute_values(":username", AttributeValue::S(username.to_string()))
            .into_paginator()
            .send();

        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|error| backend_error("scan_username", error))?;
            for item in page.items() {
                records.push(decode_user(item)?);
            }
        }
        Ok(records)
    }

    async fn get_user(&self, address: &str) -> Result<Option<UserRecord>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ADDRESS_ATTRIBUTE, Self::address_key(address))
            .send()
            .await
            .map_err(|error| backend_error("get_item", error))?;

        output.item().map(decode_user).transpose()
    }

    async fn get_username(&self, address: &str) -> Result<Option<String>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ADDRESS_ATTRIBUTE, Self::address_key(address))
            .projection_expression("#username")
            .expression_attribute_names("#username", USERNAME_ATTRIBUTE)
            .send()
            .await
            .map_err(|error| backend_error("get_item_projection", error))?;

        Ok(output
            .item()
            .and_then(|item| item.get(USERNAME_ATTRIBUTE))
            .and_then(|value| value.as_s().ok())
            .cloned())
    }

    async fn create_user(&self, record: &UserRecord) -> Result<CreateOutcome, StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(encode_user(record)))
            .condition_expression("attribute_not_exists(#address)")
            .expression_attribute_names("#address", ADDRESS_ATTRIBUTE)
            .send()
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(|service| service.is_conditional_check_failed_exception()) =>
            {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(error) => Err(backend_error("put_item", error)),
        }
    }

    async fn update_username(&self, address: &str, username: &str) -> Result<(), StoreError> {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(ADDRESS_ATTRIBUTE, Self::address_key(address))
            .update_expression("SET #username = :username")
            .expression_attribute_names("#username", USERNAME_ATTRIBUTE)
            .expression_attribute_values(":username", AttributeValue::S(username.to_string()))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| backend_error("update_item", error))
    }
}

fn backend_error(operation: &'static str, error: impl std::error::Error + 'static) -> StoreError {
    StoreError::backend(operation, DisplayErrorContext(error))
}

pub fn encode_user(record: &UserRecord) -> Item {
    let mut item = HashMap::from([(
        ADDRESS_ATTRIBUTE.to_string(),
        AttributeValue::S(record.ethereum_address.clone()),
    )]);
    if let Some(username) = &record.username {
        item.insert(
            USERNAME_ATTRIBUTE.to_string(),
            AttributeValue::S(username.clone()),
        );
    }
    // DynamoDB rejects empty string sets.
    if !record.favorites.is_empty() {
        item.insert(
            FAVORITES_ATTRIBUTE.to_string(),
            AttributeValue::Ss(record.favorites.iter().cloned().collect()),
        );
    }
    item
}

pub fn decode_user(item: &Item) -> Result<UserRecord, StoreError> {
    let ethereum_address = match item.get(ADDRESS_ATTRIBUTE) {
        Some(AttributeValue::S(address)) => address.clone(),
        Some(_) => {
            return Err(StoreError::malformed(
                "<unknown>",
                format!("{ADDRESS_ATTRIBUTE} is not a string"),
            ))
        }
        None => {
            return Err(StoreError::malformed(
                "<unknown>",
                format!("{ADDRESS_ATTRIBUTE} is missing"),
            ))
        }
    };

    let username = match item.get(USERNAME_ATTRIBUTE) {
        None | Some(AttributeValue::Null(_)) => None,
        Some(AttributeValue::S(username)) => Some(username.clone()),
        Some(_) => {
            return Err(StoreError::malformed(
                ethereum_address,
                format!("{USERNAME_ATTRIBUTE} is not a string"),
            ))
        }
    };

    let favorites = match item.get(FAVORITES_ATTRIBUTE) {
        None | Some(AttributeValue::Null(_)) => BTreeSet::new(),
        Some(AttributeValue::Ss(values)) => values.iter().cloned().collect(),
        Some(_) => {
            return Err(StoreError::malformed(
                ethereum_address,
                format!("{FAVORITES_ATTRIBUTE} is not a string set"),
            ))
        }
    };

    Ok(UserRecord {
        ethereum_address,
        username,
        favorites,
    })
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::operation::put_item::{PutItemError, PutItemOutput};
    use aws_sdk_dynamodb::operation::scan::{ScanError, ScanOutput};
    use aws_sdk_dynamodb::types::error::{
        ConditionalCheckFailedException, ResourceNotFoundException,
    };
    use aws_smithy_mocks::{mock, mock_client, RuleMode};

    use super::*;

    const TABLE: &str = "players";

    fn address_item(address: &str, username: &str) -> Item {
        HashMap::from([
            (
                ADDRESS_ATTRIBUTE.to_string(),
                AttributeValue::S(address.to_string()),
            ),
            (
                USERNAME_ATTRIBUTE.to_string(),
                AttributeValue::S(username.to_string()),
            ),
        ])
    }

    fn default_record() -> UserRecord {
        UserRecord::new(
            "0xA",
            "alice",
            BTreeSet::from([
                "s3comp.zip".to_string(),
                "sf2.zip".to_string(),
                "tf4.zip".to_string(),
            ]),
        )
    }

    #[test]
    fn encodes_favorites_as_string_set() {
        let item = encode_user(&default_record());

        assert_eq!(
            item.get(ADDRESS_ATTRIBUTE),
            Some(&AttributeValue::S("0xA".to_string()))
        );
        assert_eq!(
            item.get(USERNAME_ATTRIBUTE),
            Some(&AttributeValue::S("alice".to_string()))
        );
        let Some(AttributeValue::Ss(favorites)) = item.get(FAVORITES_ATTRIBUTE) else {
            panic!("favorites should be a string set");
        };
        assert_eq!(favorites.len(), 3);
    }

    #[test]
    fn omits_empty_favorites() {
        let record = UserRecord::new("0xA", "alice", BTreeSet::new());
        let item = encode_user(&record);

        assert!(!item.contains_key(FAVORITES_ATTRIBUTE));
    }

    #[test]
    fn decodes_stored_item() {
        let item = encode_user(&default_record());

        let decoded = decode_user(&item).expect("item should decode");
        assert_eq!(decoded, default_record());
    }

    #[test]
    fn decodes_record_without_username() {
        let item = HashMap::from([(
            ADDRESS_ATTRIBUTE.to_string(),
            AttributeValue::S("0xB".to_string()),
        )]);

        let decoded = decode_user(&item).expect("item should decode");
        assert_eq!(decoded.username, None);
        assert!(decoded.favorites.is_empty());
    }

    #[test]
    fn rejects_item_without_address() {
        let item = HashMap::from([(
            USERNAME_ATTRIBUTE.to_string(),
            AttributeValue::S("alice".to_string()),
        )]);

        let error = decode_user(&item).expect_err("item should fail");
        assert!(matches!(error, StoreError::Malformed { .. }));
    }

    #[test]
    fn rejects_numeric_username() {
        let item = HashMap::from([
            (
                ADDRESS_ATTRIBUTE.to_string(),
                AttributeValue::S("0xA".to_string()),
            ),
            (
                USERNAME_ATTRIBUTE.to_string(),
                AttributeValue::N("42".to_string()),
            ),
        ]);

        let error = decode_user(&item).expect_err("item should fail");
        assert_eq!(
            error,
            StoreError::malformed("0xA", "username is not a string")
        );
    }

    #[tokio::test]
    async fn count_sums_every_scan_page() {
        let first_page = mock!(Client::scan)
            .match_requests(|input| {
                input.table_name() == Some(TABLE)
                    && input.select() == Some(&Select::Count)
                    && input.exclusive_start_key().is_none()
            })
            .then_output(|| {
                ScanOutput::builder()
                    .count(3)
                    .last_evaluated_key(ADDRESS_ATTRIBUTE, AttributeValue::S("0x3".to_string()))
                    .build()
            });
        let second_page = mock!(Client::scan)
            .match_requests(|input| input.exclusive_start_key().is_some())
            .then_output(|| ScanOutput::builder().count(2).build());
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::MatchAny, [&first_page, &second_page]);

        let store = DynamoRecordStore::new(client, TABLE);

        assert_eq!(store.count_with_username().await, Ok(5));
        assert_eq!(first_page.num_calls(), 1);
        assert_eq!(second_page.num_calls(), 1);
    }

    #[tokio::test]
    async fn username_scan_projects_keys_and_follows_pages() {
        let first_page = mock!(Client::scan)
            .match_requests(|input| {
                input.projection_expression() == Some("#address, #username")
                    && input.exclusive_start_key().is_none()
            })
            .then_output(|| {
                ScanOutput::builder()
                    .items(address_item("0xA", "alice"))
                    .last_evaluated_key(ADDRESS_ATTRIBUTE, AttributeValue::S("0xA".to_string()))
                    .build()
            });
        let second_page = mock!(Client::scan)
            .match_requests(|input| {
                input.projection_expression() == Some("#address, #username")
                    && input.exclusive_start_key().is_some()
            })
            .then_output(|| {
                ScanOutput::builder()
                    .items(address_item("0xB", "alice"))
                    .build()
            });
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::MatchAny, [&first_page, &second_page]);

        let holders = DynamoRecordStore::new(client, TABLE)
            .find_by_username("alice")
            .await
            .expect("scan should succeed");

        let addresses: Vec<_> = holders
            .iter()
            .map(|record| record.ethereum_address.as_str())
            .collect();
        assert_eq!(addresses, ["0xA", "0xB"]);
        assert!(holders.iter().all(|record| record.favorites.is_empty()));
    }

    #[tokio::test]
    async fn conditional_check_failure_reports_existing_record() {
        let rejected = mock!(Client::put_item)
            .match_requests(|input| {
                input.condition_expression() == Some("attribute_not_exists(#address)")
            })
            .then_error(|| {
                PutItemError::ConditionalCheckFailedException(
                    ConditionalCheckFailedException::builder()
                        .message("The conditional request failed")
                        .build(),
                )
            });
        let client = mock_client!(aws_sdk_dynamodb, [&rejected]);

        let outcome = DynamoRecordStore::new(client, TABLE)
            .create_user(&default_record())
            .await;

        assert_eq!(outcome, Ok(CreateOutcome::AlreadyExists));
    }

    #[tokio::test]
    async fn successful_put_reports_created() {
        let accepted = mock!(Client::put_item)
            .match_requests(|input| {
                input.item().and_then(|item| item.get(ADDRESS_ATTRIBUTE))
                    == Some(&AttributeValue::S("0xA".to_string()))
            })
            .then_output(|| PutItemOutput::builder().build());
        let client = mock_client!(aws_sdk_dynamodb, [&accepted]);

        let outcome = DynamoRecordStore::new(client, TABLE)
            .create_user(&default_record())
            .await;

        assert_eq!(outcome, Ok(CreateOutcome::Created));
    }

    #[tokio::test]
    async fn scan_failure_is_a_backend_error() {
        let missing_table = mock!(Client::scan).then_error(|| {
            ScanError::ResourceNotFoundException(
                ResourceNotFoundException::builder()
                    .message("Requested resource not found")
                    .build(),
            )
        });
        let client = mock_client!(aws_sdk_dynamodb, [&missing_table]);

        let error = DynamoRecordStore::new(client, TABLE)
            .count_with_username()
            .await
            .expect_err("count should fail");

        assert!(matches!(
            error,
            StoreError::Backend {
                operation: "scan_count",
                ..
            }
        ));
    }
}
