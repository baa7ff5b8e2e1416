use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use registry_core::RegistrationService;
use registry_lambda::adapters::record_store::DynamoRecordStore;
use registry_lambda::config::{RuntimeConfig, RuntimeMode};
use registry_lambda::handlers::api::{handle_api_event, ApiGatewayResponse};
use registry_lambda::{logging, server};
use serde_json::Value;
use tracing::info;

async fn handle_request(
    event: LambdaEvent<Value>,
    service: Arc<RegistrationService>,
) -> Result<ApiGatewayResponse, Error> {
    Ok(handle_api_event(event.payload, &service).await)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = RuntimeConfig::from_env()?;
    logging::init(config.mode);

    let store = DynamoRecordStore::from_runtime_config(&config).await;
    let table = store.table_name().to_string();
    let service = Arc::new(RegistrationService::new(
        Arc::new(store),
        config.registry.clone(),
    ));
    info!(
        component = "runtime",
        event = "started",
        mode = ?config.mode,
        table = %table,
        max_users = service.settings().max_users,
        "registry runtime initialised"
    );

    match config.mode {
        RuntimeMode::Lambda => {
            lambda_runtime::run(service_fn(move |event| {
                handle_request(event, Arc::clone(&service))
            }))
            .await
        }
        RuntimeMode::Local => server::serve(service, config.port)
            .await
            .map_err(Error::from),
    }
}
