use registry_core::contract::{
    messages, CountResponse, MessageResponse, RegisterRequest, UsernameResponse,
};
use registry_core::error::RegistryError;
use registry_core::RegistrationService;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const REGISTER_PATH: &str = "/register";
pub const COUNT_PATH: &str = "/fetch-username-count";
pub const USERNAME_BY_ADDRESS_PREFIX: &str = "/getUsernameByAddress/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

/// Transport-neutral request shared by the Lambda and local server paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            body,
        }
    }

    /// Reads an API Gateway REST (v1) or HTTP API (v2) proxy event.
    pub fn from_event(event: &Value) -> Result<Self, String> {
        let Some(object) = event.as_object() else {
            return Err("Request payload must be a JSON object".to_string());
        };

        let method = object
            .get("httpMethod")
            .and_then(Value::as_str)
            .or_else(|| {
                event
                    .pointer("/requestContext/http/method")
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| "Request is missing an HTTP method".to_string())?;

        let path = object
            .get("path")
            .or_else(|| object.get("rawPath"))
            .and_then(Value::as_str)
            .ok_or_else(|| "Request is missing a path".to_string())?;

        let encoded = object
            .get("isBase64Encoded")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let body = match object.get("body") {
            None | Some(Value::Null) => None,
            Some(Value::String(_)) if encoded => {
                return Err("Base64-encoded request bodies are not supported".to_string());
            }
            Some(Value::String(text)) => Some(text.clone()),
            Some(value @ Value::Object(_)) => Some(value.to_string()),
            Some(_) => return Err("Request body must be a JSON object".to_string()),
        };

        Ok(Self::new(method, path, body))
    }
}

pub async fn handle_api_event(event: Value, service: &RegistrationService) -> ApiGatewayResponse {
    match ApiRequest::from_event(&event) {
        Ok(request) => route_request(&request, service).await,
        Err(message) => validation_error_response(&message),
    }
}

pub async fn route_request(request: &ApiRequest, service: &RegistrationService) -> ApiGatewayResponse {
    let response = match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => preflight_response(),
        ("POST", REGISTER_PATH) => register(request.body.as_deref(), service).await,
        ("GET", COUNT_PATH) => fetch_username_count(service).await,
        ("GET", path) => match path.strip_prefix(USERNAME_BY_ADDRESS_PREFIX) {
            Some(address) => username_by_address(address, service).await,
            None => not_found_response(),
        },
        _ => not_found_response(),
    };

    info!(
        component = "api",
        event = "request_completed",
        method = %request.method,
        path = %request.path,
        status = response.status_code,
        "handled request"
    );
    response
}

async fn register(body: Option<&str>, service: &RegistrationService) -> ApiGatewayResponse {
    let request = match parse_register_request(body) {
        Ok(value) => value,
        Err(message) => {
            warn!(component = "api", event = "malformed_request", %message);
            return validation_error_response(&message);
        }
    };

    match service
        .register_user(&request.username, &request.user_address)
        .await
    {
        Ok(outcome) => json_response(200, MessageResponse::new(outcome.message())),
        Err(error) => registry_error_response(&error),
    }
}

async fn fetch_username_count(service: &RegistrationService) -> ApiGatewayResponse {
    match service.count_registered_users().await {
        Ok(count) => json_response(200, CountResponse { count }),
        Err(error) => registry_error_response(&error),
    }
}

async fn username_by_address(address: &str, service: &RegistrationService) -> ApiGatewayResponse {
    match service.username_by_address(address).await {
        Ok(username) => json_response(200, UsernameResponse { username }),
        Err(error) => registry_error_response(&error),
    }
}

fn parse_register_request(body: Option<&str>) -> Result<RegisterRequest, String> {
    let Some(text) = body else {
        return Err("Malformed request: missing body".to_string());
    };
    serde_json::from_str(text).map_err(|error| format!("Malformed request: {error}"))
}

/// 400 for a request whose body could not be read at all.
pub fn malformed_request_response(detail: &str) -> ApiGatewayResponse {
    warn!(component = "api", event = "malformed_request", detail);
    validation_error_response(&format!("Malformed request: {detail}"))
}

fn registry_error_response(error: &RegistryError) -> ApiGatewayResponse {
    json_response(error.status_code(), MessageResponse::new(error.user_message()))
}

fn validation_error_response(message: &str) -> ApiGatewayResponse {
    json_response(400, MessageResponse::new(message))
}

fn not_found_response() -> ApiGatewayResponse {
    json_response(404, MessageResponse::new(messages::NOT_FOUND))
}

fn preflight_response() -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code: 204,
        headers: response_headers(),
        body: String::new(),
    }
}

fn json_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: response_headers(),
        body: serde_json::to_string(&payload).expect("response payload should serialize"),
    }
}

fn response_headers() -> Value {
    json!({
        "Content-Type": "application/json",
        "Access-Control-Allow-Origin": "*",
        "Access-Control-Allow-Headers": "Content-Type",
        "Access-Control-Allow-Methods": "GET,POST,OPTIONS",
    })
}
