//! Local HTTP server.
//!
//! Every request falls through to [`route_request`], so the local server and
//! the Lambda handler answer from the same routing table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use registry_core::RegistrationService;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::api::{
    malformed_request_response, route_request, ApiGatewayResponse, ApiRequest,
};

pub fn router(service: Arc<RegistrationService>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(service: Arc<RegistrationService>, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        component = "server",
        event = "listening",
        addr = %addr,
        "Server is running on http://localhost:{port}"
    );
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn dispatch(
    State(service): State<Arc<RegistrationService>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let body = if body.is_empty() {
        None
    } else {
        match String::from_utf8(body.to_vec()) {
            Ok(text) => Some(text),
            Err(_) => {
                return into_http_response(malformed_request_response(
                    "body is not valid UTF-8",
                ))
            }
        }
    };
    let request = ApiRequest::new(method.as_str(), uri.path(), body);
    into_http_response(route_request(&request, &service).await)
}

fn into_http_response(response: ApiGatewayResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut http_response = (status, response.body).into_response();

    if let Value::Object(headers) = &response.headers {
        for (name, value) in headers {
            let Some(value) = value.as_str() else {
                continue;
            };
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                http_response.headers_mut().insert(name, value);
            }
        }
    }
    http_response
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(component = "server", event = "shutdown", "received ctrl-c");
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use registry_core::memory::InMemoryRecordStore;
    use registry_core::RegistrySettings;
    use tower::ServiceExt;

    use super::*;

    fn test_router() -> Router {
        let store = Arc::new(InMemoryRecordStore::new());
        router(Arc::new(RegistrationService::new(
            store,
            RegistrySettings::default(),
        )))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[tokio::test]
    async fn serves_registration_over_http() {
        let app = test_router();

        let response = app
            .clone()
            .oneshot(
                Request::post("/register")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"username":"alice","userAddress":"0xA"}"#))
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin"),
            Some(&HeaderValue::from_static("*"))
        );

        let response = app
            .oneshot(
                Request::get("/getUsernameByAddress/0xA")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"username": "alice"})
        );
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = test_router()
            .oneshot(
                Request::get("/nope")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "Not found"})
        );
    }

    #[tokio::test]
    async fn non_utf8_body_is_rejected_as_json() {
        let response = test_router()
            .oneshot(
                Request::post("/register")
                    .header("content-type", "application/json")
                    .body(Body::from(vec![0xff, 0xfe, 0xfd]))
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type"),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"message": "Malformed request: body is not valid UTF-8"})
        );
    }
}
