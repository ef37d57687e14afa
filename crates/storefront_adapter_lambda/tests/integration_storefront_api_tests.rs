use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use storefront_adapter_core::{handle_invocation, AdapterConfig, BoxError, SettlementResult};
use storefront_adapter_lambda::config::StorefrontConfig;
use storefront_adapter_lambda::handlers::api::{storefront_router, MessageResponse};
use storefront_adapter_lambda::routes::Router;

fn config() -> StorefrontConfig {
    StorefrontConfig {
        adapter: AdapterConfig::default(),
        ping_message: "pong".to_string(),
    }
}

async fn invoke(router: Router, event: Value) -> SettlementResult {
    handle_invocation(event, Arc::new(router), &AdapterConfig::default()).await
}

fn message(result: &SettlementResult) -> MessageResponse {
    serde_json::from_str(&result.body).expect("body should be a message response")
}

#[tokio::test]
async fn ping_uses_configured_message() {
    let result = invoke(
        storefront_router(&config()),
        json!({"httpMethod": "GET", "path": "/api/ping"}),
    )
    .await;

    assert_eq!(result.status_code, 200);
    assert_eq!(result.headers["content-type"], "application/json");
    assert_eq!(message(&result).message, "pong");
}

#[tokio::test]
async fn function_mount_path_reaches_api_routes() {
    let result = invoke(
        storefront_router(&config()),
        json!({
            "httpMethod": "GET",
            "rawUrl": "https://shop.example/.netlify/functions/api/demo?ref=nav"
        }),
    )
    .await;

    assert_eq!(result.status_code, 200);
    assert_eq!(message(&result).message, "Hello from the storefront API");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let result = invoke(
        storefront_router(&config()),
        json!({"httpMethod": "DELETE", "path": "/api/ping"}),
    )
    .await;

    assert_eq!(result, SettlementResult::not_found());
}

#[tokio::test]
async fn route_error_is_reported_as_500() {
    let router = Router::new().post("/api/import-products", |request, _response| async move {
        if request.body().get("url").is_none() {
            return Err::<(), BoxError>("missing url".into());
        }
        Ok(())
    });

    let result = invoke(
        router,
        json!({"httpMethod": "POST", "path": "/api/import-products", "body": "{}"}),
    )
    .await;

    assert_eq!(result.status_code, 500);
    let body: Value = serde_json::from_str(&result.body).expect("body should be json");
    assert_eq!(body["message"], json!("missing url"));
}

#[tokio::test(start_paused = true)]
async fn route_that_never_responds_times_out() {
    let router = Router::new().get("/api/slow", |_request, _response| async move {
        Ok::<(), BoxError>(())
    });

    let result = handle_invocation(
        json!({"path": "/api/slow"}),
        Arc::new(router),
        &AdapterConfig {
            timeout: Duration::from_millis(500),
        },
    )
    .await;

    assert_eq!(result, SettlementResult::timeout());
}

#[tokio::test]
async fn settlement_serializes_for_the_host() {
    let result = invoke(
        storefront_router(&config()),
        json!({"httpMethod": "GET", "path": "/api/ping"}),
    )
    .await;

    let value = serde_json::to_value(&result).expect("settlement should serialize");
    assert_eq!(
        value,
        json!({
            "statusCode": 200,
            "headers": {"content-type": "application/json"},
            "body": "{\"message\":\"pong\"}"
        })
    );
}
