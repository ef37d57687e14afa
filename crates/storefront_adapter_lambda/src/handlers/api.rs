use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_adapter_core::{BoxError, CanonicalRequest, ResponseEmulator};

use crate::config::StorefrontConfig;
use crate::routes::Router;

pub const FUNCTION_MOUNT_PATH: &str = "/.netlify/functions/api";
pub const API_PREFIX: &str = "/api";
pub const DEMO_MESSAGE: &str = "Hello from the storefront API";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

/// Route table served behind the invocation adapter.
pub fn storefront_router(config: &StorefrontConfig) -> Router {
    let ping_message = config.ping_message.clone();
    Router::new()
        .with_mount_alias(FUNCTION_MOUNT_PATH, API_PREFIX)
        .get("/api/ping", move |_request, response| {
            let message = ping_message.clone();
            ping(response, message)
        })
        .get("/api/demo", demo)
}

async fn ping(response: ResponseEmulator, message: String) -> Result<(), BoxError> {
    response.send_json(&MessageResponse { message });
    Ok(())
}

async fn demo(_: Arc<CanonicalRequest>, response: ResponseEmulator) -> Result<(), BoxError> {
    let payload = MessageResponse {
        message: DEMO_MESSAGE.to_string(),
    };
    response.set_status(200).send_json(&payload);
    Ok(())
}
