use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use storefront_adapter_core::{handle_invocation, SettlementResult};
use storefront_adapter_lambda::config::StorefrontConfig;
use storefront_adapter_lambda::handlers::api::storefront_router;
use storefront_adapter_lambda::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = StorefrontConfig::from_env()?;
    tracing::info!(
        component = "storefront_api",
        event = "cold_start",
        timeout_ms = config.adapter.timeout_ms(),
    );

    let adapter = config.adapter;
    let chain = Arc::new(storefront_router(&config));
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let chain = Arc::clone(&chain);
        async move {
            let result: SettlementResult = handle_invocation(event.payload, chain, &adapter).await;
            Ok::<_, Error>(result)
        }
    }))
    .await
}
