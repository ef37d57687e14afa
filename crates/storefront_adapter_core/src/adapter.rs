use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinError;

use crate::arbiter::{CompletionArbiter, SettlementSource};
use crate::chain::{ErrorContinuation, MiddlewareChain};
use crate::contract::{InvocationEvent, SettlementResult};
use crate::error::AdapterError;
use crate::normalize::normalize_event;
use crate::response::ResponseEmulator;

pub const DEFAULT_TIMEOUT_MS: u64 = 25_000;
pub const TIMEOUT_ENV_VAR: &str = "ADAPTER_TIMEOUT_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Ceiling after which an unsettled invocation answers 504. Kept below
    /// the host's own execution limit.
    pub timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_timeout_ms(std::env::var(TIMEOUT_ENV_VAR).ok().as_deref())
    }

    pub fn from_timeout_ms(value: Option<&str>) -> Result<Self, AdapterError> {
        let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Ok(Self::default());
        };

        let timeout_ms = raw.parse::<u64>().map_err(|error| {
            AdapterError::InvalidConfig(format!(
                "{TIMEOUT_ENV_VAR}='{raw}' is not a number: {error}"
            ))
        })?;
        if timeout_ms == 0 {
            return Err(AdapterError::InvalidConfig(format!(
                "{TIMEOUT_ENV_VAR} must be a positive integer"
            )));
        }

        Ok(Self {
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Timeout in whole milliseconds, saturating at `u64::MAX`.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Runs one invocation through `chain` and returns its single settlement.
///
/// Never fails: malformed events, panicking chains and every other
/// adapter-level failure come back as a 500 result.
pub async fn handle_invocation<C: MiddlewareChain>(
    event: Value,
    chain: Arc<C>,
    config: &AdapterConfig,
) -> SettlementResult {
    let event = match serde_json::from_value::<InvocationEvent>(event) {
        Ok(value) => value,
        Err(error) => return adapter_failure(AdapterError::from(error)),
    };
    let request = Arc::new(normalize_event(event));
    tracing::info!(
        component = "adapter",
        event = "invocation_started",
        method = request.method(),
        url = request.url(),
    );

    let (arbiter, settlement) = CompletionArbiter::new();
    arbiter.arm_timeout(config.timeout);
    let response = ResponseEmulator::new(arbiter.clone());
    let next = ErrorContinuation::new(arbiter.clone());

    let chain_task = tokio::spawn(async move { chain.handle(request, response, next).await });
    let boundary = arbiter.clone();
    tokio::spawn(async move {
        if let Err(join_error) = chain_task.await {
            let error = chain_failure(join_error);
            tracing::error!(
                component = "adapter",
                event = "chain_failed",
                error = %error,
            );
            boundary.settle(
                SettlementSource::AdapterFailure,
                SettlementResult::internal_error(&error.to_string()),
            );
        }
    });

    let result = match settlement.wait().await {
        Some(value) => value,
        None => adapter_failure(AdapterError::SettlementDropped),
    };
    let source = arbiter.settled_by().map(SettlementSource::as_str);
    tracing::info!(
        component = "adapter",
        event = "invocation_settled",
        status_code = result.status_code,
        source = source.unwrap_or("none"),
    );
    result
}

fn adapter_failure(error: AdapterError) -> SettlementResult {
    tracing::error!(
        component = "adapter",
        event = "adapter_failure",
        error = %error,
    );
    SettlementResult::internal_error(&error.to_string())
}

fn chain_failure(join_error: JoinError) -> AdapterError {
    if join_error.is_panic() {
        AdapterError::ChainPanicked(panic_message(join_error.into_panic()))
    } else {
        AdapterError::ChainCancelled
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_twenty_five_seconds() {
        assert_eq!(
            AdapterConfig::from_timeout_ms(None).expect("default config"),
            AdapterConfig {
                timeout: Duration::from_secs(25),
            }
        );
        assert_eq!(
            AdapterConfig::from_timeout_ms(Some("  ")).expect("blank uses default"),
            AdapterConfig::default()
        );
    }

    #[test]
    fn config_parses_explicit_timeout() {
        let config = AdapterConfig::from_timeout_ms(Some("1500")).expect("valid timeout");
        assert_eq!(config.timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn config_rejects_zero_and_garbage() {
        let zero = AdapterConfig::from_timeout_ms(Some("0")).expect_err("zero should fail");
        assert!(zero.to_string().contains("must be a positive integer"));

        let garbage = AdapterConfig::from_timeout_ms(Some("soon")).expect_err("text should fail");
        assert!(garbage.to_string().contains("ADAPTER_TIMEOUT_MS='soon'"));
    }

    #[test]
    fn timeout_ms_saturates() {
        assert_eq!(AdapterConfig::default().timeout_ms(), 25_000);

        let unbounded = AdapterConfig {
            timeout: Duration::MAX,
        };
        assert_eq!(unbounded.timeout_ms(), u64::MAX);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("kaboom".to_string())), "kaboom");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic payload");
    }
}
