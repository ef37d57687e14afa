use storefront_adapter_core::adapter::TIMEOUT_ENV_VAR;
use storefront_adapter_core::{AdapterConfig, AdapterError};

pub const PING_MESSAGE_ENV_VAR: &str = "PING_MESSAGE";
pub const DEFAULT_PING_MESSAGE: &str = "ping";

/// Process-wide settings, read once when the function cold-starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub adapter: AdapterConfig,
    pub ping_message: String,
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AdapterError> {
        let adapter = AdapterConfig::from_timeout_ms(lookup(TIMEOUT_ENV_VAR).as_deref())?;
        let ping_message =
            lookup(PING_MESSAGE_ENV_VAR).unwrap_or_else(|| DEFAULT_PING_MESSAGE.to_string());

        Ok(Self {
            adapter,
            ping_message,
        })
    }
}
