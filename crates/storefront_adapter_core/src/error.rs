/// Failures caught at the adapter boundary. None of these reach the host:
/// each is converted into a 500 settlement.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("malformed invocation event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
    #[error("middleware chain panicked: {0}")]
    ChainPanicked(String),
    #[error("middleware chain task was cancelled")]
    ChainCancelled,
    #[error("settlement slot closed without a result")]
    SettlementDropped,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_event_message_includes_decoder_detail() {
        let decode_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let message = AdapterError::from(decode_error).to_string();
        assert!(message.starts_with("malformed invocation event: EOF"));
    }
}
