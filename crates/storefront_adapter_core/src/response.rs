use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::arbiter::{CompletionArbiter, SettlementSource};
use crate::contract::{
    json_headers, HeaderMap, SettlementResult, CONTENT_TYPE_HEADER, DEFAULT_STATUS_CODE,
    JSON_CONTENT_TYPE,
};

/// Payload accepted by [`ResponseEmulator::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendPayload {
    Text(String),
    Structured(Value),
}

impl From<&str> for SendPayload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SendPayload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for SendPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Number(number) => Self::Text(number.to_string()),
            Value::Bool(flag) => Self::Text(flag.to_string()),
            structured => Self::Structured(structured),
        }
    }
}

#[derive(Debug)]
struct ResponseState {
    status_code: u16,
    headers: HeaderMap,
    chunks: Vec<Vec<u8>>,
    ended: bool,
}

/// Buffering stand-in for a streaming response object.
///
/// Clones share one buffer. Every mutator is a silent no-op once the
/// invocation has settled, from whichever source.
#[derive(Clone)]
pub struct ResponseEmulator {
    state: Arc<Mutex<ResponseState>>,
    arbiter: CompletionArbiter,
}

impl ResponseEmulator {
    pub fn new(arbiter: CompletionArbiter) -> Self {
        Self {
            state: Arc::new(Mutex::new(ResponseState {
                status_code: DEFAULT_STATUS_CODE,
                headers: json_headers(),
                chunks: Vec::new(),
                ended: false,
            })),
            arbiter,
        }
    }

    pub fn set_status(&self, code: u16) -> &Self {
        let mut state = self.lock();
        if !self.is_closed(&state) {
            state.status_code = code;
        }
        self
    }

    /// Stores the header under its lower-cased name, replacing any value set
    /// under a differently-cased spelling.
    pub fn set_header(&self, name: &str, value: impl Into<String>) -> &Self {
        let mut state = self.lock();
        if !self.is_closed(&state) {
            let name = name.to_ascii_lowercase();
            state.headers.insert(name, value.into());
        }
        self
    }

    /// Buffers a chunk. There is no downstream stream, so this always
    /// reports success.
    pub fn write(&self, chunk: impl AsRef<[u8]>) -> bool {
        let mut state = self.lock();
        if !self.is_closed(&state) {
            state.chunks.push(chunk.as_ref().to_vec());
        }
        true
    }

    pub fn finish(&self) {
        self.finish_inner(None);
    }

    pub fn finish_with(&self, chunk: impl AsRef<[u8]>) {
        self.finish_inner(Some(chunk.as_ref()));
    }

    pub fn send_json<T: Serialize + ?Sized>(&self, data: &T) {
        if self.is_closed(&self.lock()) {
            return;
        }

        let encoded = match serde_json::to_vec(data) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.lock().ended = true;
                tracing::error!(
                    component = "adapter",
                    event = "response_encoding_failed",
                    error = %error,
                );
                self.arbiter.settle(
                    SettlementSource::AdapterFailure,
                    SettlementResult::internal_error(&error.to_string()),
                );
                return;
            }
        };

        self.set_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
        self.write(encoded);
        self.finish();
    }

    /// Structured payloads go through [`Self::send_json`]; text is written
    /// as the trailing chunk.
    pub fn send(&self, data: impl Into<SendPayload>) {
        match data.into() {
            SendPayload::Structured(value) => self.send_json(&value),
            SendPayload::Text(text) => self.finish_with(text),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.lock().status_code
    }

    pub fn header(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.lock().headers.get(&name).cloned()
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    fn finish_inner(&self, chunk: Option<&[u8]>) {
        let result = {
            let mut state = self.lock();
            if self.is_closed(&state) {
                return;
            }
            if let Some(chunk) = chunk {
                state.chunks.push(chunk.to_vec());
            }
            let body = String::from_utf8_lossy(&state.chunks.concat()).into_owned();
            state.ended = true;
            SettlementResult {
                status_code: state.status_code,
                headers: state.headers.clone(),
                body,
            }
        };
        self.arbiter.settle(SettlementSource::Finish, result);
    }

    fn is_closed(&self, state: &ResponseState) -> bool {
        state.ended || self.arbiter.is_settled()
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
