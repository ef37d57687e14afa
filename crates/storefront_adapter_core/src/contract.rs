use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const CONTENT_TYPE_HEADER: &str = "content-type";
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_URL: &str = "/";
pub const DEFAULT_STATUS_CODE: u16 = 200;
pub const TIMEOUT_STATUS_CODE: u16 = 504;
pub const INTERNAL_ERROR_STATUS_CODE: u16 = 500;
pub const NOT_FOUND_STATUS_CODE: u16 = 404;
pub const TIMEOUT_ERROR_MESSAGE: &str = "Function timeout";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
pub const NOT_FOUND_MESSAGE: &str = "Not Found";

pub type HeaderMap = BTreeMap<String, String>;
pub type QueryMap = BTreeMap<String, String>;

/// Raw event handed over by the host for one invocation.
///
/// Accepts both the Netlify/API Gateway field names (`httpMethod`, `rawUrl`,
/// `queryStringParameters`) and the plain `method`/`url` spelling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(default, alias = "method")]
    pub http_method: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Option<HeaderMap>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub query_string_parameters: Option<QueryMap>,
}

/// Host-independent request handed to the middleware chain.
///
/// Built once by [`crate::normalize::normalize_event`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Value,
    pub(crate) query: QueryMap,
    pub(crate) params: BTreeMap<String, String>,
    pub(crate) raw_body: String,
}

impl CanonicalRequest {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path component of the url, without scheme, host or query string.
    pub fn path(&self) -> &str {
        let without_origin = match self.url.find("://") {
            Some(scheme_end) => {
                let rest = &self.url[scheme_end + 3..];
                rest.find('/').map(|idx| &rest[idx..]).unwrap_or("/")
            }
            None => self.url.as_str(),
        };
        let end = without_origin
            .find(&['?', '#'][..])
            .unwrap_or(without_origin.len());
        &without_origin[..end]
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn query(&self) -> &QueryMap {
        &self.query
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// Readable-stream `data` hook. The body is already buffered, so the
    /// handler runs immediately with the whole raw body, or not at all when
    /// the body is empty.
    pub fn on_data(&self, mut handler: impl FnMut(&[u8])) {
        if !self.raw_body.is_empty() {
            handler(self.raw_body.as_bytes());
        }
    }

    /// Readable-stream `end` hook; fires immediately.
    pub fn on_end(&self, handler: impl FnOnce()) {
        handler();
    }

    pub fn once_end(&self, handler: impl FnOnce()) {
        self.on_end(handler);
    }
}

/// The single terminal value of an invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettlementResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl SettlementResult {
    pub fn json(status_code: u16, payload: &Value) -> Self {
        Self {
            status_code,
            headers: json_headers(),
            body: payload.to_string(),
        }
    }

    pub fn timeout() -> Self {
        Self::json(
            TIMEOUT_STATUS_CODE,
            &json!({ "error": TIMEOUT_ERROR_MESSAGE }),
        )
    }

    pub fn internal_error(message: &str) -> Self {
        Self::json(
            INTERNAL_ERROR_STATUS_CODE,
            &json!({
                "error": INTERNAL_ERROR_MESSAGE,
                "message": message,
            }),
        )
    }

    pub fn not_found() -> Self {
        Self::json(
            NOT_FOUND_STATUS_CODE,
            &json!({ "error": NOT_FOUND_MESSAGE }),
        )
    }
}

pub fn json_headers() -> HeaderMap {
    HeaderMap::from([(
        CONTENT_TYPE_HEADER.to_string(),
        JSON_CONTENT_TYPE.to_string(),
    )])
}
