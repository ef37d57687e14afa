use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::contract::{CanonicalRequest, InvocationEvent, DEFAULT_METHOD, DEFAULT_URL};

/// Builds the canonical request for one invocation. Never fails: an
/// undecodable text body is kept verbatim.
pub fn normalize_event(event: InvocationEvent) -> CanonicalRequest {
    let method = non_empty(event.http_method).unwrap_or_else(|| DEFAULT_METHOD.to_string());
    let url = non_empty(event.raw_url)
        .or_else(|| non_empty(event.path))
        .or_else(|| non_empty(event.url))
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let (body, raw_body) = normalize_body(event.body);

    CanonicalRequest {
        method,
        url,
        headers: event.headers.unwrap_or_default(),
        body,
        query: event.query_string_parameters.unwrap_or_default(),
        params: BTreeMap::new(),
        raw_body,
    }
}

/// Returns the canonical body and the raw text it came from.
///
/// A structured body is authoritative and is never re-decoded.
pub fn normalize_body(body: Option<Value>) -> (Value, String) {
    match body {
        None | Some(Value::Null) => (empty_body(), String::new()),
        Some(Value::String(text)) if text.is_empty() => (empty_body(), text),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(decoded) => (decoded, text),
            Err(_) => (Value::String(text.clone()), text),
        },
        Some(structured) => {
            let raw_body = structured.to_string();
            (structured, raw_body)
        }
    }
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}
