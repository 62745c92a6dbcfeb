//! Normalized view of an API Gateway proxy event (payload format 1.0 or 2.0).

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value};

use super::parsing::v_str;
use crate::errors::SpaceCatError;

/// Path prefix of the public API, stripped before routing.
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Lowercased header names.
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<String>,
}

fn string_map(value: Option<&Value>, lowercase_keys: bool) -> HashMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| {
                    let key = if lowercase_keys { k.to_lowercase() } else { k.clone() };
                    v.as_str().map(|s| (key, s.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn strip_prefix_segment<'a>(path: &'a str, prefix: &str) -> &'a str {
    match path.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

impl Request {
    /// # Errors
    ///
    /// Returns `ParseError` if the method is missing or a base64 body is malformed.
    pub fn from_event(event: &Value) -> Result<Self, SpaceCatError> {
        let method = v_str(event, &["requestContext", "http", "method"])
            .or_else(|| v_str(event, &["httpMethod"]))
            .ok_or_else(|| SpaceCatError::ParseError("Missing HTTP method".to_string()))?
            .to_uppercase();

        let raw_path = v_str(event, &["rawPath"])
            .or_else(|| v_str(event, &["path"]))
            .unwrap_or("/");

        let mut path = raw_path;
        if let Some(stage) = v_str(event, &["requestContext", "stage"]).filter(|s| *s != "$default") {
            path = strip_prefix_segment(path, &format!("/{stage}"));
        }
        path = strip_prefix_segment(path, API_PREFIX);
        let path = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let body = match event.get("body").and_then(Value::as_str) {
            Some(raw) if event.get("isBase64Encoded").and_then(Value::as_bool) == Some(true) => {
                let bytes = STANDARD
                    .decode(raw)
                    .map_err(|e| SpaceCatError::ParseError(format!("Invalid base64 body: {e}")))?;
                Some(
                    String::from_utf8(bytes)
                        .map_err(|e| SpaceCatError::ParseError(format!("Body is not UTF-8: {e}")))?,
                )
            }
            Some(raw) => Some(raw.to_string()),
            None => None,
        };

        Ok(Self {
            method,
            path,
            headers: string_map(event.get("headers"), true),
            query: string_map(event.get("queryStringParameters"), false),
            body,
        })
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// `true` only for the literal `true` (case-insensitive).
    #[must_use]
    pub fn query_flag(&self, name: &str) -> bool {
        self.query_param(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    #[must_use]
    pub fn raw_body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// The body as a JSON object. An absent or blank body is an empty object.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the body is not a JSON object.
    pub fn json_body(&self) -> Result<Map<String, Value>, SpaceCatError> {
        let raw = self.raw_body().trim();
        if raw.is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SpaceCatError::Validation(
                "Request body must be a JSON object".to_string(),
            )),
            Err(_) => Err(SpaceCatError::Validation(
                "Request body is not valid JSON".to_string(),
            )),
        }
    }
}
