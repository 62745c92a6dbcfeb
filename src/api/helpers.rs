//! Response builders shared by controllers and Slack handlers.
//!
//! Lambda responses are `{ statusCode, headers, body }` with a string body.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::errors::SpaceCatError;

// ============================================================================
// JSON API responses
// ============================================================================

fn json_response(status_code: u16, body: &Value) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": body.to_string()
    })
}

fn serialized(status_code: u16, body: &impl Serialize) -> Result<Value, SpaceCatError> {
    let value = serde_json::to_value(body)
        .map_err(|e| SpaceCatError::General(format!("Failed to serialize response: {e}")))?;
    Ok(json_response(status_code, &value))
}

/// 200 with `body` as JSON.
///
/// # Errors
///
/// Returns an error if `body` cannot be serialized.
pub fn ok(body: &impl Serialize) -> Result<Value, SpaceCatError> {
    serialized(200, body)
}

/// 201 with `body` as JSON.
///
/// # Errors
///
/// Returns an error if `body` cannot be serialized.
pub fn created(body: &impl Serialize) -> Result<Value, SpaceCatError> {
    serialized(201, body)
}

/// 202 with `body` as JSON.
///
/// # Errors
///
/// Returns an error if `body` cannot be serialized.
pub fn accepted(body: &impl Serialize) -> Result<Value, SpaceCatError> {
    serialized(202, body)
}

#[must_use]
pub fn no_content() -> Value {
    json!({ "statusCode": 204, "headers": {}, "body": "" })
}

/// `{ "message": ... }` with the given status.
#[must_use]
pub fn error_response(status_code: u16, message: &str) -> Value {
    let mut response = json_response(status_code, &json!({ "message": message }));
    response["headers"]["x-error"] = Value::String(message.to_string());
    response
}

/// Maps a controller error to its response, logging server-side failures.
#[must_use]
pub fn from_error(error: &SpaceCatError) -> Value {
    let status = error.status_code();
    if status >= 500 {
        error!(error = %error, status, "Request failed");
    }
    error_response(status, &error.public_message())
}

// ============================================================================
// Slack responses
// ============================================================================

/// Returns a 200 OK response with an empty JSON body.
#[must_use]
pub fn ok_empty() -> Value {
    json!({ "statusCode": 200, "body": "" })
}

/// Returns a 200 OK response carrying a Slack-specific JSON body.
#[must_use]
pub fn ok_slack(body: &Value) -> Value {
    json_response(200, body)
}
