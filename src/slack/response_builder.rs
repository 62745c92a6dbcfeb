//! Bodies returned to Slack in the HTTP response itself (as opposed to
//! messages posted through the Web API).

use serde_json::{Map, Value, json};

/// `url_verification` handshake answer.
#[must_use]
pub fn create_challenge_payload(challenge: &str) -> Value {
    json!({ "challenge": challenge })
}

/// Closes the modal after a successful `view_submission`.
#[must_use]
pub fn create_modal_clear_payload() -> Value {
    json!({ "response_action": "clear" })
}

/// Keeps the modal open and shows `errors` (block id to message) under the fields.
#[must_use]
pub fn create_modal_errors_payload(errors: &Map<String, Value>) -> Value {
    json!({ "response_action": "errors", "errors": errors })
}
