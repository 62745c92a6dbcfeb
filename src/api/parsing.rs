use serde_json::Value;

use crate::errors::SpaceCatError;
use crate::slack::command_parser::parse_form_data;

pub fn is_interactive_body(body: &str) -> bool {
    body.starts_with("payload=") || body.contains("&payload=")
}

/// Extracts and parses the JSON `payload` field of an interactivity request.
///
/// # Errors
///
/// Returns `ParseError` if the field is missing or not valid JSON.
pub fn parse_interactive_payload(form_body: &str) -> Result<Value, SpaceCatError> {
    let form = parse_form_data(form_body)
        .map_err(|e| SpaceCatError::ParseError(format!("Failed to decode payload: {e}")))?;
    let raw = form
        .get("payload")
        .ok_or_else(|| SpaceCatError::ParseError("Missing payload field".to_string()))?;
    serde_json::from_str(raw)
        .map_err(|e| SpaceCatError::ParseError(format!("Invalid JSON payload: {e}")))
}

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

pub fn v_array<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    v_path(root, path).and_then(|v| v.as_array())
}
