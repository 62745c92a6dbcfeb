//! REST controllers. Each operation takes the shared [`AppContext`] and the
//! routed request, and returns a Lambda proxy response or a typed error that
//! the handler maps to a status code.

pub mod audits;
pub mod consent_banner;
pub mod paid_traffic;
pub mod preflight;
pub mod sites;
pub mod trial_users;

use serde_json::{Map, Value};

use crate::api::auth::Access;
use crate::api::request::Request;
use crate::api::router::Params;
use crate::context::AppContext;
use crate::core::models::Site;
use crate::errors::SpaceCatError;
use crate::utils::validation::is_valid_uuid;

pub struct RequestContext<'a> {
    pub request: &'a Request,
    pub params: &'a Params,
    pub access: &'a Access,
}

fn bad_request(message: &str) -> SpaceCatError {
    SpaceCatError::Validation(message.to_string())
}

/// Loads a site the caller may access.
///
/// # Errors
///
/// 400 for a malformed id, 404 when unknown, 403 without access.
pub async fn require_site(
    app: &AppContext,
    access: &Access,
    site_id: &str,
) -> Result<Site, SpaceCatError> {
    if !is_valid_uuid(site_id) {
        return Err(bad_request("Site ID required"));
    }
    let site = app
        .data_access
        .site_by_id(site_id)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound("Site not found".to_string()))?;
    if !access.can_access_site(&site) {
        return Err(SpaceCatError::Forbidden(
            "Only users belonging to the organization can access this site".to_string(),
        ));
    }
    Ok(site)
}

/// Reads an optional string field; any other JSON type is a 400.
fn optional_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, SpaceCatError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(SpaceCatError::Validation(format!("{field} must be a string"))),
    }
}

fn optional_bool(body: &Map<String, Value>, field: &str) -> Result<Option<bool>, SpaceCatError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(SpaceCatError::Validation(format!("{field} must be a boolean"))),
    }
}
