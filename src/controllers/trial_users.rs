use serde_json::Value;
use tracing::info;

use super::{RequestContext, bad_request, optional_str};
use crate::api::helpers::{created, ok};
use crate::context::AppContext;
use crate::core::models::Organization;
use crate::errors::SpaceCatError;
use crate::utils::validation::{is_valid_email, is_valid_uuid};

async fn require_organization(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Organization, SpaceCatError> {
    let organization_id = rc.params.get("organizationId");
    if !is_valid_uuid(organization_id) {
        return Err(bad_request("Organization ID required"));
    }
    let organization = app
        .data_access
        .organization_by_id(organization_id)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound("Organization not found".to_string()))?;
    if !rc.access.can_access_organization(&organization.id) {
        return Err(SpaceCatError::Forbidden(
            "Only users belonging to the organization can view its trial users".to_string(),
        ));
    }
    Ok(organization)
}

/// `GET /organizations/:organizationId/trial-users`
pub async fn get_by_organization_id(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let organization = require_organization(app, rc).await?;
    ok(&app
        .data_access
        .trial_users_for_organization(&organization.id)
        .await?)
}

/// `POST /organizations/:organizationId/trial-user-invite`
///
/// # Errors
///
/// 400 for an invalid email, 409 when the email was already invited to
/// the organization.
pub async fn create_trial_user_invite(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let organization = require_organization(app, rc).await?;
    let body = rc.request.json_body()?;
    let email = optional_str(&body, "emailId")?
        .map(str::trim)
        .filter(|e| is_valid_email(e))
        .ok_or_else(|| bad_request("Valid email address is required"))?
        .to_lowercase();

    let existing = app
        .data_access
        .trial_users_for_organization(&organization.id)
        .await?;
    if existing.iter().any(|u| u.email_id.eq_ignore_ascii_case(&email)) {
        return Err(SpaceCatError::Conflict(
            "Trial user with this email already exists for this organization".to_string(),
        ));
    }

    let user = app
        .data_access
        .create_trial_user(&organization.id, &email)
        .await?;
    info!(organization_id = %organization.id, trial_user_id = %user.id, "Trial user invited");
    created(&user)
}
