//! API Lambda handler - thin router that delegates to controllers.
//!
//! This module handles:
//! - Request normalization and routing
//! - API key authentication for REST routes
//! - Slack signature verification for `/slack/*` routes

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info, instrument};

use super::auth::authenticate;
use super::helpers;
use super::parsing;
use super::request::Request;
use super::router::{Route, find_route};
use super::signature;
use super::{event_handler, interactive_handler};
use crate::context::AppContext;
use crate::controllers::{
    RequestContext, audits, consent_banner, paid_traffic, preflight, sites, trial_users,
};

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Never fails; every error is turned into an HTTP response.
pub async fn function_handler(app: &AppContext, event: LambdaEvent<Value>) -> Result<Value, Error> {
    Ok(handle_request(app, &event.payload).await)
}

/// Routes one API Gateway event and returns the Lambda proxy response.
#[instrument(level = "info", skip_all)]
pub async fn handle_request(app: &AppContext, event: &Value) -> Value {
    let request = match Request::from_event(event) {
        Ok(r) => r,
        Err(e) => return helpers::from_error(&e),
    };
    info!(method = %request.method, path = %request.path, "API request");

    let Some((route, params)) = find_route(&request.method, &request.path) else {
        return helpers::error_response(404, "Not found");
    };

    if route.is_slack() {
        return handle_slack(app, route, &request).await;
    }

    let access = match authenticate(&request, &app.config) {
        Ok(access) => access,
        Err(e) => return helpers::from_error(&e),
    };
    let rc = RequestContext {
        request: &request,
        params: &params,
        access: &access,
    };

    let result = match route {
        Route::GetAllSites => sites::get_all(app, &rc).await,
        Route::GetSitesByDeliveryType => sites::get_all_by_delivery_type(app, &rc).await,
        Route::GetSiteByBaseUrl => sites::get_by_base_url(app, &rc).await,
        Route::CreateSite => sites::create_site(app, &rc).await,
        Route::GetSite => sites::get_by_id(app, &rc).await,
        Route::UpdateSite => sites::update_site(app, &rc).await,
        Route::RemoveSite => sites::remove_site(app, &rc).await,
        Route::GetScrapedContent => sites::get_scraped_content(app, &rc).await,
        Route::GetAuditsForSite => audits::get_all_for_site(app, &rc).await,
        Route::GetLatestAuditsForSite => audits::get_all_latest_for_site(app, &rc).await,
        Route::GetAuditsForSiteByType => audits::get_all_for_site_by_type(app, &rc).await,
        Route::GetLatestAuditForSite => audits::get_latest_for_site(app, &rc).await,
        Route::GetLatestAuditsByType => audits::get_all_latest(app, &rc).await,
        Route::UpdateAuditConfig => audits::patch_audit_for_site(app, &rc).await,
        Route::CreatePreflightJob => preflight::create_job(app, &rc).await,
        Route::GetPreflightJob => preflight::get_job(app, &rc).await,
        Route::GetTrialUsers => trial_users::get_by_organization_id(app, &rc).await,
        Route::InviteTrialUser => trial_users::create_trial_user_invite(app, &rc).await,
        Route::CreateConsentBannerJob => consent_banner::take_screenshots(app, &rc).await,
        Route::GetConsentBannerResult => consent_banner::get_screenshots(app, &rc).await,
        Route::GetPaidTraffic => paid_traffic::get_paid_traffic(app, &rc).await,
        Route::GetPredominantTraffic => paid_traffic::get_predominant_traffic(app, &rc).await,
        Route::SlackEvents | Route::SlackActions => Ok(helpers::error_response(404, "Not found")),
    };

    result.unwrap_or_else(|e| helpers::from_error(&e))
}

// ============================================================================
// Slack routes
// ============================================================================

fn verify_signature(request: &Request, app: &AppContext) -> Result<(), Value> {
    let Some(sig) = request.header("X-Slack-Signature") else {
        error!("Missing X-Slack-Signature header");
        return Err(helpers::error_response(401, "Missing X-Slack-Signature header"));
    };

    let Some(timestamp) = request.header("X-Slack-Request-Timestamp") else {
        error!("Missing X-Slack-Request-Timestamp header");
        return Err(helpers::error_response(
            401,
            "Missing X-Slack-Request-Timestamp header",
        ));
    };

    if !signature::verify_slack_signature(
        request.raw_body(),
        timestamp,
        sig,
        &app.config.slack_signing_secret,
    ) {
        return Err(helpers::error_response(401, "Invalid Slack signature"));
    }

    Ok(())
}

async fn handle_slack(app: &AppContext, route: Route, request: &Request) -> Value {
    if let Err(response) = verify_signature(request, app) {
        return response;
    }

    // Slack retries when the first ack was slow; the original delivery is
    // still being processed.
    if let Some(retry) = request.header("X-Slack-Retry-Num") {
        info!(retry_num = %retry, "Acknowledging Slack retry");
        return helpers::ok_empty();
    }

    let body = request.raw_body();
    match route {
        Route::SlackEvents => match serde_json::from_str::<Value>(body) {
            Ok(json_body) => event_handler::handle_event_callback(app, &json_body).await,
            Err(e) => {
                error!("Event payload parse error: {}", e);
                helpers::error_response(400, &format!("Parse Error: {e}"))
            }
        },
        _ if parsing::is_interactive_body(body) => match parsing::parse_interactive_payload(body) {
            Ok(payload) => interactive_handler::handle_interactive(app, &payload).await,
            Err(e) => {
                error!("Interactive payload parse error: {}", e);
                helpers::error_response(400, &format!("Parse Error: {e}"))
            }
        },
        _ => helpers::error_response(400, "Parse Error: missing payload"),
    }
}
