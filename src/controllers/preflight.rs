//! Preflight jobs: on-demand checks of pages that are about to go live.
//!
//! A job is recorded as an [`AsyncJob`] and processed by the audit worker;
//! callers poll `GET /preflight/jobs/:jobId` for the result.

use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use super::{RequestContext, bad_request, optional_bool, optional_str};
use crate::api::helpers::{accepted, ok};
use crate::aws::messages::PreflightMessage;
use crate::aws::sqs::to_message;
use crate::context::AppContext;
use crate::core::models::{AsyncJob, JobError, JobStatus};
use crate::errors::SpaceCatError;
use crate::utils::validation::{hostname_of, is_valid_url, is_valid_uuid, normalize_base_url, origin_of};

pub const PREFLIGHT_JOB_TYPE: &str = "preflight";

pub const PREFLIGHT_CHECKS: &[&str] = &[
    "body-size",
    "lorem-ipsum",
    "h1-count",
    "canonical",
    "metatags",
    "links",
    "readability",
    "accessibility",
    "headings",
];

const STEPS: &[&str] = &["identify", "suggest"];

/// Validated body of a preflight job request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreflightRequest {
    pub urls: Vec<String>,
    pub step: String,
    pub checks: Vec<String>,
    pub enable_authentication: bool,
}

/// Validates a `POST /preflight/jobs` body.
///
/// # Errors
///
/// 400 with a message naming the first invalid field.
pub fn validate_request(body: &Map<String, Value>) -> Result<PreflightRequest, SpaceCatError> {
    let urls = match body.get("urls") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(bad_request("Invalid request: urls must be a non-empty array")),
    };

    let mut validated = Vec::with_capacity(urls.len());
    for item in urls {
        match item.as_str() {
            Some(url) if is_valid_url(url) => validated.push(url.to_string()),
            _ => {
                let shown = item.as_str().map_or_else(|| item.to_string(), ToString::to_string);
                return Err(bad_request(&format!(
                    "Invalid request: {shown} is not a valid URL"
                )));
            }
        }
    }

    let first_host = hostname_of(&validated[0]);
    if validated.iter().any(|u| hostname_of(u) != first_host) {
        return Err(bad_request(
            "Invalid request: all urls must belong to the same website",
        ));
    }

    let step = optional_str(body, "step")?
        .map(str::to_lowercase)
        .filter(|s| STEPS.contains(&s.as_str()))
        .ok_or_else(|| bad_request("Invalid request: step must be either identify or suggest"))?;

    let checks = match body.get("checks") {
        None | Some(Value::Null) => PREFLIGHT_CHECKS.iter().map(ToString::to_string).collect(),
        Some(Value::Array(items)) => {
            let mut checks = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(check) if PREFLIGHT_CHECKS.contains(&check) => {
                        checks.push(check.to_string());
                    }
                    _ => {
                        return Err(bad_request(&format!(
                            "Invalid request: checks must be a subset of {}",
                            PREFLIGHT_CHECKS.join(", ")
                        )));
                    }
                }
            }
            checks
        }
        Some(_) => return Err(bad_request("Invalid request: checks must be an array")),
    };

    Ok(PreflightRequest {
        urls: validated,
        step,
        checks,
        enable_authentication: optional_bool(body, "enableAuthentication")?.unwrap_or(true),
    })
}

fn poll_url(app: &AppContext, job_id: &str) -> String {
    format!(
        "{}/preflight/jobs/{job_id}",
        app.config.api_base_url.trim_end_matches('/')
    )
}

async fn mark_failed(app: &AppContext, mut job: AsyncJob, message: &str) {
    let now = Utc::now();
    job.status = JobStatus::Failed;
    job.error = Some(JobError {
        code: "EXCEPTION".to_string(),
        message: message.to_string(),
    });
    job.ended_at = Some(now);
    job.updated_at = now;
    if let Err(e) = app.data_access.update_async_job(&job).await {
        error!(job_id = %job.id, "Failed to mark preflight job as failed: {}", e);
    }
}

/// `POST /preflight/jobs`
///
/// # Errors
///
/// 400 on invalid input or an unknown site, 403 without access, 500 when
/// the job cannot be queued.
pub async fn create_job(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    let body = rc.request.json_body()?;
    let request = validate_request(&body)?;

    let origin = origin_of(&request.urls[0])
        .and_then(|o| normalize_base_url(&o).ok())
        .ok_or_else(|| bad_request("No site found for the provided URL"))?;
    let site = app
        .data_access
        .site_by_base_url(&origin)
        .await?
        .ok_or_else(|| bad_request("No site found for the provided URL"))?;
    if !rc.access.can_access_site(&site) {
        return Err(SpaceCatError::Forbidden(
            "Only users belonging to the organization can access this site".to_string(),
        ));
    }

    let metadata = json!({
        "payload": {
            "siteId": site.id,
            "urls": request.urls,
            "step": request.step,
            "checks": request.checks,
            "enableAuthentication": request.enable_authentication,
        },
        "jobType": PREFLIGHT_JOB_TYPE,
        "tags": ["preflight"],
    });
    let job = app
        .data_access
        .create_async_job(PREFLIGHT_JOB_TYPE, metadata)
        .await?;

    let message = to_message(&PreflightMessage {
        job_id: job.id.clone(),
        job_type: PREFLIGHT_JOB_TYPE.to_string(),
    })?;
    if let Err(e) = app
        .queue
        .send_message(&app.config.audit_jobs_queue_url, &message)
        .await
    {
        error!(job_id = %job.id, "Failed to queue preflight job: {}", e);
        mark_failed(app, job, &e.to_string()).await;
        return Err(SpaceCatError::General(
            "Failed to create preflight job".to_string(),
        ));
    }

    info!(job_id = %job.id, site_id = %site.id, step = %request.step, "Preflight job created");
    accepted(&json!({
        "jobId": job.id,
        "status": job.status,
        "createdAt": job.created_at,
        "pollUrl": poll_url(app, &job.id),
    }))
}

/// `GET /preflight/jobs/:jobId`
///
/// # Errors
///
/// 400 for a malformed id, 404 when the job is unknown, 403 when the job
/// belongs to a site the caller cannot access.
pub async fn get_job(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    let job_id = rc.params.get("jobId");
    if !is_valid_uuid(job_id) {
        return Err(bad_request("Invalid jobId"));
    }
    let job = app
        .data_access
        .async_job_by_id(job_id)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound(format!("Job with ID {job_id} not found")))?;

    let site_id = job
        .metadata
        .pointer("/payload/siteId")
        .and_then(Value::as_str);
    if let Some(site_id) = site_id {
        if let Some(site) = app.data_access.site_by_id(site_id).await? {
            if !rc.access.can_access_site(&site) {
                return Err(SpaceCatError::Forbidden(
                    "Only users belonging to the organization can access this site".to_string(),
                ));
            }
        }
    }

    ok(&json!({
        "jobId": job.id,
        "status": job.status,
        "createdAt": job.created_at,
        "updatedAt": job.updated_at,
        "startedAt": job.started_at,
        "endedAt": job.ended_at,
        "result": job.result,
        "error": job.error,
    }))
}
