//! Consent banner screenshots.
//!
//! The scraper renders the page with and without the consent banner on a
//! desktop and a mobile viewport and writes four PNGs under
//! `consent-banner/{jobId}/`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::{RequestContext, bad_request, optional_str};
use crate::api::helpers::{accepted, ok};
use crate::aws::messages::{ScrapeMessage, ScrapeUrl};
use crate::aws::sqs::to_message;
use crate::context::AppContext;
use crate::errors::SpaceCatError;
use crate::utils::validation::{is_valid_url, is_valid_uuid};

pub const CONSENT_BANNER_PROCESSING_TYPE: &str = "consent-banner";

pub const DEVICES: &[&str] = &["desktop", "iphone-6"];

pub const BANNER_STATES: &[&str] = &["banner-on", "banner-off"];

#[must_use]
pub fn screenshot_key(job_id: &str, device: &str, state: &str) -> String {
    format!("consent-banner/{job_id}/screenshot-{device}-{state}.png")
}

/// `POST /consent-banner`
///
/// # Errors
///
/// 400 for a missing or invalid URL.
pub async fn take_screenshots(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let body = rc.request.json_body()?;
    let url = optional_str(&body, "url")?
        .filter(|u| is_valid_url(u))
        .ok_or_else(|| bad_request("Valid URL is required"))?;

    let job_id = Uuid::new_v4().to_string();
    let message = to_message(&ScrapeMessage {
        job_id: job_id.clone(),
        processing_type: CONSENT_BANNER_PROCESSING_TYPE.to_string(),
        urls: vec![ScrapeUrl { url: url.to_string() }],
        options: Some(json!({
            "screenshotTypes": ["viewport"],
            "hideConsentBanners": false,
        })),
        slack_context: None,
    })?;
    app.queue
        .send_message(&app.config.scraping_jobs_queue_url, &message)
        .await?;

    info!(job_id = %job_id, url = %url, "Consent banner job queued");
    accepted(&json!({ "jobId": job_id }))
}

/// `GET /consent-banner/:jobId`
///
/// # Errors
///
/// 400 for a malformed id, 404 when no screenshot exists yet.
pub async fn get_screenshots(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let job_id = rc.params.get("jobId");
    if !is_valid_uuid(job_id) {
        return Err(bad_request("Valid job ID is required"));
    }

    let bucket = &app.config.s3_scraper_bucket;
    let ttl = Duration::from_secs(app.config.presigned_url_ttl_seconds);
    let mut results: BTreeMap<&str, BTreeMap<&str, String>> = BTreeMap::new();

    for device in DEVICES {
        for state in BANNER_STATES {
            let key = screenshot_key(job_id, device, state);
            if app.object_store.head_object(bucket, &key).await? {
                let url = app.object_store.presign_get(bucket, &key, ttl).await?;
                results.entry(device).or_default().insert(state, url);
            }
        }
    }

    if results.is_empty() {
        return Err(SpaceCatError::NotFound("Results not found".to_string()));
    }
    ok(&json!({ "jobId": job_id, "results": results }))
}
