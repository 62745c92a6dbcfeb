use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::{Value, json};
use tracing::info;

use super::{RequestContext, bad_request, optional_bool, optional_str, require_site};
use crate::api::helpers::{created, no_content, ok};
use crate::aws::s3::{get_json, scrape_result_key};
use crate::context::AppContext;
use crate::core::models::{DeliveryType, NewSite};
use crate::errors::SpaceCatError;
use crate::utils::validation::{is_valid_url, is_valid_uuid, normalize_base_url};

fn parse_delivery_type(raw: &str) -> Result<DeliveryType, SpaceCatError> {
    raw.parse::<DeliveryType>().map_err(SpaceCatError::Validation)
}

async fn require_organization(app: &AppContext, organization_id: &str) -> Result<(), SpaceCatError> {
    if !is_valid_uuid(organization_id) {
        return Err(bad_request("Organization ID must be a valid UUID"));
    }
    app.data_access
        .organization_by_id(organization_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| SpaceCatError::NotFound("Organization not found".to_string()))
}

/// `GET /sites`
///
/// # Errors
///
/// 403 for non-admins.
pub async fn get_all(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    rc.access.require_admin("Only admins can view all sites")?;
    ok(&app.data_access.all_sites().await?)
}

/// `GET /sites/by-delivery-type/:deliveryType`
///
/// # Errors
///
/// 403 for non-admins, 400 for an unknown delivery type.
pub async fn get_all_by_delivery_type(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    rc.access.require_admin("Only admins can view all sites")?;
    let delivery_type = parse_delivery_type(rc.params.get("deliveryType"))?;
    ok(&app.data_access.sites_by_delivery_type(delivery_type).await?)
}

/// `GET /sites/:siteId`
///
/// # Errors
///
/// See [`require_site`].
pub async fn get_by_id(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    ok(&require_site(app, rc.access, rc.params.get("siteId")).await?)
}

/// Decodes a base64 (standard or URL-safe) encoded base URL.
fn decode_base_url(encoded: &str) -> Option<String> {
    let bytes = STANDARD
        .decode(encoded)
        .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// `GET /sites/by-base-url/:base64BaseUrl`
///
/// # Errors
///
/// 400 when the parameter does not decode to a URL, 404 when unknown, 403 without access.
pub async fn get_by_base_url(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let base_url = decode_base_url(rc.params.get("baseURL"))
        .filter(|u| is_valid_url(u))
        .ok_or_else(|| bad_request("Base URL required"))?;
    let normalized = normalize_base_url(&base_url).map_err(|_| bad_request("Base URL required"))?;

    let site = app
        .data_access
        .site_by_base_url(&normalized)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound("Site not found".to_string()))?;
    if !rc.access.can_access_site(&site) {
        return Err(SpaceCatError::Forbidden(
            "Only users belonging to the organization can access this site".to_string(),
        ));
    }
    ok(&site)
}

/// `POST /sites`
///
/// # Errors
///
/// 403 for non-admins, 400 on invalid input, 404 for an unknown organization,
/// 409 when the base URL is taken.
pub async fn create_site(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    rc.access.require_admin("Only admins can create new sites")?;
    let body = rc.request.json_body()?;

    let raw_url = optional_str(&body, "baseURL")?
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| bad_request("Base URL required"))?;
    if !is_valid_url(raw_url) {
        return Err(bad_request("Invalid URL format"));
    }
    let base_url = normalize_base_url(raw_url).map_err(|_| bad_request("Invalid URL format"))?;

    let delivery_type = match optional_str(&body, "deliveryType")? {
        Some(dt) => parse_delivery_type(dt)?,
        None => DeliveryType::Other,
    };
    let organization_id = optional_str(&body, "organizationId")?.map(ToString::to_string);
    if let Some(org) = &organization_id {
        require_organization(app, org).await?;
    }

    let site = app
        .data_access
        .create_site(NewSite {
            base_url,
            delivery_type,
            organization_id,
            is_live: optional_bool(&body, "isLive")?.unwrap_or(false),
            name: optional_str(&body, "name")?.map(ToString::to_string),
        })
        .await?;
    info!(site_id = %site.id, base_url = %site.base_url, "Site created");
    created(&site)
}

/// `PATCH /sites/:siteId`
///
/// # Errors
///
/// 400 when nothing changes or a field is invalid, 403 when a non-admin
/// moves the site to another organization.
pub async fn update_site(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    let mut site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let body = rc.request.json_body()?;
    let mut updates = false;

    if let Some(name) = optional_str(&body, "name")? {
        if site.name.as_deref() != Some(name) {
            site.name = Some(name.to_string());
            updates = true;
        }
    }

    if let Some(dt) = optional_str(&body, "deliveryType")? {
        let delivery_type = parse_delivery_type(dt)?;
        if delivery_type != site.delivery_type {
            site.delivery_type = delivery_type;
            updates = true;
        }
    }

    if let Some(is_live) = optional_bool(&body, "isLive")? {
        if is_live != site.is_live {
            site.is_live = is_live;
            updates = true;
        }
    }

    if let Some(url) = optional_str(&body, "gitHubURL")? {
        let git_hub_url = if url.is_empty() {
            None
        } else if is_valid_url(url) {
            Some(url.to_string())
        } else {
            return Err(bad_request("Invalid URL format"));
        };
        if git_hub_url != site.git_hub_url {
            site.git_hub_url = git_hub_url;
            updates = true;
        }
    }

    if let Some(org) = optional_str(&body, "organizationId")? {
        if site.organization_id.as_deref() != Some(org) {
            rc.access
                .require_admin("Only admins can change the organization of a site")?;
            require_organization(app, org).await?;
            site.organization_id = Some(org.to_string());
            updates = true;
        }
    }

    if !updates {
        return Err(bad_request("No updates provided"));
    }

    let updated = app.data_access.update_site(&site).await?;
    info!(site_id = %updated.id, "Site updated");
    ok(&updated)
}

/// `DELETE /sites/:siteId`
///
/// # Errors
///
/// 403 for non-admins; see [`require_site`].
pub async fn remove_site(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    rc.access.require_admin("Only admins can remove sites")?;
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    app.data_access.remove_site(&site.id).await?;
    info!(site_id = %site.id, "Site removed");
    Ok(no_content())
}

/// `GET /sites/:siteId/scraped-content?path=/page`
///
/// # Errors
///
/// 404 when no scrape result is stored for the page.
pub async fn get_scraped_content(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let path = rc.request.query_param("path").unwrap_or("/");
    let key = scrape_result_key(&site.id, path);

    let content = get_json(app.object_store.as_ref(), &app.config.s3_scraper_bucket, &key)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound("Scraped content not found".to_string()))?;

    ok(&json!({ "siteId": site.id, "path": path, "content": content }))
}
