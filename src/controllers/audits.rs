use serde_json::{Map, Value};
use tracing::info;

use super::{RequestContext, bad_request, require_site};
use crate::api::helpers::ok;
use crate::context::AppContext;
use crate::core::models::{GroupedUrl, HandlerConfig, ManualOverwrite};
use crate::errors::SpaceCatError;
use crate::utils::validation::{has_text, is_valid_url};

fn audit_type<'a>(rc: &'a RequestContext<'_>) -> Result<&'a str, SpaceCatError> {
    let audit_type = rc.params.get("auditType");
    if audit_type.is_empty() {
        return Err(bad_request("Audit type required"));
    }
    Ok(audit_type)
}

pub async fn get_all_for_site(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let ascending = rc.request.query_flag("ascending");
    ok(&app.data_access.audits_for_site(&site.id, ascending).await?)
}

pub async fn get_all_latest_for_site(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    ok(&app.data_access.latest_audits_for_site(&site.id).await?)
}

pub async fn get_all_for_site_by_type(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let audit_type = audit_type(rc)?;
    let ascending = rc.request.query_flag("ascending");
    ok(&app
        .data_access
        .audits_for_site_and_type(&site.id, audit_type, ascending)
        .await?)
}

/// `GET /sites/:siteId/latest-audit/:auditType`
///
/// # Errors
///
/// 404 "Audit not found" when the site has no audit of that type.
pub async fn get_latest_for_site(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let audit_type = audit_type(rc)?;
    let audit = app
        .data_access
        .latest_audit_for_site(&site.id, audit_type)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound("Audit not found".to_string()))?;
    ok(&audit)
}

/// `GET /audits/latest/:auditType` across all sites; admin only.
///
/// # Errors
///
/// 403 for non-admins.
pub async fn get_all_latest(app: &AppContext, rc: &RequestContext<'_>) -> Result<Value, SpaceCatError> {
    rc.access.require_admin("Only admins can view latest audits")?;
    let audit_type = audit_type(rc)?;
    let ascending = rc.request.query_flag("ascending");
    ok(&app
        .data_access
        .latest_audits_by_type(audit_type, ascending)
        .await?)
}

// ============================================================================
// Audit configuration
// ============================================================================

fn array_field<'a>(body: &'a Map<String, Value>, field: &str) -> Result<Option<&'a Vec<Value>>, SpaceCatError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(bad_request(&format!("{field} must be an array"))),
    }
}

fn parse_excluded_urls(items: &[Value]) -> Result<Vec<String>, SpaceCatError> {
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(url) if is_valid_url(url) => Ok(url.to_string()),
            _ => Err(bad_request("Invalid URL format")),
        })
        .collect()
}

fn parse_manual_overwrites(items: &[Value]) -> Result<Vec<ManualOverwrite>, SpaceCatError> {
    items
        .iter()
        .map(|item| {
            let overwrite: ManualOverwrite = serde_json::from_value(item.clone()).map_err(|_| {
                bad_request("Manual overwrites must have brokenTargetURL and targetURL")
            })?;
            if !is_valid_url(&overwrite.broken_target_url) || !is_valid_url(&overwrite.target_url) {
                return Err(bad_request("Invalid URL format"));
            }
            Ok(overwrite)
        })
        .collect()
}

fn parse_grouped_urls(items: &[Value]) -> Result<Vec<GroupedUrl>, SpaceCatError> {
    items
        .iter()
        .map(|item| {
            let group: GroupedUrl = serde_json::from_value(item.clone())
                .map_err(|_| bad_request("Grouped URLs must have name and pattern"))?;
            if !has_text(Some(&group.name)) || !has_text(Some(&group.pattern)) {
                return Err(bad_request("Grouped URLs must have name and pattern"));
            }
            Ok(group)
        })
        .collect()
}

/// Unions `incoming` into `existing`, keeping first-seen order.
fn merge_excluded_urls(existing: &mut Vec<String>, incoming: Vec<String>) {
    for url in incoming {
        if !existing.contains(&url) {
            existing.push(url);
        }
    }
}

/// Entries sharing a broken target URL are replaced by the newer one.
fn merge_manual_overwrites(existing: &mut Vec<ManualOverwrite>, incoming: Vec<ManualOverwrite>) {
    for overwrite in incoming {
        existing.retain(|o| o.broken_target_url != overwrite.broken_target_url);
        existing.push(overwrite);
    }
}

fn merge_grouped_urls(existing: &mut Vec<GroupedUrl>, incoming: Vec<GroupedUrl>) {
    for group in incoming {
        existing.retain(|g| g.pattern != group.pattern);
        existing.push(group);
    }
}

/// Applies a PATCH body to a handler config. An empty array clears the
/// corresponding list; a non-empty one is merged in.
///
/// # Errors
///
/// 400 when no known field is present or a value is malformed.
pub fn apply_config_update(
    config: &mut HandlerConfig,
    body: &Map<String, Value>,
) -> Result<(), SpaceCatError> {
    let excluded = array_field(body, "excludedURLs")?;
    let overwrites = array_field(body, "manualOverwrites")?;
    let grouped = array_field(body, "groupedURLs")?;

    if excluded.is_none() && overwrites.is_none() && grouped.is_none() {
        return Err(bad_request("No updates provided"));
    }

    if let Some(items) = excluded {
        let urls = parse_excluded_urls(items)?;
        if urls.is_empty() {
            config.excluded_urls.clear();
        } else {
            merge_excluded_urls(&mut config.excluded_urls, urls);
        }
    }

    if let Some(items) = overwrites {
        let parsed = parse_manual_overwrites(items)?;
        if parsed.is_empty() {
            config.manual_overwrites.clear();
        } else {
            merge_manual_overwrites(&mut config.manual_overwrites, parsed);
        }
    }

    if let Some(items) = grouped {
        let parsed = parse_grouped_urls(items)?;
        if parsed.is_empty() {
            config.grouped_urls.clear();
        } else {
            merge_grouped_urls(&mut config.grouped_urls, parsed);
        }
    }

    Ok(())
}

/// `PATCH /sites/:siteId/:auditType`
///
/// # Errors
///
/// See [`apply_config_update`] and [`require_site`].
pub async fn patch_audit_for_site(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let mut site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let audit_type = audit_type(rc)?.to_string();
    let body = rc.request.json_body()?;

    let handler_config = site.config.handlers.entry(audit_type.clone()).or_default();
    apply_config_update(handler_config, &body)?;
    let updated_config = handler_config.clone();

    app.data_access.update_site(&site).await?;
    info!(site_id = %site.id, audit_type = %audit_type, "Audit configuration updated");
    ok(&updated_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn rejects_empty_update() {
        let mut config = HandlerConfig::default();
        let err = apply_config_update(&mut config, &body(json!({"other": 1}))).unwrap_err();
        assert_eq!(err.to_string(), "No updates provided");
    }

    #[test]
    fn excluded_urls_are_unioned_then_cleared() {
        let mut config = HandlerConfig {
            excluded_urls: vec!["https://a.com/x".into()],
            ..HandlerConfig::default()
        };
        apply_config_update(
            &mut config,
            &body(json!({"excludedURLs": ["https://a.com/x", "https://a.com/y"]})),
        )
        .unwrap();
        assert_eq!(config.excluded_urls, vec!["https://a.com/x", "https://a.com/y"]);

        apply_config_update(&mut config, &body(json!({"excludedURLs": []}))).unwrap();
        assert!(config.excluded_urls.is_empty());
    }

    #[test]
    fn newer_overwrite_replaces_same_broken_url() {
        let mut config = HandlerConfig::default();
        apply_config_update(
            &mut config,
            &body(json!({"manualOverwrites": [
                {"brokenTargetURL": "https://a.com/old", "targetURL": "https://a.com/one"},
                {"brokenTargetURL": "https://a.com/old", "targetURL": "https://a.com/two"}
            ]})),
        )
        .unwrap();
        assert_eq!(config.manual_overwrites.len(), 1);
        assert_eq!(config.manual_overwrites[0].target_url, "https://a.com/two");
    }

    #[test]
    fn invalid_excluded_url_is_rejected() {
        let mut config = HandlerConfig::default();
        let err =
            apply_config_update(&mut config, &body(json!({"excludedURLs": ["not a url"]}))).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(config.excluded_urls.is_empty());
    }
}
