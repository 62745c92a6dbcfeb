//! Traffic reports backed by Athena, cached in S3.

use serde_json::{Map, Number, Value, json};
use tracing::info;

use super::{RequestContext, bad_request, require_site};
use crate::api::helpers::ok;
use crate::aws::Row;
use crate::aws::s3::S3JsonCache;
use crate::context::AppContext;
use crate::errors::SpaceCatError;
use crate::traffic::paid::{Dimensions, build_paid_traffic_query, build_traffic_type_query, cache_key};
use crate::traffic::predominant::{aggregate_rows, classify_urls, parse_threshold};
use crate::utils::weeks::IsoWeek;

const METRIC_COLUMNS: &[&str] = &["pageviews", "bounce_rate", "p70_lcp", "p70_cls", "p70_inp"];

/// Reads `year` and `week`; both or neither must be given.
///
/// # Errors
///
/// 400 when only one is present or either is out of range.
pub fn requested_week(year: Option<&str>, week: Option<&str>) -> Result<IsoWeek, SpaceCatError> {
    match (year, week) {
        (None, None) => Ok(IsoWeek::last_complete_now()),
        (Some(year), Some(week)) => {
            let year: i32 = year.parse().map_err(|_| bad_request("Invalid year"))?;
            let week: u32 = week.parse().map_err(|_| bad_request("Invalid week"))?;
            IsoWeek::new(year, week).map_err(SpaceCatError::Validation)
        }
        _ => Err(bad_request("Year and week must be provided together")),
    }
}

fn metric_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Converts Athena's all-string rows to JSON, turning metric columns into
/// numbers. Empty metrics become `null`.
#[must_use]
pub fn rows_to_json(rows: &[Row]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let object: Map<String, Value> = row
                .iter()
                .map(|(column, raw)| {
                    let value = if METRIC_COLUMNS.contains(&column.as_str()) {
                        metric_value(raw)
                    } else {
                        Value::String(raw.clone())
                    };
                    (column.clone(), value)
                })
                .collect();
            Value::Object(object)
        })
        .collect()
}

/// `GET /sites/:siteId/traffic/paid/:dimensions`
///
/// # Errors
///
/// 400 for unknown dimensions or an invalid week.
pub async fn get_paid_traffic(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let dimensions: Dimensions = rc
        .params
        .get("dimensions")
        .parse()
        .map_err(SpaceCatError::Validation)?;
    let week = requested_week(rc.request.query_param("year"), rc.request.query_param("week"))?;

    let sql = build_paid_traffic_query(&app.config.athena_table, &site.id, week, &dimensions);
    let runner = app.query_runner.clone();
    let database = app.config.athena_database.clone();
    let compute = move || async move {
        let rows = runner.run_query(&sql, &database).await?;
        Ok::<Value, SpaceCatError>(Value::Array(rows_to_json(&rows)))
    };

    let data = if rc.request.query_flag("noCache") {
        compute().await?
    } else {
        let cache = S3JsonCache::new(app.object_store.clone(), app.config.s3_cache_bucket.clone());
        cache
            .get_or_compute(&cache_key(&site.id, &dimensions, week), compute)
            .await?
    };

    info!(site_id = %site.id, dimensions = %dimensions, year = week.year, week = week.week, "Paid traffic served");
    ok(&json!({
        "siteId": site.id,
        "year": week.year,
        "week": week.week,
        "dimensions": dimensions.to_string(),
        "data": data,
    }))
}

/// `GET /sites/:siteId/traffic/predominant-type`
///
/// # Errors
///
/// 400 for an invalid threshold or week.
pub async fn get_predominant_traffic(
    app: &AppContext,
    rc: &RequestContext<'_>,
) -> Result<Value, SpaceCatError> {
    let site = require_site(app, rc.access, rc.params.get("siteId")).await?;
    let threshold =
        parse_threshold(rc.request.query_param("threshold")).map_err(SpaceCatError::Validation)?;
    let week = requested_week(rc.request.query_param("year"), rc.request.query_param("week"))?;

    let sql = build_traffic_type_query(&app.config.athena_table, &site.id, week);
    let rows = app
        .query_runner
        .run_query(&sql, &app.config.athena_database)
        .await?;
    let urls = classify_urls(&aggregate_rows(&rows), threshold);

    info!(site_id = %site.id, urls = urls.len(), threshold, "Predominant traffic classified");
    ok(&json!({
        "siteId": site.id,
        "year": week.year,
        "week": week.week,
        "threshold": threshold,
        "urls": urls,
    }))
}
