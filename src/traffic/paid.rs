//! Athena query construction for paid traffic reports.

use std::fmt;
use std::str::FromStr;

use crate::utils::weeks::IsoWeek;

/// Most dimensions a single paid traffic report can be grouped by.
pub const MAX_DIMENSIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Campaign,
    Channel,
    Type,
    Device,
    Url,
    Platform,
}

impl Dimension {
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::Campaign => "utm_campaign",
            Dimension::Channel => "trf_channel",
            Dimension::Type => "trf_type",
            Dimension::Device => "device",
            Dimension::Url => "path",
            Dimension::Platform => "trf_platform",
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Campaign => "campaign",
            Dimension::Channel => "channel",
            Dimension::Type => "type",
            Dimension::Device => "device",
            Dimension::Url => "url",
            Dimension::Platform => "platform",
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "campaign" => Ok(Dimension::Campaign),
            "channel" => Ok(Dimension::Channel),
            "type" => Ok(Dimension::Type),
            "device" => Ok(Dimension::Device),
            "url" => Ok(Dimension::Url),
            "platform" => Ok(Dimension::Platform),
            _ => Err(format!("Unsupported dimension: {s}")),
        }
    }
}

/// Ordered, de-duplicated list of grouping dimensions, e.g. `campaign-url-device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions(Vec<Dimension>);

impl Dimensions {
    #[must_use]
    pub fn as_slice(&self) -> &[Dimension] {
        &self.0
    }
}

impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut dims: Vec<Dimension> = Vec::new();
        for part in s.split('-').filter(|p| !p.is_empty()) {
            let dim: Dimension = part.parse()?;
            if !dims.contains(&dim) {
                dims.push(dim);
            }
        }
        if dims.is_empty() {
            return Err("At least one dimension is required".to_string());
        }
        if dims.len() > MAX_DIMENSIONS {
            return Err(format!("At most {MAX_DIMENSIONS} dimensions are supported"));
        }
        Ok(Self(dims))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Dimension::name).collect();
        f.write_str(&names.join("-"))
    }
}

/// Escapes a literal for inclusion in single quotes.
#[must_use]
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Aggregated paid traffic for a site and week, grouped by `dimensions`.
///
/// `site_id` is validated as a UUID before it reaches here; it is still
/// escaped since it ends up inside a literal.
#[must_use]
pub fn build_paid_traffic_query(
    table: &str,
    site_id: &str,
    week: IsoWeek,
    dimensions: &Dimensions,
) -> String {
    let columns: Vec<&str> = dimensions.as_slice().iter().map(Dimension::column).collect();
    let group_by = columns.join(", ");

    format!(
        "SELECT {group_by}, \
         SUM(pageviews) AS pageviews, \
         ROUND(CAST(SUM(bounced) AS DOUBLE) / NULLIF(SUM(visits), 0), 4) AS bounce_rate, \
         approx_percentile(lcp, 0.7) AS p70_lcp, \
         approx_percentile(cls, 0.7) AS p70_cls, \
         approx_percentile(inp, 0.7) AS p70_inp \
         FROM {table} \
         WHERE siteid = {site} AND year = {year} AND week = {week} AND trf_type = 'paid' \
         GROUP BY {group_by} \
         ORDER BY pageviews DESC",
        site = sql_literal(site_id),
        year = week.year,
        week = week.week,
    )
}

/// Pageviews per URL and traffic type, input for the predominant traffic classifier.
#[must_use]
pub fn build_traffic_type_query(table: &str, site_id: &str, week: IsoWeek) -> String {
    format!(
        "SELECT path, trf_type, SUM(pageviews) AS pageviews \
         FROM {table} \
         WHERE siteid = {site} AND year = {year} AND week = {week} \
         GROUP BY path, trf_type",
        site = sql_literal(site_id),
        year = week.year,
        week = week.week,
    )
}

/// S3 cache key for a paid traffic report.
#[must_use]
pub fn cache_key(site_id: &str, dimensions: &Dimensions, week: IsoWeek) -> String {
    format!(
        "traffic/{site_id}/paid/{dimensions}/{}-w{:02}.json",
        week.year, week.week
    )
}
