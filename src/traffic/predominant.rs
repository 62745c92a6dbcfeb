//! Classifies URLs by which traffic type (paid, earned, owned) dominates them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aws::Row;

pub const DEFAULT_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredominantType {
    Paid,
    Earned,
    Owned,
    Mixed,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrafficCounts {
    pub paid: u64,
    pub earned: u64,
    pub owned: u64,
}

impl TrafficCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.paid.saturating_add(self.earned).saturating_add(self.owned)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlTraffic {
    pub url: String,
    pub pageviews: u64,
    pub paid_percentage: f64,
    pub earned_percentage: f64,
    pub owned_percentage: f64,
    pub predominant_traffic: PredominantType,
}

/// Validates a user supplied threshold: a percentage in `(0, 100]`.
pub fn parse_threshold(raw: Option<&str>) -> Result<f64, String> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_THRESHOLD);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid threshold: {raw}"))?;
    if !(value > 0.0 && value <= 100.0) {
        return Err("Threshold must be greater than 0 and at most 100".to_string());
    }
    Ok(value)
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = part as f64 * 100.0 / total as f64;
    (pct * 100.0).round() / 100.0
}

/// Classifies one URL.
///
/// A traffic type is predominant when its share reaches `threshold` percent.
/// With a threshold at or below 50 two types can qualify; the larger share
/// wins and ties resolve in the order paid, earned, owned.
#[must_use]
pub fn classify(counts: &TrafficCounts, threshold: f64) -> PredominantType {
    let total = counts.total();
    if total == 0 {
        return PredominantType::Unknown;
    }

    let candidates = [
        (PredominantType::Paid, percentage(counts.paid, total)),
        (PredominantType::Earned, percentage(counts.earned, total)),
        (PredominantType::Owned, percentage(counts.owned, total)),
    ];

    candidates
        .iter()
        .filter(|(_, pct)| *pct >= threshold)
        .fold(None::<(PredominantType, f64)>, |best, &(kind, pct)| match best {
            Some((_, best_pct)) if best_pct >= pct => best,
            _ => Some((kind, pct)),
        })
        .map_or(PredominantType::Mixed, |(kind, _)| kind)
}

/// Folds `path, trf_type, pageviews` rows into per-URL counts.
///
/// Unknown traffic types are ignored; unparsable pageviews count as zero.
#[must_use]
pub fn aggregate_rows(rows: &[Row]) -> BTreeMap<String, TrafficCounts> {
    let mut by_url: BTreeMap<String, TrafficCounts> = BTreeMap::new();
    for row in rows {
        let Some(url) = row.get("path") else {
            continue;
        };
        let pageviews = row
            .get("pageviews")
            .and_then(|v| v.parse::<f64>().ok())
            .map_or(0, |v| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = v.max(0.0) as u64;
                n
            });
        let counts = by_url.entry(url.clone()).or_default();
        match row.get("trf_type").map(String::as_str) {
            Some("paid") => counts.paid = counts.paid.saturating_add(pageviews),
            Some("earned") => counts.earned = counts.earned.saturating_add(pageviews),
            Some("owned") => counts.owned = counts.owned.saturating_add(pageviews),
            _ => {}
        }
    }
    by_url
}

/// Classifies every URL, busiest first.
#[must_use]
pub fn classify_urls(counts: &BTreeMap<String, TrafficCounts>, threshold: f64) -> Vec<UrlTraffic> {
    let mut out: Vec<UrlTraffic> = counts
        .iter()
        .map(|(url, c)| {
            let total = c.total();
            UrlTraffic {
                url: url.clone(),
                pageviews: total,
                paid_percentage: percentage(c.paid, total),
                earned_percentage: percentage(c.earned, total),
                owned_percentage: percentage(c.owned, total),
                predominant_traffic: classify(c, threshold),
            }
        })
        .collect();
    out.sort_by(|a, b| b.pageviews.cmp(&a.pageviews).then_with(|| a.url.cmp(&b.url)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(paid: u64, earned: u64, owned: u64) -> TrafficCounts {
        TrafficCounts { paid, earned, owned }
    }

    #[test]
    fn threshold_defaults_and_bounds() {
        assert_eq!(parse_threshold(None), Ok(DEFAULT_THRESHOLD));
        assert_eq!(parse_threshold(Some("100")), Ok(100.0));
        assert!(parse_threshold(Some("0")).is_err());
        assert!(parse_threshold(Some("100.5")).is_err());
        assert!(parse_threshold(Some("lots")).is_err());
    }

    #[test]
    fn classifies_by_share() {
        assert_eq!(classify(&counts(80, 20, 0), 80.0), PredominantType::Paid);
        assert_eq!(classify(&counts(79, 21, 0), 80.0), PredominantType::Mixed);
        assert_eq!(classify(&counts(0, 0, 5), 80.0), PredominantType::Owned);
        assert_eq!(classify(&counts(0, 0, 0), 80.0), PredominantType::Unknown);
    }

    #[test]
    fn huge_pageviews_saturate() {
        let c = counts(u64::MAX, u64::MAX, 1);
        assert_eq!(c.total(), u64::MAX);
        assert_eq!(classify(&counts(u64::MAX, 1, 0), 80.0), PredominantType::Paid);

        let row = |trf: &str| -> Row {
            [("path", "/"), ("trf_type", trf), ("pageviews", "1e30")]
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect()
        };
        let by_url = aggregate_rows(&[row("paid"), row("paid"), row("earned")]);
        assert_eq!(by_url["/"].paid, u64::MAX);
        assert_eq!(classify_urls(&by_url, 80.0)[0].pageviews, u64::MAX);
    }

    #[test]
    fn ties_prefer_paid_then_earned() {
        assert_eq!(classify(&counts(50, 50, 0), 50.0), PredominantType::Paid);
        assert_eq!(classify(&counts(0, 50, 50), 50.0), PredominantType::Earned);
    }

    #[test]
    fn aggregates_rows_per_url() {
        let rows: Vec<Row> = vec![
            [("path", "/a"), ("trf_type", "paid"), ("pageviews", "10")],
            [("path", "/a"), ("trf_type", "owned"), ("pageviews", "5.0")],
            [("path", "/a"), ("trf_type", "direct"), ("pageviews", "99")],
            [("path", "/b"), ("trf_type", "earned"), ("pageviews", "")],
        ]
        .into_iter()
        .map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .collect();

        let by_url = aggregate_rows(&rows);
        assert_eq!(by_url["/a"], counts(10, 0, 5));
        assert_eq!(by_url["/b"], counts(0, 0, 0));

        let classified = classify_urls(&by_url, 60.0);
        assert_eq!(classified[0].url, "/a");
        assert_eq!(classified[0].predominant_traffic, PredominantType::Paid);
        assert!((classified[0].paid_percentage - 66.67).abs() < f64::EPSILON);
        assert_eq!(classified[1].predominant_traffic, PredominantType::Unknown);
    }
}
