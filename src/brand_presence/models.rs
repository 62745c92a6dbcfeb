use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::sources::{SourceClassifier, SourceType, normalize_url, split_sources};
use crate::utils::weeks::IsoWeek;

/// A brand-presence export published on the CDN, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandPresenceFile {
    pub path: String,
    pub model: String,
    pub week: IsoWeek,
}

impl BrandPresenceFile {
    /// Parses paths like `/adobe-com/brand-presence/brandpresence-chatgpt-w07-2025.json`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        static FILE_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"brandpresence-(?P<model>[a-z0-9-]+?)-w(?P<week>\d{1,2})-(?P<year>\d{4})\.json$")
                .expect("static regex compile")
        });
        let caps = FILE_RE.captures(path)?;
        let week = caps["week"].parse::<u32>().ok()?;
        let year = caps["year"].parse::<i32>().ok()?;
        Some(Self {
            path: path.to_string(),
            model: caps["model"].to_string(),
            week: IsoWeek::new(year, week).ok()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSource {
    pub url: String,
    pub normalized_url: String,
    pub hostname: String,
    pub content_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandPresenceRecord {
    pub site_id: String,
    pub date: NaiveDate,
    pub model: String,
    pub category: String,
    pub topic: String,
    pub prompt: String,
    pub region: String,
    pub origin: String,
    pub volume: Option<i64>,
    pub mentions: bool,
    pub citations: bool,
    pub visibility_score: Option<f64>,
    pub position: Option<f64>,
    pub sentiment: Option<String>,
    pub answer: Option<String>,
    pub sources: Vec<ClassifiedSource>,
}

fn cell<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| row.get(*k)).filter(|v| !v.is_null())
}

fn cell_str(row: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match cell(row, keys)? {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn cell_f64(row: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    match cell(row, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}

fn cell_bool(row: &Map<String, Value>, keys: &[&str]) -> bool {
    match cell(row, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v > 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "y"
        ),
        _ => false,
    }
}

/// Maps one sheet row to a record. Rows without a prompt are skipped.
#[must_use]
pub fn record_from_row(
    row: &Map<String, Value>,
    site_id: &str,
    file: &BrandPresenceFile,
    classifier: &SourceClassifier,
) -> Option<BrandPresenceRecord> {
    let prompt = cell_str(row, &["Prompt", "prompt"])?;

    let date = cell_str(row, &["Execution Date", "execution_date", "Date"])
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
        .unwrap_or_else(|| file.week.monday());

    let sources = cell_str(row, &["Sources", "sources"])
        .map(|raw| {
            let mut seen = std::collections::HashSet::new();
            split_sources(&raw)
                .into_iter()
                .filter_map(normalize_url)
                .filter(|n| seen.insert(n.normalized.clone()))
                .map(|n| ClassifiedSource {
                    content_type: classifier.classify(&n),
                    url: n.url,
                    normalized_url: n.normalized,
                    hostname: n.hostname,
                })
                .collect()
        })
        .unwrap_or_default();

    #[allow(clippy::cast_possible_truncation)]
    let volume = cell_f64(row, &["Volume", "volume"]).map(|v| v.round() as i64);

    Some(BrandPresenceRecord {
        site_id: site_id.to_string(),
        date,
        model: file.model.clone(),
        category: cell_str(row, &["Category", "category"]).unwrap_or_default(),
        topic: cell_str(row, &["Topics", "Topic", "topic"]).unwrap_or_default(),
        prompt,
        region: cell_str(row, &["Region", "region"]).unwrap_or_else(|| "US".to_string()),
        origin: cell_str(row, &["Origin", "origin"])
            .map_or_else(|| "human".to_string(), |o| o.to_lowercase()),
        volume,
        mentions: cell_bool(row, &["Mentions", "mentions"]),
        citations: cell_bool(row, &["Citations", "citations"]),
        visibility_score: cell_f64(row, &["Visibility Score", "visibility_score"]),
        position: cell_f64(row, &["Position", "position"]),
        sentiment: cell_str(row, &["Sentiment", "sentiment"]),
        answer: cell_str(row, &["Answer", "answer"]),
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_file_paths() {
        let f = BrandPresenceFile::from_path("/adobe-com/brand-presence/brandpresence-ai-mode-w07-2025.json")
            .unwrap();
        assert_eq!(f.model, "ai-mode");
        assert_eq!(f.week, IsoWeek { year: 2025, week: 7 });

        assert!(BrandPresenceFile::from_path("/adobe-com/agentic-traffic/w07.json").is_none());
        assert!(BrandPresenceFile::from_path("/x/brandpresence-chatgpt-w60-2025.json").is_none());
    }

    #[test]
    fn maps_rows() {
        let file = BrandPresenceFile::from_path("brandpresence-chatgpt-w10-2025.json").unwrap();
        let classifier = SourceClassifier::new("https://adobe.com", &["canva.com".to_string()]);
        let row = json!({
            "Prompt": "best photo editor",
            "Category": "Photoshop",
            "Topics": "photo editing",
            "Region": "DE",
            "Origin": "AI",
            "Volume": "1200",
            "Mentions": "true",
            "Citations": "false",
            "Visibility Score": "42.5",
            "Position": 3,
            "Sentiment": "Positive",
            "Sources": "https://www.adobe.com/photoshop/;https://canva.com/x;https://adobe.com/photoshop"
        });
        let rec = record_from_row(row.as_object().unwrap(), "site-1", &file, &classifier).unwrap();

        assert_eq!(rec.date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(rec.origin, "ai");
        assert_eq!(rec.volume, Some(1200));
        assert!(rec.mentions);
        assert!(!rec.citations);
        assert_eq!(rec.visibility_score, Some(42.5));
        assert_eq!(rec.position, Some(3.0));
        // duplicate adobe.com/photoshop collapsed
        assert_eq!(rec.sources.len(), 2);
        assert_eq!(rec.sources[0].content_type, SourceType::Owned);
        assert_eq!(rec.sources[1].content_type, SourceType::Competitor);
    }

    #[test]
    fn skips_rows_without_prompt() {
        let file = BrandPresenceFile::from_path("brandpresence-chatgpt-w10-2025.json").unwrap();
        let classifier = SourceClassifier::new("https://adobe.com", &[]);
        let row = json!({ "Prompt": "  ", "Category": "x" });
        assert!(record_from_row(row.as_object().unwrap(), "s", &file, &classifier).is_none());
    }
}
