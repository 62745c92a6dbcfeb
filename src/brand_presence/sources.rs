//! Normalization and classification of the URLs cited in AI answers.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Hosts treated as social platforms. Subdomains match too.
pub const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "pinterest.com",
    "reddit.com",
    "threads.net",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "youtube.com",
    "youtu.be",
    "quora.com",
    "medium.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Owned,
    Competitor,
    Social,
    Earned,
}

impl SourceType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Owned => "owned",
            SourceType::Competitor => "competitor",
            SourceType::Social => "social",
            SourceType::Earned => "earned",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    /// Original input, trimmed.
    pub url: String,
    /// `host/path` without scheme, `www.`, query, fragment or trailing slash.
    pub normalized: String,
    pub hostname: String,
}

/// Strips a leading `www.` and lowercases.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    let lower = domain.trim().trim_end_matches('.').to_lowercase();
    let lower = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower)
        .to_string();
    let host = lower.split('/').next().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Normalizes a cited URL. Bare hosts (`example.com/page`) are accepted.
///
/// Returns `None` for empty input, non-HTTP schemes and hosts without a dot.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<NormalizedUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_lowercase();
    if !host.contains('.') {
        return None;
    }
    let hostname = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let path = parsed.path().trim_end_matches('/');

    Some(NormalizedUrl {
        url: trimmed.to_string(),
        normalized: format!("{hostname}{path}"),
        hostname,
    })
}

fn host_matches(hostname: &str, domain: &str) -> bool {
    !domain.is_empty()
        && (hostname == domain
            || hostname
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.')))
}

/// Decides how a cited source relates to the brand.
///
/// Order matters: a site's own domain wins over a competitor listing it,
/// and competitors win over the social list.
#[derive(Debug, Clone)]
pub struct SourceClassifier {
    site_domain: String,
    competitor_domains: Vec<String>,
}

impl SourceClassifier {
    #[must_use]
    pub fn new(site_base_url: &str, competitors: &[String]) -> Self {
        Self {
            site_domain: normalize_domain(site_base_url),
            competitor_domains: competitors
                .iter()
                .map(|c| normalize_domain(c))
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn classify_host(&self, hostname: &str) -> SourceType {
        if host_matches(hostname, &self.site_domain) {
            return SourceType::Owned;
        }
        if self
            .competitor_domains
            .iter()
            .any(|d| host_matches(hostname, d))
        {
            return SourceType::Competitor;
        }
        if SOCIAL_DOMAINS.iter().any(|d| host_matches(hostname, d)) {
            return SourceType::Social;
        }
        SourceType::Earned
    }

    #[must_use]
    pub fn classify(&self, url: &NormalizedUrl) -> SourceType {
        self.classify_host(&url.hostname)
    }
}

/// Splits a sources cell (separated by `;`, `,`, or newlines) into URLs.
#[must_use]
pub fn split_sources(cell: &str) -> Vec<&str> {
    cell.split(|c| c == ';' || c == '\n' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
