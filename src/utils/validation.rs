//! Input validation and URL helpers shared by controllers and Slack commands.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use uuid::Uuid;

#[must_use]
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[must_use]
pub fn is_valid_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// Accepts absolute `http` and `https` URLs with a host.
#[must_use]
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("static regex compile")
    });
    EMAIL_RE.is_match(value)
}

#[must_use]
pub fn is_valid_ims_org_id(value: &str) -> bool {
    static IMS_ORG_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Z0-9]+@AdobeOrg$").expect("static regex compile"));
    IMS_ORG_RE.is_match(value)
}

/// `YYYY-MM-DD`
#[must_use]
pub fn is_valid_date(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Canonical form of a site base URL: lowercased scheme and host, no path
/// trailing slash, no query or fragment.
///
/// Inputs without a scheme are treated as `https`.
pub fn normalize_base_url(input: &str) -> Result<String, String> {
    let trimmed = input.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| format!("Invalid URL {input}: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("Invalid URL {input}: unsupported scheme"));
    }
    let host = url
        .host_str()
        .ok_or_else(|| format!("Invalid URL {input}: missing host"))?;

    let mut out = format!("{}://{}", url.scheme(), host.to_lowercase());
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    let path = url.path().trim_end_matches('/');
    out.push_str(path);
    Ok(out)
}

/// `scheme://host[:port]` of a URL.
#[must_use]
pub fn origin_of(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;
    let mut out = format!("{}://{}", url.scheme(), host.to_lowercase());
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    Some(out)
}

#[must_use]
pub fn hostname_of(input: &str) -> Option<String> {
    Url::parse(input)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

/// Folder name used for a site's LLMO data: hostname without `www.`, dots
/// replaced by dashes.
#[must_use]
pub fn llmo_data_folder(base_url: &str) -> Option<String> {
    let host = hostname_of(base_url)?;
    let host = host.strip_prefix("www.").unwrap_or(&host);
    Some(host.replace('.', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_base_urls() {
        assert_eq!(
            normalize_base_url("HTTPS://WWW.Example.com/").unwrap(),
            "https://www.example.com"
        );
        assert_eq!(
            normalize_base_url("example.com/en/").unwrap(),
            "https://example.com/en"
        );
        assert_eq!(
            normalize_base_url("http://example.com:8080/?q=1#x").unwrap(),
            "http://example.com:8080"
        );
        assert!(normalize_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn validates_inputs() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("mailto:someone@example.com"));
        assert!(is_valid_email("jane.doe+test@example.co.uk"));
        assert!(!is_valid_email("jane.doe@"));
        assert!(is_valid_ims_org_id("ABC123DEF456@AdobeOrg"));
        assert!(!is_valid_ims_org_id("abc@AdobeOrg"));
        assert!(is_valid_date("2025-01-31"));
        assert!(!is_valid_date("2025-02-30"));
        assert!(is_valid_uuid("7f4a4c5e-0e3a-4f0b-9a53-1c3a1f0e9d11"));
        assert!(!is_valid_uuid("not-a-uuid"));
    }

    #[test]
    fn derives_llmo_data_folder() {
        assert_eq!(
            llmo_data_folder("https://www.adobe.com").as_deref(),
            Some("adobe-com")
        );
        assert_eq!(
            llmo_data_folder("https://business.adobe.com/uk").as_deref(),
            Some("business-adobe-com")
        );
    }
}
