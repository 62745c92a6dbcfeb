//! Method + path matching with `:param` placeholders.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SlackEvents,
    SlackActions,

    GetAllSites,
    GetSitesByDeliveryType,
    GetSiteByBaseUrl,
    CreateSite,
    GetSite,
    UpdateSite,
    RemoveSite,
    GetScrapedContent,

    GetAuditsForSite,
    GetLatestAuditsForSite,
    GetAuditsForSiteByType,
    GetLatestAuditForSite,
    GetLatestAuditsByType,
    UpdateAuditConfig,

    CreatePreflightJob,
    GetPreflightJob,

    GetTrialUsers,
    InviteTrialUser,

    CreateConsentBannerJob,
    GetConsentBannerResult,

    GetPaidTraffic,
    GetPredominantTraffic,
}

impl Route {
    /// Slack routes authenticate with a request signature instead of an API key.
    #[must_use]
    pub fn is_slack(&self) -> bool {
        matches!(self, Route::SlackEvents | Route::SlackActions)
    }
}

/// First match wins, so literal segments come before placeholders at the same depth.
const ROUTES: &[(&str, &str, Route)] = &[
    ("POST", "/slack/events", Route::SlackEvents),
    ("POST", "/slack/actions", Route::SlackActions),
    ("GET", "/sites", Route::GetAllSites),
    ("POST", "/sites", Route::CreateSite),
    ("GET", "/sites/by-delivery-type/:deliveryType", Route::GetSitesByDeliveryType),
    ("GET", "/sites/by-base-url/:baseURL", Route::GetSiteByBaseUrl),
    ("GET", "/sites/:siteId", Route::GetSite),
    ("PATCH", "/sites/:siteId", Route::UpdateSite),
    ("DELETE", "/sites/:siteId", Route::RemoveSite),
    ("GET", "/sites/:siteId/scraped-content", Route::GetScrapedContent),
    ("GET", "/sites/:siteId/audits", Route::GetAuditsForSite),
    ("GET", "/sites/:siteId/audits/latest", Route::GetLatestAuditsForSite),
    ("GET", "/sites/:siteId/audits/:auditType", Route::GetAuditsForSiteByType),
    ("GET", "/sites/:siteId/latest-audit/:auditType", Route::GetLatestAuditForSite),
    ("GET", "/sites/:siteId/traffic/predominant-type", Route::GetPredominantTraffic),
    ("GET", "/sites/:siteId/traffic/paid/:dimensions", Route::GetPaidTraffic),
    ("PATCH", "/sites/:siteId/:auditType", Route::UpdateAuditConfig),
    ("GET", "/audits/latest/:auditType", Route::GetLatestAuditsByType),
    ("POST", "/preflight/jobs", Route::CreatePreflightJob),
    ("GET", "/preflight/jobs/:jobId", Route::GetPreflightJob),
    ("GET", "/organizations/:organizationId/trial-users", Route::GetTrialUsers),
    ("POST", "/organizations/:organizationId/trial-user-invite", Route::InviteTrialUser),
    ("POST", "/consent-banner", Route::CreateConsentBannerJob),
    ("GET", "/consent-banner/:jobId", Route::GetConsentBannerResult),
];

/// Decoded path parameters of a matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    /// The parameter value, empty when absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map_or("", String::as_str)
    }
}

/// Matches `path` against `pattern`, collecting `:name` segments.
#[must_use]
pub fn match_path(pattern: &str, path: &str) -> Option<Params> {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = expected.strip_prefix(':') {
            let decoded = percent_decode_str(actual).decode_utf8().ok()?;
            params.insert(name.to_string(), decoded.to_string());
        } else if expected != actual {
            return None;
        }
    }
    Some(Params(params))
}

/// The route for a request, with its parameters.
#[must_use]
pub fn find_route(method: &str, path: &str) -> Option<(Route, Params)> {
    ROUTES
        .iter()
        .filter(|(m, _, _)| m.eq_ignore_ascii_case(method))
        .find_map(|(_, pattern, route)| match_path(pattern, path).map(|p| (*route, p)))
}
