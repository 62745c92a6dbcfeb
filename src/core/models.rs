//! Records owned by the data-access layer.
//!
//! The service only reads and writes these through [`crate::data_access::DataAccess`];
//! their JSON shape is the public API shape (camelCase).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    AemEdge,
    AemCs,
    Other,
}

impl DeliveryType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::AemEdge => "aem_edge",
            DeliveryType::AemCs => "aem_cs",
            DeliveryType::Other => "other",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aem_edge" => Ok(DeliveryType::AemEdge),
            "aem_cs" => Ok(DeliveryType::AemCs),
            "other" => Ok(DeliveryType::Other),
            _ => Err(format!(
                "Invalid delivery type: {s}. Must be one of aem_edge, aem_cs, other"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub ims_org_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManualOverwrite {
    #[serde(rename = "brokenTargetURL")]
    pub broken_target_url: String,
    #[serde(rename = "targetURL")]
    pub target_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupedUrl {
    pub name: String,
    pub pattern: String,
}

/// Per audit type settings stored on a site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandlerConfig {
    #[serde(rename = "excludedURLs", default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_overwrites: Vec<ManualOverwrite>,
    #[serde(rename = "groupedURLs", default, skip_serializing_if = "Vec::is_empty")]
    pub grouped_urls: Vec<GroupedUrl>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LlmoConfig {
    pub data_folder: String,
    pub brand: String,
    #[serde(default)]
    pub competitors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llmo: Option<LlmoConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub name: Option<String>,
    pub delivery_type: DeliveryType,
    pub organization_id: Option<String>,
    pub is_live: bool,
    #[serde(rename = "gitHubURL")]
    pub git_hub_url: Option<String>,
    #[serde(default)]
    pub config: SiteConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a site; ids and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub base_url: String,
    pub delivery_type: DeliveryType,
    pub organization_id: Option<String>,
    pub is_live: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: String,
    pub site_id: String,
    pub audit_type: String,
    pub audited_at: DateTime<Utc>,
    pub full_audit_ref: String,
    pub is_live: bool,
    pub is_error: bool,
    pub audit_result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteTopPage {
    pub site_id: String,
    pub url: String,
    pub traffic: u64,
    pub source: String,
    pub geo: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrialUserStatus {
    Invited,
    Registered,
    Blocked,
    Deleted,
}

impl TrialUserStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialUserStatus::Invited => "INVITED",
            TrialUserStatus::Registered => "REGISTERED",
            TrialUserStatus::Blocked => "BLOCKED",
            TrialUserStatus::Deleted => "DELETED",
        }
    }
}

impl FromStr for TrialUserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVITED" => Ok(TrialUserStatus::Invited),
            "REGISTERED" => Ok(TrialUserStatus::Registered),
            "BLOCKED" => Ok(TrialUserStatus::Blocked),
            "DELETED" => Ok(TrialUserStatus::Deleted),
            _ => Err(format!("Unknown trial user status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrialUser {
    pub id: String,
    pub organization_id: String,
    pub email_id: String,
    pub status: TrialUserStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Unknown job status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AsyncJob {
    pub id: String,
    pub status: JobStatus,
    pub job_type: String,
    pub metadata: Value,
    pub result: Option<Value>,
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Which sites a given audit (handler) runs for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditToggle {
    #[serde(default)]
    pub enabled_by_default: bool,
    #[serde(default)]
    pub enabled_sites: BTreeSet<String>,
    #[serde(default)]
    pub disabled_sites: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub version: u32,
    #[serde(default, alias = "handlers")]
    pub enabled_audits: BTreeMap<String, AuditToggle>,
}

impl Configuration {
    /// Whether `audit_type` runs for `site_id`. Unknown audit types are disabled.
    #[must_use]
    pub fn is_handler_enabled_for_site(&self, audit_type: &str, site_id: &str) -> bool {
        let Some(toggle) = self.enabled_audits.get(audit_type) else {
            return false;
        };
        if toggle.enabled_sites.contains(site_id) {
            return true;
        }
        if toggle.disabled_sites.contains(site_id) {
            return false;
        }
        toggle.enabled_by_default
    }

    pub fn enable_handler_for_site(&mut self, audit_type: &str, site_id: &str) {
        let toggle = self.enabled_audits.entry(audit_type.to_string()).or_default();
        toggle.disabled_sites.remove(site_id);
        if !toggle.enabled_by_default {
            toggle.enabled_sites.insert(site_id.to_string());
        }
    }

    pub fn disable_handler_for_site(&mut self, audit_type: &str, site_id: &str) {
        let toggle = self.enabled_audits.entry(audit_type.to_string()).or_default();
        toggle.enabled_sites.remove(site_id);
        if toggle.enabled_by_default {
            toggle.disabled_sites.insert(site_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn configuration_serializes_enabled_audits() {
        let mut configuration = Configuration::default();
        configuration.enable_handler_for_site("cwv", "site-1");

        let value = serde_json::to_value(&configuration).unwrap();
        assert_eq!(value["enabledAudits"]["cwv"]["enabledSites"], json!(["site-1"]));
        assert!(value.get("handlers").is_none());

        let legacy: Configuration = serde_json::from_value(json!({
            "version": 3,
            "handlers": { "cwv": { "enabledByDefault": true } }
        }))
        .unwrap();
        assert!(legacy.is_handler_enabled_for_site("cwv", "any-site"));
    }
}
