//! Message contracts consumed by the audit, import and scrape workers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a worker should report progress back to in Slack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlackContext {
    pub channel_id: String,
    pub thread_ts: Option<String>,
}

/// `{ type, siteId, auditContext }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditMessage {
    #[serde(rename = "type")]
    pub audit_type: String,
    pub site_id: String,
    pub audit_context: Map<String, Value>,
}

impl AuditMessage {
    #[must_use]
    pub fn new(audit_type: &str, site_id: &str) -> Self {
        Self {
            audit_type: audit_type.to_string(),
            site_id: site_id.to_string(),
            audit_context: Map::new(),
        }
    }

    #[must_use]
    pub fn with_slack_context(mut self, slack: Option<&SlackContext>) -> Self {
        if let Some(ctx) = slack.and_then(|s| serde_json::to_value(s).ok()) {
            self.audit_context.insert("slackContext".to_string(), ctx);
        }
        self
    }

    #[must_use]
    pub fn with_context_value(mut self, key: &str, value: Value) -> Self {
        self.audit_context.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportMessage {
    #[serde(rename = "type")]
    pub import_type: String,
    pub site_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub audit_context: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_context: Option<SlackContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeMessage {
    pub job_id: String,
    pub processing_type: String,
    pub urls: Vec<ScrapeUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_context: Option<SlackContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PreflightMessage {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audit_message_wire_shape() {
        let ctx = SlackContext {
            channel_id: "C1".into(),
            thread_ts: Some("123.456".into()),
        };
        let msg = AuditMessage::new("cwv", "site-1").with_slack_context(Some(&ctx));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "cwv",
                "siteId": "site-1",
                "auditContext": { "slackContext": { "channelId": "C1", "threadTs": "123.456" } }
            })
        );
    }

    #[test]
    fn import_message_omits_empty_fields() {
        let msg = ImportMessage {
            import_type: "top-pages".into(),
            site_id: "site-1".into(),
            start_date: None,
            end_date: None,
            audit_context: Map::new(),
            slack_context: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "top-pages", "siteId": "site-1" })
        );
    }
}
