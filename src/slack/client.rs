//! Slack Web API access used by the bot.
//!
//! Plain text messages go through slack-morphism; Block Kit payloads and
//! `views.open` are posted as raw JSON since their blocks are built with `json!`.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{Value, json};
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::SlackApiChatPostMessageRequest;
use slack_morphism::{SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackMessageContent, SlackTs};
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::{debug, warn};

use crate::errors::SpaceCatError;

const SLACK_API_BASE: &str = "https://slack.com/api";

// Connector construction can fail (no TLS roots); surface that at call sites
// instead of panicking at startup.
static SLACK_CLIENT: Lazy<Option<SlackHyperClient>> =
    Lazy::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// What commands and interaction handlers need from Slack.
#[async_trait]
pub trait SlackMessenger: Send + Sync {
    /// Posts into `channel_id`, threaded under `thread_ts` when given.
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
        blocks: Option<&Value>,
    ) -> Result<(), SpaceCatError>;

    async fn open_modal(&self, trigger_id: &str, view: &Value) -> Result<(), SpaceCatError>;
}

/// Builds the `chat.postMessage` body for a Block Kit message.
#[must_use]
pub fn build_post_message_payload(
    channel_id: &str,
    thread_ts: Option<&str>,
    text: &str,
    blocks: &Value,
) -> Value {
    let mut payload = json!({
        "channel": channel_id,
        "text": text,
        "blocks": blocks,
    });
    if let Some(ts) = thread_ts {
        payload["thread_ts"] = Value::String(ts.to_string());
    }
    payload
}

/// Checks the `ok` flag of a Web API response.
///
/// # Errors
///
/// Returns the Slack error code when `ok` is not `true`.
pub fn check_api_response(method: &str, body: &Value) -> Result<(), SpaceCatError> {
    if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    Err(SpaceCatError::SlackApi(format!(
        "{method} error: {}",
        body.get("error").and_then(Value::as_str).unwrap_or("unknown")
    )))
}

pub struct SlackClient {
    token: SlackApiToken,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
        }
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, SpaceCatError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, SpaceCatError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(5);

        Retry::start(strategy, operation).await
    }

    async fn post_json(&self, method: &str, payload: &Value) -> Result<(), SpaceCatError> {
        let resp = HTTP_CLIENT
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(&self.token.token_value.0)
            .json(payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SpaceCatError::SlackApi(format!(
                "{method} HTTP {}",
                resp.status()
            )));
        }

        let body: Value = resp.json().await?;
        check_api_response(method, &body)
    }
}

#[async_trait]
impl SlackMessenger for SlackClient {
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        text: &str,
        blocks: Option<&Value>,
    ) -> Result<(), SpaceCatError> {
        if let Some(blocks) = blocks {
            let payload = build_post_message_payload(channel_id, thread_ts, text, blocks);
            return self
                .with_retry(|| async { self.post_json("chat.postMessage", &payload).await })
                .await;
        }

        self.with_retry(|| async {
            let session = SLACK_CLIENT
                .as_ref()
                .ok_or_else(|| {
                    SpaceCatError::SlackApi("Slack HTTP connector not initialized".to_string())
                })?
                .open_session(&self.token);

            let mut request = SlackApiChatPostMessageRequest::new(
                SlackChannelId(channel_id.to_string()),
                SlackMessageContent::new().with_text(text.to_string()),
            );
            if let Some(ts) = thread_ts {
                request = request.with_thread_ts(SlackTs(ts.to_string()));
            }

            session.chat_post_message(&request).await?;
            debug!(channel_id = %channel_id, "Posted Slack message");
            Ok(())
        })
        .await
    }

    // Trigger ids expire after three seconds, so no retry here.
    async fn open_modal(&self, trigger_id: &str, view: &Value) -> Result<(), SpaceCatError> {
        let payload = json!({
            "trigger_id": trigger_id,
            "view": view
        });
        self.post_json("views.open", &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threads_block_messages_when_requested() {
        let blocks = json!([{ "type": "divider" }]);
        let top = build_post_message_payload("C1", None, "hi", &blocks);
        assert!(top.get("thread_ts").is_none());

        let threaded = build_post_message_payload("C1", Some("1.2"), "hi", &blocks);
        assert_eq!(threaded["thread_ts"], "1.2");
        assert_eq!(threaded["blocks"], blocks);
    }

    #[test]
    fn surfaces_slack_error_codes() {
        assert!(check_api_response("views.open", &json!({ "ok": true })).is_ok());
        let err = check_api_response("views.open", &json!({ "ok": false, "error": "expired_trigger_id" }))
            .unwrap_err();
        assert!(err.to_string().contains("expired_trigger_id"));
    }
}
