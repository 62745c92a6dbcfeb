//! Handler for Slack Events API callbacks.
//!
//! - `url_verification` answers the challenge
//! - `app_mention` runs the mentioned command and replies in thread

use serde_json::Value;
use tracing::{info, warn};

use super::helpers::{ok_empty, ok_slack};
use super::parsing::v_str;
use crate::context::AppContext;
use crate::slack::response_builder::create_challenge_payload;
use crate::slack::{CommandContext, CommandRegistry};

async fn handle_app_mention(app: &AppContext, event: &Value) {
    if event.get("bot_id").is_some() {
        return;
    }
    let Some(channel_id) = v_str(event, &["channel"]) else {
        warn!("app_mention without channel");
        return;
    };
    let text = v_str(event, &["text"]).unwrap_or("");
    let thread_ts = v_str(event, &["thread_ts"]).or_else(|| v_str(event, &["ts"]));

    let ctx = CommandContext {
        app,
        channel_id: channel_id.to_string(),
        thread_ts: thread_ts.map(ToString::to_string),
        user_id: v_str(event, &["user"]).map(ToString::to_string),
    };
    CommandRegistry::with_default_commands()
        .dispatch(text, &ctx)
        .await;
}

pub async fn handle_event_callback(app: &AppContext, body: &Value) -> Value {
    match v_str(body, &["type"]) {
        Some("url_verification") => {
            let challenge = v_str(body, &["challenge"]).unwrap_or("");
            ok_slack(&create_challenge_payload(challenge))
        }
        Some("event_callback") => {
            let event = body.get("event").unwrap_or(&Value::Null);
            match v_str(event, &["type"]) {
                Some("app_mention") => handle_app_mention(app, event).await,
                other => info!(event_type = ?other, "Ignoring Slack event"),
            }
            ok_empty()
        }
        other => {
            info!(body_type = ?other, "Ignoring Slack payload");
            ok_empty()
        }
    }
}
