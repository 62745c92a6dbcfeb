//! Handler for Slack interactive components.
//!
//! - `block_actions`: the onboarding button opens the LLMO modal
//! - `view_submission`: the LLMO modal is validated and the site onboarded

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use super::helpers::{ok_empty, ok_slack};
use super::parsing::{v_array, v_str};
use crate::aws::messages::SlackContext;
use crate::context::AppContext;
use crate::slack::modal_builder::{
    ONBOARD_LLMO_CALLBACK_ID, OPEN_ONBOARD_LLMO_ACTION, OnboardMetadata, build_onboard_llmo_modal,
    onboard_metadata, validate_onboard_submission,
};
use crate::slack::onboarding::{confirmation_text, onboard_llmo};
use crate::slack::response_builder::{create_modal_clear_payload, create_modal_errors_payload};

/// `views.open` must happen within the three seconds a trigger id is valid.
const OPEN_MODAL_TIMEOUT: Duration = Duration::from_millis(2500);

async fn open_onboard_modal(app: &AppContext, payload: &Value, action: &Value) -> Value {
    let Some(trigger_id) = v_str(payload, &["trigger_id"]) else {
        warn!("block_actions without trigger_id");
        return ok_empty();
    };
    let metadata = OnboardMetadata {
        channel_id: v_str(payload, &["channel", "id"]).unwrap_or("").to_string(),
        thread_ts: v_str(payload, &["message", "thread_ts"])
            .or_else(|| v_str(payload, &["message", "ts"]))
            .map(ToString::to_string),
    };
    let view = build_onboard_llmo_modal(v_str(action, &["value"]), &metadata);

    match tokio::time::timeout(OPEN_MODAL_TIMEOUT, app.slack.open_modal(trigger_id, &view)).await {
        Ok(Ok(())) => info!("Opened LLMO onboarding modal"),
        Ok(Err(e)) => error!("Failed to open modal: {}", e),
        Err(_) => error!("Timed out opening modal"),
    }
    ok_empty()
}

async fn handle_block_actions(app: &AppContext, payload: &Value) -> Value {
    let Some(actions) = v_array(payload, &["actions"]) else {
        return ok_empty();
    };
    for action in actions {
        if v_str(action, &["action_id"]) == Some(OPEN_ONBOARD_LLMO_ACTION) {
            return open_onboard_modal(app, payload, action).await;
        }
    }
    ok_empty()
}

async fn handle_onboard_submission(app: &AppContext, view: &Value) -> Value {
    let request = match validate_onboard_submission(view) {
        Ok(request) => request,
        Err(errors) => return ok_slack(&create_modal_errors_payload(&errors)),
    };

    let metadata = onboard_metadata(view).filter(|m| !m.channel_id.is_empty());
    let slack = metadata.as_ref().map(|m| SlackContext {
        channel_id: m.channel_id.clone(),
        thread_ts: m.thread_ts.clone(),
    });

    let reply = match onboard_llmo(app, &request, slack.as_ref()).await {
        Ok(site) => confirmation_text(&site),
        Err(e) => {
            error!(base_url = %request.base_url, error = %e, "LLMO onboarding failed");
            format!(
                ":x: Onboarding {} to LLMO failed: {}",
                request.base_url,
                e.public_message()
            )
        }
    };

    if let Some(meta) = &metadata {
        if let Err(e) = app
            .slack
            .post_message(&meta.channel_id, meta.thread_ts.as_deref(), &reply, None)
            .await
        {
            error!("Failed to post onboarding result: {}", e);
        }
    }

    ok_slack(&create_modal_clear_payload())
}

pub async fn handle_interactive(app: &AppContext, payload: &Value) -> Value {
    match v_str(payload, &["type"]) {
        Some("block_actions") => handle_block_actions(app, payload).await,
        Some("view_submission") => {
            let view = payload.get("view").unwrap_or(&Value::Null);
            if v_str(view, &["callback_id"]) == Some(ONBOARD_LLMO_CALLBACK_ID) {
                handle_onboard_submission(app, view).await
            } else {
                ok_empty()
            }
        }
        other => {
            info!(interactive_type = ?other, "Ignoring interactive payload");
            ok_empty()
        }
    }
}
