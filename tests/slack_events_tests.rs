mod common;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Value, json};
use spacecat::api::handle_request;
use spacecat::data_access::DataAccess;

use common::{AUDIT_QUEUE, TestApp, body, slack_event, status};

fn interactive_body(payload: &Value) -> String {
    format!(
        "payload={}",
        utf8_percent_encode(&payload.to_string(), NON_ALPHANUMERIC)
    )
}

fn submission(values: Value, metadata: &str) -> Value {
    json!({
        "type": "view_submission",
        "view": {
            "callback_id": "onboard_llmo_modal",
            "private_metadata": metadata,
            "state": { "values": values }
        }
    })
}

fn text_value(value: &str) -> Value {
    json!({ "value": { "type": "plain_text_input", "value": value } })
}

#[tokio::test]
async fn test_rejects_unsigned_and_badly_signed_requests() {
    let t = TestApp::new();

    let mut event = slack_event("/slack/events", r#"{"type":"url_verification"}"#);
    event["headers"]
        .as_object_mut()
        .unwrap()
        .remove("X-Slack-Signature");
    let response = handle_request(&t.app, &event).await;
    assert_eq!(status(&response), 401);
    assert_eq!(body(&response)["message"], "Missing X-Slack-Signature header");

    let mut event = slack_event("/slack/events", r#"{"type":"url_verification"}"#);
    event["body"] = json!(r#"{"type":"url_verification","challenge":"tampered"}"#);
    let response = handle_request(&t.app, &event).await;
    assert_eq!(status(&response), 401);
    assert_eq!(body(&response)["message"], "Invalid Slack signature");
}

#[tokio::test]
async fn test_url_verification_echoes_challenge() {
    let t = TestApp::new();
    let event = slack_event(
        "/slack/events",
        r#"{"type":"url_verification","challenge":"3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"}"#,
    );

    let response = handle_request(&t.app, &event).await;
    assert_eq!(status(&response), 200);
    assert_eq!(
        body(&response)["challenge"],
        "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"
    );
}

#[tokio::test]
async fn test_retries_are_acknowledged_without_processing() {
    let t = TestApp::new();
    let payload = json!({
        "type": "event_callback",
        "event": { "type": "app_mention", "channel": "C1", "ts": "1.1", "text": "<@U0BOT> help" }
    });
    let mut event = slack_event("/slack/events", &payload.to_string());
    event["headers"]["X-Slack-Retry-Num"] = json!("1");

    let response = handle_request(&t.app, &event).await;
    assert_eq!(status(&response), 200);
    assert!(t.slack.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_app_mention_replies_in_thread() {
    let t = TestApp::new();
    let payload = json!({
        "type": "event_callback",
        "event": {
            "type": "app_mention",
            "channel": "C42",
            "user": "U7",
            "ts": "1700000001.000200",
            "text": "<@U0BOT> help"
        }
    });

    let response = handle_request(&t.app, &slack_event("/slack/events", &payload.to_string())).await;
    assert_eq!(status(&response), 200);

    let posted = t.slack.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel_id, "C42");
    assert_eq!(posted[0].thread_ts.as_deref(), Some("1700000001.000200"));
    assert!(posted[0].text.starts_with("*Here are the commands I understand:*"));
}

#[tokio::test]
async fn test_bot_messages_are_ignored() {
    let t = TestApp::new();
    let payload = json!({
        "type": "event_callback",
        "event": { "type": "app_mention", "channel": "C1", "ts": "1.1", "bot_id": "B1", "text": "help" }
    });

    let response = handle_request(&t.app, &slack_event("/slack/events", &payload.to_string())).await;
    assert_eq!(status(&response), 200);
    assert!(t.slack.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_onboard_button_opens_modal() {
    let t = TestApp::new();
    let payload = json!({
        "type": "block_actions",
        "trigger_id": "trigger-1",
        "channel": { "id": "C9" },
        "message": { "ts": "1700000002.000300" },
        "actions": [{ "action_id": "open_onboard_llmo_modal", "value": "https://www.acme.com" }]
    });

    let response = handle_request(
        &t.app,
        &slack_event("/slack/actions", &interactive_body(&payload)),
    )
    .await;
    assert_eq!(status(&response), 200);

    let modals = t.slack.modals.lock().unwrap().clone();
    assert_eq!(modals.len(), 1);
    let (trigger_id, view) = &modals[0];
    assert_eq!(trigger_id, "trigger-1");
    assert_eq!(view["callback_id"], "onboard_llmo_modal");
    assert_eq!(view["blocks"][0]["element"]["initial_value"], "https://www.acme.com");

    let metadata: Value = serde_json::from_str(view["private_metadata"].as_str().unwrap()).unwrap();
    assert_eq!(metadata["channelId"], "C9");
    assert_eq!(metadata["threadTs"], "1700000002.000300");
}

#[tokio::test]
async fn test_invalid_submission_keeps_modal_open() {
    let t = TestApp::new();
    let payload = submission(
        json!({
            "base_url": text_value("not a url"),
            "ims_org_id": text_value("acme@adobeorg")
        }),
        "",
    );

    let response = handle_request(
        &t.app,
        &slack_event("/slack/actions", &interactive_body(&payload)),
    )
    .await;
    assert_eq!(status(&response), 200);

    let answer = body(&response);
    assert_eq!(answer["response_action"], "errors");
    assert_eq!(answer["errors"]["base_url"], "Please enter a valid URL");
    assert_eq!(answer["errors"]["brand_name"], "Brand name is required");
    assert_eq!(
        answer["errors"]["ims_org_id"],
        "IMS org ID must look like ABC123@AdobeOrg"
    );
    assert!(t.queue.messages_for(AUDIT_QUEUE).is_empty());
}

#[tokio::test]
async fn test_valid_submission_onboards_site() {
    let t = TestApp::new();
    let payload = submission(
        json!({
            "base_url": json!({ "value": { "type": "url_text_input", "value": "https://WWW.Acme.com/" } }),
            "brand_name": text_value("Acme"),
            "ims_org_id": text_value("ACME123@AdobeOrg"),
            "delivery_type": json!({
                "value": { "type": "static_select", "selected_option": { "value": "aem_cs" } }
            }),
            "competitors": text_value("globex.com, initech.com\numbrella.com")
        }),
        r#"{"channelId":"C9","threadTs":"1700000002.000300"}"#,
    );

    let response = handle_request(
        &t.app,
        &slack_event("/slack/actions", &interactive_body(&payload)),
    )
    .await;
    assert_eq!(status(&response), 200);
    assert_eq!(body(&response)["response_action"], "clear");

    let site = t
        .data
        .site_by_base_url("https://www.acme.com")
        .await
        .unwrap()
        .expect("site created");
    let llmo = site.config.llmo.clone().unwrap();
    assert_eq!(llmo.data_folder, "acme-com");
    assert_eq!(llmo.brand, "Acme");
    assert_eq!(llmo.competitors, vec!["globex.com", "initech.com", "umbrella.com"]);

    let org = t
        .data
        .organization_by_ims_org_id("ACME123@AdobeOrg")
        .await
        .unwrap()
        .expect("organization created");
    assert_eq!(site.organization_id.as_deref(), Some(org.id.as_str()));

    let configuration = t.data.latest_configuration().await.unwrap();
    assert!(configuration.is_handler_enabled_for_site("llmo-customer-analysis", &site.id));
    assert!(configuration.is_handler_enabled_for_site("geo-brand-presence", &site.id));

    let audits = t.queue.messages_for(AUDIT_QUEUE);
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0]["type"], "llmo-customer-analysis");
    assert_eq!(audits[0]["siteId"], site.id);
    assert_eq!(audits[0]["auditContext"]["slackContext"]["channelId"], "C9");

    let posted = t.slack.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].channel_id, "C9");
    assert_eq!(posted[0].thread_ts.as_deref(), Some("1700000002.000300"));
    assert!(posted[0].text.contains("is onboarded to LLMO"));
}
