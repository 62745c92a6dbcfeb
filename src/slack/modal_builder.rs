use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::models::DeliveryType;
use crate::utils::validation::{is_valid_ims_org_id, normalize_base_url};

pub const OPEN_ONBOARD_LLMO_ACTION: &str = "open_onboard_llmo_modal";
pub const ONBOARD_LLMO_CALLBACK_ID: &str = "onboard_llmo_modal";

/// Carried through `private_metadata` so the submission can answer in the
/// conversation the onboarding started from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnboardMetadata {
    pub channel_id: String,
    pub thread_ts: Option<String>,
}

/// A validated onboarding form.
#[derive(Debug, Clone, PartialEq)]
pub struct OnboardRequest {
    pub base_url: String,
    pub brand_name: String,
    pub ims_org_id: String,
    pub delivery_type: DeliveryType,
    pub competitors: Vec<String>,
}

fn delivery_option(value: DeliveryType, label: &str) -> Value {
    json!({ "text": { "type": "plain_text", "text": label }, "value": value.as_str() })
}

/// Build the LLMO onboarding modal.
#[must_use]
pub fn build_onboard_llmo_modal(base_url: Option<&str>, metadata: &OnboardMetadata) -> Value {
    let mut base_url_element = json!({
        "type": "url_text_input",
        "action_id": "value",
        "placeholder": { "type": "plain_text", "text": "https://www.example.com" }
    });
    if let Some(url) = base_url.filter(|u| !u.is_empty()) {
        base_url_element["initial_value"] = Value::String(url.to_string());
    }

    let default_delivery = delivery_option(DeliveryType::AemEdge, "AEM Edge Delivery");

    json!({
        "type": "modal",
        "callback_id": ONBOARD_LLMO_CALLBACK_ID,
        "private_metadata": serde_json::to_string(metadata).unwrap_or_default(),
        "title": { "type": "plain_text", "text": "Onboard LLMO" },
        "submit": { "type": "plain_text", "text": "Onboard" },
        "close": { "type": "plain_text", "text": "Cancel" },
        "blocks": [
            {
                "type": "input",
                "block_id": "base_url",
                "label": { "type": "plain_text", "text": "Site URL" },
                "element": base_url_element
            },
            {
                "type": "input",
                "block_id": "brand_name",
                "label": { "type": "plain_text", "text": "Brand name" },
                "element": { "type": "plain_text_input", "action_id": "value" }
            },
            {
                "type": "input",
                "block_id": "ims_org_id",
                "label": { "type": "plain_text", "text": "IMS organization ID" },
                "hint": { "type": "plain_text", "text": "Looks like ABC123@AdobeOrg" },
                "element": { "type": "plain_text_input", "action_id": "value" }
            },
            {
                "type": "input",
                "block_id": "delivery_type",
                "label": { "type": "plain_text", "text": "Delivery type" },
                "element": {
                    "type": "static_select",
                    "action_id": "value",
                    "initial_option": default_delivery,
                    "options": [
                        default_delivery,
                        delivery_option(DeliveryType::AemCs, "AEM Cloud Service"),
                        delivery_option(DeliveryType::Other, "Other")
                    ]
                }
            },
            {
                "type": "input",
                "block_id": "competitors",
                "optional": true,
                "label": { "type": "plain_text", "text": "Competitor domains" },
                "hint": { "type": "plain_text", "text": "Comma or newline separated" },
                "element": { "type": "plain_text_input", "action_id": "value", "multiline": true }
            }
        ]
    })
}

fn input_value<'a>(values: &'a Map<String, Value>, block_id: &str) -> Option<&'a str> {
    let element = values.get(block_id)?.get("value")?;
    element
        .get("value")
        .and_then(Value::as_str)
        .or_else(|| {
            element
                .get("selected_option")
                .and_then(|o| o.get("value"))
                .and_then(Value::as_str)
        })
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Validates an onboarding `view_submission`.
///
/// # Errors
///
/// Returns a map of `block_id -> error` suitable for Slack's `response_action: errors`.
pub fn validate_onboard_submission(view: &Value) -> Result<OnboardRequest, Map<String, Value>> {
    let empty = Map::new();
    let values = view
        .get("state")
        .and_then(|s| s.get("values"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut errors = Map::new();
    let mut fail = |block: &str, msg: &str| {
        errors.insert(block.to_string(), Value::String(msg.to_string()));
    };

    let base_url = match input_value(values, "base_url").map(normalize_base_url) {
        Some(Ok(url)) => Some(url),
        Some(Err(_)) => {
            fail("base_url", "Please enter a valid URL");
            None
        }
        None => {
            fail("base_url", "Site URL is required");
            None
        }
    };

    let brand_name = input_value(values, "brand_name");
    if brand_name.is_none() {
        fail("brand_name", "Brand name is required");
    }

    let ims_org_id = input_value(values, "ims_org_id");
    match ims_org_id {
        Some(id) if is_valid_ims_org_id(id) => {}
        Some(_) => fail("ims_org_id", "IMS org ID must look like ABC123@AdobeOrg"),
        None => fail("ims_org_id", "IMS org ID is required"),
    }

    let delivery_type = match input_value(values, "delivery_type").map(str::parse::<DeliveryType>) {
        Some(Ok(dt)) => Some(dt),
        None => Some(DeliveryType::AemEdge),
        Some(Err(_)) => {
            fail("delivery_type", "Please choose a delivery type");
            None
        }
    };

    let competitors = input_value(values, "competitors")
        .map(|raw| {
            raw.split([',', '\n', ';'])
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    match (base_url, brand_name, ims_org_id, delivery_type) {
        (Some(base_url), Some(brand), Some(ims), Some(delivery_type)) if errors.is_empty() => {
            Ok(OnboardRequest {
                base_url,
                brand_name: brand.to_string(),
                ims_org_id: ims.to_string(),
                delivery_type,
                competitors,
            })
        }
        _ => Err(errors),
    }
}

/// Reads the metadata attached by [`build_onboard_llmo_modal`].
#[must_use]
pub fn onboard_metadata(view: &Value) -> Option<OnboardMetadata> {
    view.get("private_metadata")
        .and_then(Value::as_str)
        .and_then(|raw| serde_json::from_str(raw).ok())
}
