use async_trait::async_trait;
use serde_json::json;

use super::{Command, CommandContext};
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;
use crate::slack::modal_builder::OPEN_ONBOARD_LLMO_ACTION;
use crate::utils::validation::normalize_base_url;

pub struct OnboardLlmoCommand;

#[async_trait]
impl Command for OnboardLlmoCommand {
    fn id(&self) -> &'static str {
        "onboard-llmo"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["onboard-llmo", "onboard llmo"]
    }

    fn usage(&self) -> &'static str {
        "onboard-llmo [baseURL]"
    }

    fn description(&self) -> &'static str {
        "Opens the LLMO onboarding form for a site."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let base_url = match args.get(0) {
            Some(raw) => normalize_base_url(raw).map_err(|_| {
                SpaceCatError::Validation(format!("Please provide a valid site base URL, got `{raw}`"))
            })?,
            None => String::new(),
        };

        let prompt = if base_url.is_empty() {
            ":rocket: Ready to onboard a site to LLMO?".to_string()
        } else {
            format!(":rocket: Ready to onboard *{base_url}* to LLMO?")
        };
        let blocks = json!([
            { "type": "section", "text": { "type": "mrkdwn", "text": prompt } },
            { "type": "actions", "elements": [{
                "type": "button",
                "action_id": OPEN_ONBOARD_LLMO_ACTION,
                "style": "primary",
                "text": { "type": "plain_text", "text": "Start onboarding" },
                "value": base_url,
            }]}
        ]);

        ctx.say_blocks("Start LLMO onboarding", &blocks).await
    }
}
