use async_trait::async_trait;
use tracing::info;

use super::{Command, CommandContext};
use crate::core::models::{DeliveryType, NewSite};
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;
use crate::utils::validation::normalize_base_url;

pub struct AddSiteCommand;

#[async_trait]
impl Command for AddSiteCommand {
    fn id(&self) -> &'static str {
        "add-site"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["add site", "add-site"]
    }

    fn usage(&self) -> &'static str {
        "add site {baseURL} [aem_edge|aem_cs|other]"
    }

    fn description(&self) -> &'static str {
        "Adds a site. Delivery type defaults to aem_edge."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let raw = args
            .get(0)
            .ok_or_else(|| SpaceCatError::Validation(format!("Usage: `{}`", self.usage())))?;
        let base_url = normalize_base_url(raw)
            .map_err(|_| SpaceCatError::Validation(format!("Please provide a valid site base URL, got `{raw}`")))?;
        let delivery_type = match args.get(1).or_else(|| args.option("delivery")) {
            Some(dt) => dt.parse::<DeliveryType>().map_err(SpaceCatError::Validation)?,
            None => DeliveryType::AemEdge,
        };

        if ctx.app.data_access.site_by_base_url(&base_url).await?.is_some() {
            return ctx
                .say(&format!(":x: '{base_url}' was already added before."))
                .await;
        }

        let site = ctx
            .app
            .data_access
            .create_site(NewSite {
                base_url: base_url.clone(),
                delivery_type,
                organization_id: None,
                is_live: true,
                name: None,
            })
            .await?;
        info!(site_id = %site.id, base_url = %site.base_url, "Site added from Slack");

        ctx.say(&format!(
            ":white_check_mark: Successfully added new site '{}' (`{}`, delivery type `{}`).",
            site.base_url, site.id, site.delivery_type
        ))
        .await
    }
}
