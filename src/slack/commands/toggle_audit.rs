use async_trait::async_trait;
use tracing::info;

use super::{Command, CommandContext, resolve_site};
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;

pub struct ToggleAuditCommand;

#[async_trait]
impl Command for ToggleAuditCommand {
    fn id(&self) -> &'static str {
        "toggle-audit"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["toggle audit", "toggle-audit"]
    }

    fn usage(&self) -> &'static str {
        "toggle audit {enable|disable} {baseURL} {auditType}"
    }

    fn description(&self) -> &'static str {
        "Enables or disables an audit type for a site."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let usage_error = || SpaceCatError::Validation(format!("Usage: `{}`", self.usage()));

        let enable = match args.get(0).map(str::to_lowercase).as_deref() {
            Some("enable") => true,
            Some("disable") => false,
            _ => return Err(usage_error()),
        };
        let audit_type = args.get(2).ok_or_else(usage_error)?;
        let site = resolve_site(ctx, args.get(1), self.usage()).await?;

        let mut configuration = ctx.app.data_access.latest_configuration().await?;
        if enable {
            configuration.enable_handler_for_site(audit_type, &site.id);
        } else {
            configuration.disable_handler_for_site(audit_type, &site.id);
        }
        let saved = ctx.app.data_access.save_configuration(&configuration).await?;
        info!(site_id = %site.id, audit_type, enable, version = saved.version, "Audit toggled");

        ctx.say(&format!(
            ":white_check_mark: The audit \"{audit_type}\" has been *{}* for \"{}\".",
            if enable { "enabled" } else { "disabled" },
            site.base_url
        ))
        .await
    }
}
