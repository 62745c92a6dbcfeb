use async_trait::async_trait;

use super::{Command, CommandContext, resolve_site};
use crate::core::models::{Audit, Site};
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;

pub struct GetSiteCommand;

fn format_site(site: &Site, audits: &[Audit]) -> String {
    let mut out = format!(
        "*Site:* {}\n:id: `{}`\n:cloud: Delivery type: `{}`\n:signal_strength: Live: {}\n",
        site.base_url,
        site.id,
        site.delivery_type,
        if site.is_live { "yes" } else { "no" },
    );
    if let Some(org) = &site.organization_id {
        out.push_str(&format!(":office: Organization: `{org}`\n"));
    }
    if let Some(repo) = &site.git_hub_url {
        out.push_str(&format!(":github: {repo}\n"));
    }
    if let Some(llmo) = &site.config.llmo {
        out.push_str(&format!(
            ":robot_face: LLMO: brand *{}*, data folder `{}`\n",
            llmo.brand, llmo.data_folder
        ));
    }

    if audits.is_empty() {
        out.push_str("\n_No audits yet._");
    } else {
        out.push_str("\n*Latest audits:*");
        for audit in audits {
            out.push_str(&format!(
                "\n• `{}` {}{}",
                audit.audit_type,
                audit.audited_at.format("%Y-%m-%d %H:%M UTC"),
                if audit.is_error { " :x:" } else { "" }
            ));
        }
    }
    out
}

#[async_trait]
impl Command for GetSiteCommand {
    fn id(&self) -> &'static str {
        "get-site"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["get site", "get-site"]
    }

    fn usage(&self) -> &'static str {
        "get site {baseURL}"
    }

    fn description(&self) -> &'static str {
        "Shows a site's settings and its latest audits."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let site = resolve_site(ctx, args.get(0), self.usage()).await?;
        let mut audits = ctx.app.data_access.latest_audits_for_site(&site.id).await?;
        audits.sort_by(|a, b| a.audit_type.cmp(&b.audit_type));
        ctx.say(&format_site(&site, &audits)).await
    }
}
