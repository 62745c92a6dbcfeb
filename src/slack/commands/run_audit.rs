use async_trait::async_trait;
use tracing::info;

use super::{Command, CommandContext, resolve_site};
use crate::aws::messages::AuditMessage;
use crate::aws::sqs::to_message;
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;

pub const DEFAULT_AUDIT_TYPE: &str = "lhs-mobile";

pub struct RunAuditCommand;

impl RunAuditCommand {
    async fn run_for_all(&self, audit_type: &str, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let configuration = ctx.app.data_access.latest_configuration().await?;
        let sites = ctx.app.data_access.all_sites().await?;
        let slack = ctx.slack_context();

        let messages = sites
            .iter()
            .filter(|s| configuration.is_handler_enabled_for_site(audit_type, &s.id))
            .map(|s| to_message(&AuditMessage::new(audit_type, &s.id).with_slack_context(Some(&slack))))
            .collect::<Result<Vec<_>, _>>()?;

        if messages.is_empty() {
            return ctx
                .say(&format!(":x: No site has audits of type '{audit_type}' enabled."))
                .await;
        }

        ctx.app
            .queue
            .send_message_batch(&ctx.app.config.audit_jobs_queue_url, &messages)
            .await?;
        info!(audit_type, count = messages.len(), "Audits triggered for all sites");

        ctx.say(&format!(
            ":white_check_mark: Triggered {audit_type} audit for {} of {} sites.",
            messages.len(),
            sites.len()
        ))
        .await
    }
}

#[async_trait]
impl Command for RunAuditCommand {
    fn id(&self) -> &'static str {
        "run-audit"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["run audit", "run-audit"]
    }

    fn usage(&self) -> &'static str {
        "run audit {baseURL|all} [auditType]"
    }

    fn description(&self) -> &'static str {
        "Runs an audit (default lhs-mobile) for one site or for every site it is enabled for."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let audit_type = args.get(1).unwrap_or(DEFAULT_AUDIT_TYPE);

        if args.get(0).is_some_and(|t| t.eq_ignore_ascii_case("all")) {
            return self.run_for_all(audit_type, ctx).await;
        }

        let site = resolve_site(ctx, args.get(0), self.usage()).await?;
        let configuration = ctx.app.data_access.latest_configuration().await?;
        if !configuration.is_handler_enabled_for_site(audit_type, &site.id) {
            return ctx
                .say(&format!(
                    ":x: Will not audit site '{}' because audits of type '{audit_type}' are disabled for this site.",
                    site.base_url
                ))
                .await;
        }

        let message = AuditMessage::new(audit_type, &site.id).with_slack_context(Some(&ctx.slack_context()));
        ctx.app
            .queue
            .send_message(&ctx.app.config.audit_jobs_queue_url, &to_message(&message)?)
            .await?;
        info!(site_id = %site.id, audit_type, "Audit triggered");

        ctx.say(&format!(
            ":adobe-run: Triggered {audit_type} audit for {}.",
            site.base_url
        ))
        .await
    }
}
