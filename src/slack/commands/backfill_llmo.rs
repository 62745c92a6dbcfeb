use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, json};
use tracing::info;

use super::{Command, CommandContext, resolve_site};
use crate::aws::messages::{AuditMessage, ImportMessage};
use crate::aws::sqs::to_message;
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;
use crate::utils::weeks::IsoWeek;

pub const DEFAULT_BACKFILL_WEEKS: u32 = 4;
pub const MAX_BACKFILL_WEEKS: u32 = 52;
pub const TRAFFIC_ANALYSIS_IMPORT: &str = "traffic-analysis";
pub const LLMO_CUSTOMER_ANALYSIS_AUDIT: &str = "llmo-customer-analysis";

pub struct BackfillLlmoCommand;

/// # Errors
///
/// Returns `Validation` when `raw` is not a whole number in `1..=52`.
pub fn parse_weeks(raw: Option<&str>) -> Result<u32, SpaceCatError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_BACKFILL_WEEKS);
    };
    match raw.parse::<u32>() {
        Ok(n) if (1..=MAX_BACKFILL_WEEKS).contains(&n) => Ok(n),
        _ => Err(SpaceCatError::Validation(format!(
            "Weeks must be a number between 1 and {MAX_BACKFILL_WEEKS}, got '{raw}'."
        ))),
    }
}

#[async_trait]
impl Command for BackfillLlmoCommand {
    fn id(&self) -> &'static str {
        "backfill-llmo"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["backfill-llmo", "backfill llmo"]
    }

    fn usage(&self) -> &'static str {
        "backfill-llmo {baseURL} [weeks]"
    }

    fn description(&self) -> &'static str {
        "Re-imports LLMO traffic analysis for the last N complete weeks (default 4, max 52)."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let weeks = parse_weeks(args.get(1).or_else(|| args.option("weeks")))?;
        let site = resolve_site(ctx, args.get(0), self.usage()).await?;
        if site.config.llmo.is_none() {
            return Err(SpaceCatError::Validation(format!(
                "LLMO is not configured for '{}'. Onboard it with `onboard-llmo` first.",
                site.base_url
            )));
        }

        let slack = ctx.slack_context();
        let imports = IsoWeek::last_n(Utc::now().date_naive(), weeks)
            .into_iter()
            .map(|week| {
                let mut audit_context = Map::new();
                audit_context.insert("week".to_string(), json!(week.week));
                audit_context.insert("year".to_string(), json!(week.year));
                to_message(&ImportMessage {
                    import_type: TRAFFIC_ANALYSIS_IMPORT.to_string(),
                    site_id: site.id.clone(),
                    start_date: Some(week.monday().to_string()),
                    end_date: Some(week.sunday().to_string()),
                    audit_context,
                    slack_context: Some(slack.clone()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        ctx.app
            .queue
            .send_message_batch(&ctx.app.config.import_worker_queue_url, &imports)
            .await?;

        let audit = AuditMessage::new(LLMO_CUSTOMER_ANALYSIS_AUDIT, &site.id)
            .with_slack_context(Some(&slack))
            .with_context_value("weeks", json!(weeks));
        ctx.app
            .queue
            .send_message(&ctx.app.config.audit_jobs_queue_url, &to_message(&audit)?)
            .await?;
        info!(site_id = %site.id, weeks, "LLMO backfill triggered");

        ctx.say(&format!(
            ":adobe-run: Backfilling {weeks} week(s) of LLMO data for {}: {weeks} traffic-analysis import(s) and one {LLMO_CUSTOMER_ANALYSIS_AUDIT} audit queued.",
            site.base_url
        ))
        .await
    }
}
