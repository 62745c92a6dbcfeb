use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Map;
use tracing::info;

use super::{Command, CommandContext, resolve_site};
use crate::aws::messages::ImportMessage;
use crate::aws::sqs::to_message;
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;

pub const IMPORT_TYPES: &[&str] = &[
    "organic-keywords",
    "organic-traffic",
    "top-pages",
    "all-traffic",
    "cwv-daily",
    "cwv-weekly",
    "traffic-analysis",
    "top-forms",
    "llmo-prompts-ahrefs",
];

pub struct RunImportCommand;

fn parse_date(raw: &str) -> Result<NaiveDate, SpaceCatError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        SpaceCatError::Validation(format!("Invalid date '{raw}', expected YYYY-MM-DD."))
    })
}

/// Validates the optional `startDate endDate` pair.
///
/// # Errors
///
/// Returns `Validation` when only one date is given, a date is malformed or
/// the range is reversed.
pub fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<(NaiveDate, NaiveDate)>, SpaceCatError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(s), Some(e)) => {
            let (start, end) = (parse_date(s)?, parse_date(e)?);
            if start > end {
                return Err(SpaceCatError::Validation(
                    "Start date must not be after end date.".to_string(),
                ));
            }
            Ok(Some((start, end)))
        }
        _ => Err(SpaceCatError::Validation(
            "Provide both a start date and an end date, or neither.".to_string(),
        )),
    }
}

#[async_trait]
impl Command for RunImportCommand {
    fn id(&self) -> &'static str {
        "run-import"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["run import", "run-import"]
    }

    fn usage(&self) -> &'static str {
        "run import {importType} {baseURL} [startDate endDate]"
    }

    fn description(&self) -> &'static str {
        "Runs an import for a site, optionally for a date range (YYYY-MM-DD)."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let import_type = args
            .get(0)
            .ok_or_else(|| SpaceCatError::Validation(format!("Usage: `{}`", self.usage())))?;
        if !IMPORT_TYPES.contains(&import_type) {
            return Err(SpaceCatError::Validation(format!(
                "Import type {import_type} does not exist. Valid import types are: {}",
                IMPORT_TYPES.join(", ")
            )));
        }
        let range = parse_date_range(args.get(2), args.get(3))?;
        let site = resolve_site(ctx, args.get(1), self.usage()).await?;

        let message = ImportMessage {
            import_type: import_type.to_string(),
            site_id: site.id.clone(),
            start_date: range.map(|(s, _)| s.to_string()),
            end_date: range.map(|(_, e)| e.to_string()),
            audit_context: Map::new(),
            slack_context: Some(ctx.slack_context()),
        };
        ctx.app
            .queue
            .send_message(&ctx.app.config.import_worker_queue_url, &to_message(&message)?)
            .await?;
        info!(site_id = %site.id, import_type, "Import triggered");

        let period = range.map_or_else(String::new, |(s, e)| format!(" from {s} to {e}"));
        ctx.say(&format!(
            ":adobe-run: Triggered import run of type {import_type} for site `{}`{period}.",
            site.base_url
        ))
        .await
    }
}
