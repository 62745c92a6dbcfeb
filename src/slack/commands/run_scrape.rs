use async_trait::async_trait;
use tracing::info;

use super::{Command, CommandContext, resolve_site};
use crate::aws::messages::{ScrapeMessage, ScrapeUrl};
use crate::aws::sqs::to_message;
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;

/// URLs per scrape message.
pub const SCRAPE_BATCH_SIZE: usize = 50;

pub struct RunScrapeCommand;

#[async_trait]
impl Command for RunScrapeCommand {
    fn id(&self) -> &'static str {
        "run-scrape"
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["run scrape", "run-scrape"]
    }

    fn usage(&self) -> &'static str {
        "run scrape {baseURL}"
    }

    fn description(&self) -> &'static str {
        "Scrapes the top pages of a site."
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        let site = resolve_site(ctx, args.get(0), self.usage()).await?;
        let top_pages = ctx.app.data_access.top_pages_for_site(&site.id).await?;
        if top_pages.is_empty() {
            return ctx
                .say(&format!(":warning: No top pages found for site '{}'.", site.base_url))
                .await;
        }

        let slack = ctx.slack_context();
        let mut batches = 0usize;
        for chunk in top_pages.chunks(SCRAPE_BATCH_SIZE) {
            let message = ScrapeMessage {
                job_id: site.id.clone(),
                processing_type: "default".to_string(),
                urls: chunk.iter().map(|p| ScrapeUrl { url: p.url.clone() }).collect(),
                options: None,
                slack_context: Some(slack.clone()),
            };
            ctx.app
                .queue
                .send_message(&ctx.app.config.scraping_jobs_queue_url, &to_message(&message)?)
                .await?;
            batches += 1;
        }
        info!(site_id = %site.id, urls = top_pages.len(), batches, "Scrape triggered");

        ctx.say(&format!(
            ":white_check_mark: Triggered scrape of {} top pages of {} in {batches} batch(es).",
            top_pages.len(),
            site.base_url
        ))
        .await
    }
}
