//! Bot commands triggered by mentioning the app.
//!
//! Each command owns the phrases that trigger it. The registry hands the
//! remaining text, parsed into [`ParsedArgs`], to the first command that
//! accepts it and replies with help when none does.

pub mod add_site;
pub mod backfill_llmo;
pub mod get_site;
pub mod help;
pub mod onboard_llmo;
pub mod run_audit;
pub mod run_import;
pub mod run_scrape;
pub mod toggle_audit;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, instrument};

use super::command_parser::{ParsedArgs, strip_mentions};
use crate::aws::messages::SlackContext;
use crate::context::AppContext;
use crate::core::models::Site;
use crate::errors::SpaceCatError;
use crate::utils::validation::normalize_base_url;

/// Where a command was invoked and how to answer.
pub struct CommandContext<'a> {
    pub app: &'a AppContext,
    pub channel_id: String,
    /// Thread the reply goes into (the mention's own ts when not threaded).
    pub thread_ts: Option<String>,
    pub user_id: Option<String>,
}

impl CommandContext<'_> {
    /// # Errors
    ///
    /// Returns an error if Slack rejects the message.
    pub async fn say(&self, text: &str) -> Result<(), SpaceCatError> {
        self.app
            .slack
            .post_message(&self.channel_id, self.thread_ts.as_deref(), text, None)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if Slack rejects the message.
    pub async fn say_blocks(&self, text: &str, blocks: &Value) -> Result<(), SpaceCatError> {
        self.app
            .slack
            .post_message(&self.channel_id, self.thread_ts.as_deref(), text, Some(blocks))
            .await
    }

    #[must_use]
    pub fn slack_context(&self) -> SlackContext {
        SlackContext {
            channel_id: self.channel_id.clone(),
            thread_ts: self.thread_ts.clone(),
        }
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn id(&self) -> &'static str;

    fn phrases(&self) -> &'static [&'static str];

    fn usage(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Length of the phrase that prefixes `text`, if any. A phrase must be
    /// followed by whitespace or the end of the text.
    fn accepts(&self, text: &str) -> Option<usize> {
        let lower = text.to_lowercase();
        self.phrases()
            .iter()
            .filter(|p| {
                lower.starts_with(*p)
                    && lower[p.len()..]
                        .chars()
                        .next()
                        .is_none_or(char::is_whitespace)
            })
            .map(|p| p.len())
            .max()
    }

    async fn handle(&self, args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError>;
}

/// `usage` and `description` of a command, listed by `help`.
#[derive(Debug, Clone)]
pub struct CommandSummary {
    pub usage: &'static str,
    pub description: &'static str,
}

pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_default_commands()
    }
}

impl CommandRegistry {
    #[must_use]
    pub fn with_default_commands() -> Self {
        let commands: Vec<Box<dyn Command>> = vec![
            Box::new(get_site::GetSiteCommand),
            Box::new(add_site::AddSiteCommand),
            Box::new(run_audit::RunAuditCommand),
            Box::new(run_scrape::RunScrapeCommand),
            Box::new(run_import::RunImportCommand),
            Box::new(backfill_llmo::BackfillLlmoCommand),
            Box::new(onboard_llmo::OnboardLlmoCommand),
            Box::new(toggle_audit::ToggleAuditCommand),
        ];
        Self::new(commands)
    }

    /// Registers `commands` plus a `help` command listing them.
    #[must_use]
    pub fn new(mut commands: Vec<Box<dyn Command>>) -> Self {
        let summaries = commands
            .iter()
            .map(|c| CommandSummary {
                usage: c.usage(),
                description: c.description(),
            })
            .collect();
        commands.push(Box::new(help::HelpCommand::new(summaries)));
        Self { commands }
    }

    /// The command whose longest phrase prefixes `text`, with the rest of the text.
    #[must_use]
    pub fn find<'t>(&self, text: &'t str) -> Option<(&dyn Command, &'t str)> {
        self.commands
            .iter()
            .filter_map(|c| c.accepts(text).map(|len| (c.as_ref(), len)))
            .max_by_key(|(_, len)| *len)
            .map(|(c, len)| (c, text.get(len..).unwrap_or_default().trim()))
    }

    fn help(&self) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|c| c.id() == help::HELP_COMMAND_ID)
            .map(AsRef::as_ref)
    }

    /// Runs the command addressed by a mention. Failures are reported back
    /// into the thread rather than returned.
    #[instrument(level = "info", skip(self, ctx), fields(channel_id = %ctx.channel_id))]
    pub async fn dispatch(&self, raw_text: &str, ctx: &CommandContext<'_>) {
        let text = strip_mentions(raw_text);
        let (command, rest) = match self.find(text) {
            Some(found) => found,
            None => match self.help() {
                Some(help) => (help, ""),
                None => return,
            },
        };

        info!(command = command.id(), "Dispatching Slack command");
        let args = ParsedArgs::parse(rest);
        if let Err(e) = command.handle(&args, ctx).await {
            error!(command = command.id(), error = %e, "Slack command failed");
            let reply = if e.status_code() < 500 {
                format!(":warning: {}", e.public_message())
            } else {
                format!(":nuclear-warning: Oops! Something went wrong: {e}")
            };
            if let Err(post_err) = ctx.say(&reply).await {
                error!(error = %post_err, "Failed to report command error to Slack");
            }
        }
    }
}

/// Looks up a site by the base URL a user typed.
///
/// # Errors
///
/// `Validation` when the URL is missing or malformed, `NotFound` when no site has it.
pub async fn resolve_site(
    ctx: &CommandContext<'_>,
    base_url: Option<&str>,
    usage: &str,
) -> Result<Site, SpaceCatError> {
    let raw = base_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| SpaceCatError::Validation(format!("Usage: `{usage}`")))?;
    let normalized = normalize_base_url(raw)
        .map_err(|_| SpaceCatError::Validation(format!("Please provide a valid site base URL, got `{raw}`")))?;

    ctx.app
        .data_access
        .site_by_base_url(&normalized)
        .await?
        .ok_or_else(|| SpaceCatError::NotFound(format!("No site found with base URL '{normalized}'")))
}
