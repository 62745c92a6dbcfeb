use async_trait::async_trait;

use super::{Command, CommandContext, CommandSummary};
use crate::errors::SpaceCatError;
use crate::slack::command_parser::ParsedArgs;

pub const HELP_COMMAND_ID: &str = "help";

pub struct HelpCommand {
    summaries: Vec<CommandSummary>,
}

impl HelpCommand {
    #[must_use]
    pub fn new(summaries: Vec<CommandSummary>) -> Self {
        Self { summaries }
    }

    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::from("*Here are the commands I understand:*\n");
        for summary in &self.summaries {
            out.push_str(&format!("\n• `{}`\n   {}", summary.usage, summary.description));
        }
        out
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn id(&self) -> &'static str {
        HELP_COMMAND_ID
    }

    fn phrases(&self) -> &'static [&'static str] {
        &["help", "commands"]
    }

    fn usage(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Lists the available commands."
    }

    async fn handle(&self, _args: &ParsedArgs, ctx: &CommandContext<'_>) -> Result<(), SpaceCatError> {
        ctx.say(&self.text()).await
    }
}
