//! All Slack-specific functionality

pub mod client;
pub mod command_parser;
pub mod commands;
pub mod modal_builder;
pub mod onboarding;
pub mod response_builder;

pub use client::{SlackClient, SlackMessenger};
pub use commands::{Command, CommandContext, CommandRegistry};
