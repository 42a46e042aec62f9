use clap::{Parser, Subcommand, ValueEnum};

use crate::data::users::UserIdentifier;

/// Manage the bot's users and settings in Postgres.
#[derive(Parser, Debug)]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_SHORT"), ")"),
    about,
    long_about = None
)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty, global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable, single-line records
    Pretty,
    /// One JSON object per record
    Json,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Create the database tables if they do not exist
    Init,
    /// User directory operations
    #[command(subcommand)]
    User(UserCommand),
    /// Settings store operations
    #[command(subcommand)]
    Setting(SettingCommand),
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum UserCommand {
    /// Register a user, or refresh last-seen and activity for a known one
    Ensure {
        /// A numeric id or a JSON object such as {"uid": 42}
        #[arg(value_parser = parse_identifier, allow_hyphen_values = true)]
        identifier: UserIdentifier,
        /// Display name to store
        #[arg(long)]
        name: Option<String>,
        /// Count this call as a message
        #[arg(long)]
        track_activity: bool,
    },
    /// Print a stored user as JSON
    Show {
        #[arg(allow_hyphen_values = true)]
        id: i64,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SettingCommand {
    /// Print a setting's value
    Get { key: String },
    /// Store a setting's value
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Add to an integer setting and print the result
    Incr {
        key: String,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        by: i64,
    },
}

fn parse_identifier(raw: &str) -> Result<UserIdentifier, String> {
    serde_json::from_str(raw.trim()).map_err(|e| format!("invalid identifier `{raw}`: {e}"))
}
