use crate::documents::SaveMode;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Parser)]
#[command(name = "pilot", version, about = "Terminal client for a coding-assistant backend")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Backend root URL.
    #[arg(long, env = "PILOT_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Model identifier; defaults to the first one the backend lists.
    #[arg(long, env = "PILOT_MODEL", global = true)]
    pub model: Option<String>,

    /// Agent status poll interval in milliseconds.
    #[arg(long, env = "PILOT_POLL_INTERVAL_MS", default_value_t = 2000, global = true)]
    pub poll_interval_ms: u64,

    /// Ask the backend for streamed replies.
    #[arg(
        long,
        env = "PILOT_STREAM",
        default_value_t = true,
        action = ArgAction::Set,
        global = true
    )]
    pub stream: bool,

    /// When scratchpad and plan edits are written back.
    #[arg(
        long,
        env = "PILOT_DOC_SAVE",
        value_enum,
        default_value_t = SaveMode::OnBlur,
        global = true
    )]
    pub doc_save: SaveMode,

    /// Log file for the interactive client.
    #[arg(long, env = "PILOT_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Interactive session (the default).
    Chat,
    /// List the backend's models.
    Models,
    /// Index the backend's codebase.
    Index,
    /// Send one message and print the reply.
    Ask {
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Run the autonomous agent until it finishes; Ctrl-C stops it.
    Agent {
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_backend() {
        let cli = Cli::try_parse_from(["pilot"]).expect("parse");
        assert_eq!(cli.command, None);
        assert_eq!(cli.config.base_url, DEFAULT_BASE_URL);
        assert_eq!(cli.config.poll_interval(), Duration::from_millis(2000));
        assert!(cli.config.stream);
        assert_eq!(cli.config.doc_save, SaveMode::OnBlur);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "pilot",
            "agent",
            "refactor",
            "module",
            "X",
            "--poll-interval-ms",
            "500",
            "--stream",
            "false",
            "--doc-save",
            "on-input",
        ])
        .expect("parse");

        assert_eq!(
            cli.command,
            Some(Command::Agent {
                goal: vec!["refactor".into(), "module".into(), "X".into()]
            })
        );
        assert_eq!(cli.config.poll_interval(), Duration::from_millis(500));
        assert!(!cli.config.stream);
        assert_eq!(cli.config.doc_save, SaveMode::OnInput);
    }
}
