//! Command-line interface.

mod history;

pub use history::{HistoryCommand, run_history_command};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "querybot", version, about = "Ask the Chinook database questions in plain English")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Also serve the HTTP chat channel (needs HTTP_WEBHOOK_SECRET)
    #[arg(long)]
    pub http: bool,

    /// Do not start the interactive prompt
    #[arg(long)]
    pub no_repl: bool,

    /// Disable colored terminal output
    #[arg(long)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, env = "QUERYBOT_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Answer a single question and exit
    Ask {
        /// The question, e.g. "How many tracks are there?"
        question: String,
    },

    /// Show the saved conversation transcript
    History(HistoryCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_repl() {
        let cli = Cli::parse_from(["querybot"]);
        assert!(cli.command.is_none());
        assert!(!cli.http);
        assert!(!cli.no_repl);
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["querybot", "ask", "How many tracks are there?"]);
        match cli.command {
            Some(Command::Ask { question }) => assert_eq!(question, "How many tracks are there?"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_history_limit() {
        let cli = Cli::parse_from(["querybot", "history", "--limit", "4"]);
        match cli.command {
            Some(Command::History(cmd)) => assert_eq!(cmd.limit, Some(4)),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
