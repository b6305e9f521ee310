//! services/cli/src/cli.rs
//!
//! Command-line definition for `reader`.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "reader",
    version = env!("CARGO_PKG_VERSION"),
    about = "Track reading sessions against the reading tracker API",
    long_about = None
)]
pub struct Cli {
    /// Base URL of the API server
    #[arg(
        global = true,
        long,
        env = "READER_API_URL",
        default_value = "http://localhost:3000"
    )]
    pub api_url: String,

    /// Value of the `session` cookie issued by /auth/login
    #[arg(global = true, long, env = "READER_SESSION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Where the active reading session is kept between runs
    #[arg(global = true, long, env = "READER_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List your books with their progress
    Books {
        /// Only books whose title or author contains this text
        query: Option<String>,
    },

    /// Register a book
    AddBook {
        #[arg(long)]
        title: String,
        #[arg(long)]
        total_pages: i32,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Two-letter language code, e.g. `en`
        #[arg(long)]
        language: Option<String>,
        /// ISBN-13, or an ISBN-10 to be converted
        #[arg(long)]
        isbn: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        publish_date: Option<NaiveDate>,
    },

    /// List the reading runs of a book
    Runs { book_id: Uuid },

    /// List the sessions of a reading run
    Sessions { run_id: Uuid },

    /// Start the timer for a book
    Start {
        book_id: Uuid,
        /// Defaults to where the unfinished run stopped
        #[arg(long)]
        start_page: Option<i32>,
    },

    /// Pause the running timer
    Pause,

    /// Resume a paused timer
    Play,

    /// Show the active session
    Status,

    /// Show the elapsed time, updated every second, until Ctrl-C
    Watch,

    /// Record the session on the server and clear the timer
    Finish {
        #[arg(long)]
        end_page: i32,
    },

    /// Drop the active session without recording it
    Discard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn start_takes_an_optional_page() {
        let cli = Cli::try_parse_from([
            "reader",
            "start",
            "0190a0f4-7b1c-7cc3-8f1e-3c2b9d4e5f60",
            "--start-page",
            "45",
        ])
        .expect("valid arguments");

        match cli.command {
            Commands::Start { start_page, .. } => assert_eq!(start_page, Some(45)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn add_book_parses_dates() {
        let cli = Cli::try_parse_from([
            "reader",
            "add-book",
            "--title",
            "Dune",
            "--total-pages",
            "412",
            "--publish-date",
            "1965-08-01",
        ])
        .expect("valid arguments");

        match cli.command {
            Commands::AddBook { publish_date, .. } => {
                assert_eq!(publish_date, NaiveDate::from_ymd_opt(1965, 8, 1))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
