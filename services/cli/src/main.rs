//! services/cli/src/main.rs
//!
//! `reader`: the reading tracker client. The active session lives in a local
//! file; books, runs and sessions live on the API server.

mod cli;
mod commands;
mod error;
mod http;
mod storage;

use clap::Parser;
use reading_tracker_core::{ActiveSession, SessionStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;
use crate::http::HttpReadingApi;
use crate::storage::FileSessionStorage;

fn state_dir(cli: &Cli) -> Result<PathBuf, CliError> {
    match &cli.state_dir {
        Some(dir) => Ok(dir.clone()),
        None => dirs::data_dir()
            .map(|dir| dir.join("reader"))
            .ok_or(CliError::NoStateDir),
    }
}

/// Every persisted timer transition ends up in the debug log.
fn log_transition(session: Option<&ActiveSession>) {
    match session {
        Some(s) if s.paused => debug!(
            "Session on \"{}\" paused with {:.0}s read",
            s.book.title, s.read_time
        ),
        Some(s) => debug!("Session on \"{}\" running", s.book.title),
        None => debug!("No active reading session"),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let storage = FileSessionStorage::new(&state_dir(&cli)?);
    debug!("Reading session record: {}", storage.path().display());
    let mut store = SessionStore::load(Box::new(storage), Arc::new(SystemClock));
    store.subscribe(log_transition);
    let api = HttpReadingApi::new(&cli.api_url, cli.token.clone())?;

    commands::dispatch(cli.command, &api, &mut store).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
