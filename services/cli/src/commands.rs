//! services/cli/src/commands.rs
//!
//! One function per `reader` subcommand.

use reading_tracker_core::{
    format_reading_time,
    progress::{progress_percent, BookStatus},
    reconcile::{default_start_page, finish_reading, latest_run, start_reading},
    ActiveSession, BookSummary, NewBook, ReadingApi, SessionStore, TimerState,
};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::Commands;
use crate::error::CliError;

/// Runs `command`. The store is only touched by the timer commands; the
/// listing commands go straight to the API.
pub async fn dispatch(
    command: Commands,
    api: &dyn ReadingApi,
    store: &mut SessionStore,
) -> Result<(), CliError> {
    match command {
        Commands::Books { query } => list_books(api, query.as_deref()).await,
        Commands::AddBook {
            title,
            total_pages,
            author,
            description,
            language,
            isbn,
            publish_date,
        } => {
            let book = api
                .create_book(&NewBook {
                    id: Uuid::now_v7(),
                    title,
                    total_pages,
                    author,
                    description,
                    language,
                    publish_date,
                    isbn,
                })
                .await?;
            println!("Added \"{}\" ({} pages)  {}", book.title, book.total_pages, book.id);
            Ok(())
        }
        Commands::Runs { book_id } => list_runs(api, book_id).await,
        Commands::Sessions { run_id } => list_sessions(api, run_id).await,
        Commands::Start {
            book_id,
            start_page,
        } => start(api, store, book_id, start_page).await,
        Commands::Pause => {
            store.pause()?;
            print_status(store);
            Ok(())
        }
        Commands::Play => {
            store.play()?;
            print_status(store);
            Ok(())
        }
        Commands::Status => {
            print_status(store);
            Ok(())
        }
        Commands::Watch => watch(store).await,
        Commands::Finish { end_page } => {
            let session = finish_reading(api, store, end_page).await?;
            println!(
                "Recorded {} pages ({} -> {}) in {}",
                session.read_pages,
                session.start_page,
                session.end_page,
                format_reading_time(f64::from(session.read_time))
            );
            Ok(())
        }
        Commands::Discard => {
            let elapsed = store.elapsed_seconds();
            match store.finish()? {
                Some(dropped) => println!("{}", discarded_line(&dropped, elapsed)),
                None => println!("No reading session in progress."),
            }
            Ok(())
        }
    }
}

//=========================================================================================
// Listings
//=========================================================================================

fn book_line(summary: &BookSummary) -> String {
    let book = &summary.book;
    let status = BookStatus::from_pages(summary.completed_pages, book.total_pages);
    format!(
        "{:<36}  {:<11}  {:>5}/{:<5} {:>3}%  {}",
        book.title,
        status.label(),
        summary.completed_pages,
        book.total_pages,
        progress_percent(summary.completed_pages, book.total_pages),
        book.id
    )
}

async fn list_books(api: &dyn ReadingApi, query: Option<&str>) -> Result<(), CliError> {
    let books = api.list_books(query).await?;
    if books.is_empty() {
        println!("No books found.");
    }
    for summary in &books {
        println!("{}", book_line(summary));
    }
    Ok(())
}

async fn list_runs(api: &dyn ReadingApi, book_id: Uuid) -> Result<(), CliError> {
    let runs = api.list_runs(book_id).await?;
    if runs.is_empty() {
        println!("This book has not been started.");
    }
    for run in &runs {
        let finished = run
            .finished_at
            .map(|at| format!("finished {}", at.format("%Y-%m-%d")))
            .unwrap_or_else(|| "open".to_string());
        println!(
            "{}  started {}  {:>5} pages  {}",
            run.id,
            run.started_at.format("%Y-%m-%d"),
            run.completed_pages,
            finished
        );
    }
    Ok(())
}

async fn list_sessions(api: &dyn ReadingApi, run_id: Uuid) -> Result<(), CliError> {
    let sessions = api.list_sessions(run_id).await?;
    if sessions.is_empty() {
        println!("No sessions recorded for this run.");
    }
    for session in &sessions {
        println!(
            "{}  pages {:>4} -> {:<4} (+{})  {}",
            session.start_time.format("%Y-%m-%d %H:%M"),
            session.start_page,
            session.end_page,
            session.read_pages,
            format_reading_time(f64::from(session.read_time))
        );
    }
    Ok(())
}

//=========================================================================================
// Timer
//=========================================================================================

async fn start(
    api: &dyn ReadingApi,
    store: &mut SessionStore,
    book_id: Uuid,
    start_page: Option<i32>,
) -> Result<(), CliError> {
    let book = api.get_book(book_id).await?;
    let runs = api.list_runs(book_id).await?;
    let latest = latest_run(&runs);
    let start_page = start_page.unwrap_or_else(|| default_start_page(book.total_pages, latest));

    let started = start_reading(api, store, &book, latest, start_page).await?;
    if started.created_run.is_some() {
        info!("Started a new reading run {}", started.run_id);
    }
    println!("Reading \"{}\" from page {}.", book.title, start_page);
    Ok(())
}

fn describe(session: &ActiveSession, elapsed: f64) -> String {
    let state = if session.paused { "paused" } else { "reading" };
    format!(
        "{} \"{}\" from page {}  {}",
        state,
        session.book.title,
        session.start_page,
        format_reading_time(elapsed)
    )
}

/// `elapsed` is taken before the store is cleared, so a running session
/// reports the time since its last resume too.
fn discarded_line(session: &ActiveSession, elapsed: f64) -> String {
    format!(
        "Discarded the session on \"{}\" ({} not recorded)",
        session.book.title,
        format_reading_time(elapsed)
    )
}

fn print_status(store: &SessionStore) {
    match store.session() {
        Some(session) => println!("{}", describe(session, store.elapsed_seconds())),
        None => println!("No reading session in progress."),
    }
}

/// Redraws the elapsed time once per second until Ctrl-C.
async fn watch(store: &SessionStore) -> Result<(), CliError> {
    if store.state() == TimerState::NoSession {
        println!("No reading session in progress.");
        return Ok(());
    }

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(session) = store.session() {
                    write!(stdout, "\r{}   ", describe(session, store.elapsed_seconds()))?;
                    stdout.flush()?;
                }
            }
        }
    }
    writeln!(stdout)?;
    debug!("Stopped watching");
    Ok(())
}
