//! crates/reading_tracker_core/src/timer.rs
//!
//! The client-side reading-session stopwatch.
//!
//! At most one session exists at a time. Elapsed time is derived from
//! wall-clock timestamps (`startedAt`, `lastContinuedAt`, `lastPausedAt`) so the
//! state can be written to disk and picked up again after a restart. The
//! price is that a system clock adjustment while running shows up in the
//! elapsed time; negative deltas are clamped to zero.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{ActiveSession, BookSnapshot};
use crate::ports::{Clock, PortError, PortResult, SessionStorage};

//=========================================================================================
// State and Errors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    NoSession,
    Running,
    Paused,
}

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("A reading session for \"{0}\" is already in progress")]
    AlreadyActive(String),
    #[error("No reading session is in progress")]
    NoActiveSession,
    #[error("Failed to persist the reading session: {0}")]
    Storage(#[from] PortError),
}

//=========================================================================================
// Pure Time Arithmetic
//=========================================================================================

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds();
    (millis as f64 / 1000.0).max(0.0)
}

/// Elapsed reading time of `session` as of `now`. Cheap enough to call on
/// every display tick; nothing is stored.
pub fn current_elapsed_seconds(session: &ActiveSession, now: DateTime<Utc>) -> f64 {
    if session.paused {
        return session.read_time;
    }
    session.read_time + seconds_between(session.running_since(), now)
}

impl ActiveSession {
    pub fn new(book: BookSnapshot, run_id: Uuid, started_at: DateTime<Utc>, start_page: i32) -> Self {
        Self {
            book,
            run_id,
            paused: false,
            started_at,
            start_page,
            read_time: 0.0,
            last_paused_at: None,
            last_continued_at: None,
        }
    }

    fn running_since(&self) -> DateTime<Utc> {
        self.last_continued_at.unwrap_or(self.started_at)
    }

    /// The session after pausing at `now`. Pausing a paused session changes nothing.
    pub fn paused_at(&self, now: DateTime<Utc>) -> Self {
        if self.paused {
            return self.clone();
        }
        Self {
            paused: true,
            read_time: current_elapsed_seconds(self, now),
            last_paused_at: Some(now),
            last_continued_at: None,
            ..self.clone()
        }
    }

    /// The session after resuming at `now`. `read_time` is kept as the base for
    /// the next pause.
    pub fn resumed_at(&self, now: DateTime<Utc>) -> Self {
        if !self.paused {
            return self.clone();
        }
        Self {
            paused: false,
            last_paused_at: None,
            last_continued_at: Some(now),
            ..self.clone()
        }
    }
}

//=========================================================================================
// The Store
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(Option<&ActiveSession>) + Send>;

/// The single owner of the active reading session.
///
/// Every transition is written through `SessionStorage` before it becomes
/// visible; when the write fails the in-memory state stays as it was.
/// Listeners are called after each successful transition.
pub struct SessionStore {
    session: Option<ActiveSession>,
    storage: Box<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl SessionStore {
    /// Restores whatever session the storage holds. An unreadable record is
    /// logged and treated as no session.
    pub fn load(storage: Box<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
        let session = match storage.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable reading session: {}", e);
                None
            }
        };

        Self {
            session,
            storage,
            clock,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> TimerState {
        match &self.session {
            None => TimerState::NoSession,
            Some(s) if s.paused => TimerState::Paused,
            Some(_) => TimerState::Running,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Elapsed seconds of the active session, 0 when there is none.
    pub fn elapsed_seconds(&self) -> f64 {
        self.session
            .as_ref()
            .map(|s| current_elapsed_seconds(s, self.clock.now()))
            .unwrap_or(0.0)
    }

    pub fn start(
        &mut self,
        book: BookSnapshot,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        start_page: i32,
    ) -> Result<(), TimerError> {
        if let Some(active) = &self.session {
            return Err(TimerError::AlreadyActive(active.book.title.clone()));
        }
        debug!("Starting reading session for run {} at page {}", run_id, start_page);
        self.commit(Some(ActiveSession::new(book, run_id, started_at, start_page)))
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        let Some(active) = &self.session else {
            return Ok(());
        };
        if active.paused {
            return Ok(());
        }
        let next = active.paused_at(self.clock.now());
        self.commit(Some(next))
    }

    pub fn play(&mut self) -> Result<(), TimerError> {
        let Some(active) = &self.session else {
            return Ok(());
        };
        if !active.paused {
            return Ok(());
        }
        let next = active.resumed_at(self.clock.now());
        self.commit(Some(next))
    }

    /// Ends the session and returns it. Only call this once the server has
    /// stored the corresponding reading session, or the elapsed time is lost.
    pub fn finish(&mut self) -> Result<Option<ActiveSession>, TimerError> {
        if self.session.is_none() {
            return Ok(None);
        }
        let finished = self.session.clone();
        self.commit(None)?;
        Ok(finished)
    }

    /// Registers a listener that runs after every persisted transition with
    /// the new session (`None` once finished). The `reader` CLI logs
    /// transitions through this.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(Option<&ActiveSession>) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn commit(&mut self, next: Option<ActiveSession>) -> Result<(), TimerError> {
        self.storage.save(next.as_ref())?;
        self.session = next;
        for (_, listener) in &self.listeners {
            listener(self.session.as_ref());
        }
        Ok(())
    }
}

//=========================================================================================
// In-Memory Storage
//=========================================================================================

/// Storage that lives as long as the process. Clones share the same slot,
/// which lets a second store "reload" what the first one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<ActiveSession>>>,
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> PortResult<Option<ActiveSession>> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, session: Option<&ActiveSession>) -> PortResult<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        *slot = session.cloned();
        Ok(())
    }
}
