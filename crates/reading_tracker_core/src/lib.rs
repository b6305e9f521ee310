pub mod domain;
pub mod format;
pub mod isbn;
pub mod ports;
pub mod progress;
pub mod reconcile;
pub mod timer;

pub use domain::{
    ActiveSession, Book, BookChanges, BookSnapshot, BookSummary, NewBook, NewReadingRun,
    NewReadingSession, ReadingRun, ReadingRunChanges, ReadingSession, ReadingSessionChanges, User,
    UserCredentials,
};
pub use format::format_reading_time;
pub use ports::{
    Clock, DatabaseService, PortError, PortResult, ReadingApi, SessionStorage, SystemClock,
};
pub use progress::BookStatus;
pub use reconcile::{FlowError, RunChoice};
pub use timer::{current_elapsed_seconds, SessionStore, TimerError, TimerState};
