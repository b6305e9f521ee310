//! services/cli/src/error.rs

use reading_tracker_core::{FlowError, PortError, TimerError};

/// Everything a `reader` command can fail with.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("{}", describe_port_error(.0))]
    Api(#[from] PortError),

    #[error("Failed to build the HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No data directory on this platform; pass --state-dir")]
    NoStateDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server errors carry a readable message already; only auth failures get a hint.
fn describe_port_error(error: &PortError) -> String {
    match error {
        PortError::Unauthorized => {
            "Not signed in: set READER_SESSION_TOKEN or pass --token".to_string()
        }
        PortError::NotFound(message)
        | PortError::Invalid(message)
        | PortError::Unexpected(message) => message.clone(),
    }
}
