// Session error types and constants

use crate::error::{ErrorCode, IngestError};
use log::error;
use std::fmt;

/// Session error code constants
///
/// Error code range: 2001-2005
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Live mode already started
    pub const ALREADY_RUNNING: i32 = 2001;

    /// Live mode not started
    pub const NOT_RUNNING: i32 = 2002;

    /// The UDP listener failed to start or stop
    pub const LISTENER: i32 = 2003;

    /// The buffer worker thread panicked
    pub const WORKER_PANICKED: i32 = 2004;

    /// Replay input could not be read
    pub const REPLAY_INPUT: i32 = 2005;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionManager, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session lifecycle errors
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// `start_live_mode` called while live
    AlreadyRunning,

    /// `stop` called while idle
    NotRunning,

    /// Listener lifecycle failure
    Listener(IngestError),

    /// The buffer-owning worker panicked; buffered pitches are lost
    WorkerPanicked,

    /// Reading recorded messages failed part-way
    ReplayInput(IngestError),
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::AlreadyRunning => SessionErrorCodes::ALREADY_RUNNING,
            SessionError::NotRunning => SessionErrorCodes::NOT_RUNNING,
            SessionError::Listener(_) => SessionErrorCodes::LISTENER,
            SessionError::WorkerPanicked => SessionErrorCodes::WORKER_PANICKED,
            SessionError::ReplayInput(_) => SessionErrorCodes::REPLAY_INPUT,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::AlreadyRunning => {
                "Live mode already running. Call stop() first.".to_string()
            }
            SessionError::NotRunning => {
                "Live mode not running. Call start_live_mode() first.".to_string()
            }
            SessionError::Listener(inner) => format!("Listener failure: {}", inner.message()),
            SessionError::WorkerPanicked => "Buffer worker thread panicked".to_string(),
            SessionError::ReplayInput(inner) => format!("Replay input failure: {}", inner.message()),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Listener(inner) | SessionError::ReplayInput(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<IngestError> for SessionError {
    fn from(err: IngestError) -> Self {
        SessionError::Listener(err)
    }
}
