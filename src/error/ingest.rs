// Ingest error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Ingest error code constants
///
/// Single source of truth for the numeric codes reported by the UDP
/// listener and the datagram path.
///
/// Error code range: 1001-1006
pub struct IngestErrorCodes {}

impl IngestErrorCodes {
    /// Socket could not be bound to the requested address
    pub const BIND_FAILED: i32 = 1001;

    /// A socket option (reuse, broadcast, timeout) could not be applied
    pub const SOCKET_OPTION: i32 = 1002;

    /// Listener is already running
    pub const ALREADY_RUNNING: i32 = 1003;

    /// Listener is not running
    pub const NOT_RUNNING: i32 = 1004;

    /// Listener thread panicked before it could be joined
    pub const THREAD_PANICKED: i32 = 1005;

    /// Other I/O failure
    pub const IO: i32 = 1006;
}

/// Log an ingest error with structured context
///
/// Emits the numeric code, the component and the message on one line so the
/// record can be grepped alongside the listener's own receive logs.
pub fn log_ingest_error(err: &IngestError, context: &str) {
    error!(
        "Ingest error in {}: code={}, component=UdpListener, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Ingest-related errors
///
/// These cover the listener lifecycle. Per-datagram problems (bad UTF-8,
/// invalid JSON, socket hiccups inside the loop) are logged and counted but
/// never surface as an `IngestError`.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Binding the UDP socket failed
    BindFailed { address: String, reason: String },

    /// Applying a socket option failed
    SocketOption { option: &'static str, reason: String },

    /// `start` called on a running listener
    AlreadyRunning,

    /// `stop` called on an idle listener
    NotRunning,

    /// The receive thread panicked
    ThreadPanicked,

    /// Any other I/O failure
    Io { details: String },
}

impl ErrorCode for IngestError {
    fn code(&self) -> i32 {
        match self {
            IngestError::BindFailed { .. } => IngestErrorCodes::BIND_FAILED,
            IngestError::SocketOption { .. } => IngestErrorCodes::SOCKET_OPTION,
            IngestError::AlreadyRunning => IngestErrorCodes::ALREADY_RUNNING,
            IngestError::NotRunning => IngestErrorCodes::NOT_RUNNING,
            IngestError::ThreadPanicked => IngestErrorCodes::THREAD_PANICKED,
            IngestError::Io { .. } => IngestErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            IngestError::BindFailed { address, reason } => {
                format!("Failed to bind UDP socket on {}: {}", address, reason)
            }
            IngestError::SocketOption { option, reason } => {
                format!("Failed to set socket option {}: {}", option, reason)
            }
            IngestError::AlreadyRunning => {
                "Listener already running. Call stop() first.".to_string()
            }
            IngestError::NotRunning => "Listener not running. Call start() first.".to_string(),
            IngestError::ThreadPanicked => "Listener thread panicked".to_string(),
            IngestError::Io { details } => format!("I/O error: {}", details),
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IngestError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io {
            details: err.to_string(),
        }
    }
}
