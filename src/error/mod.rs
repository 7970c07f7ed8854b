// Error types for the live pitch pipeline
//
// This module defines custom error types for ingestion, session lifecycle and
// classification model operations, each carrying a stable numeric code so
// presentation layers can react without matching on message text.

mod ingest;
mod model;
mod session;

pub use ingest::{log_ingest_error, IngestError, IngestErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent handling by whatever
/// consumes the session (CLI, display layer, upload sink).
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
