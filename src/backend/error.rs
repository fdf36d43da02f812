//! Backend-specific error handling.

use std::time::Duration;

use thiserror::Error;

/// OpenCode backend errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The server could not be reached.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The server answered with a non-success status.
    #[error("OpenCode request failed: HTTP {status}: {body}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The server response could not be decoded.
    #[error("Invalid response format from OpenCode: {0}")]
    InvalidResponseFormat(String),

    /// A message reply carried no text part.
    #[error("No text response received from OpenCode")]
    NoTextResponse,

    /// The `opencode` binary is not on `PATH`.
    #[error("opencode binary not found in PATH")]
    BinaryNotFound,

    /// `opencode run` did not finish in time.
    #[error("opencode run timed out after {0:?}")]
    Timeout(Duration),

    /// `opencode run` exited unsuccessfully.
    #[error("opencode run failed ({status}): {stderr}")]
    ProcessFailed {
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
}
