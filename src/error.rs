// error.rs

//! # Error Handling Module
//!
//! Defines `AppError`, the single error type surfaced by a run. Every variant
//! maps to exit code 1; `main` prints the message and exits.
//!
//! # Usage Example
//! ```rust
//! use crate::error::AppError;
//!
//! fn example_function() -> Result<(), AppError> {
//!     Err(AppError::Validation("Invalid option -o. Use 'create' or 'delete'".to_string()))
//! }
//! ```

use thiserror::Error;

use crate::cloud::ClientError;
use crate::core::variables::VariablesError;

// ============================
// Application Error Definitions
// ============================

/// Represents errors that may occur within the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad command-line input or missing files. No remote call was made.
    #[error("{0}")]
    Validation(String),

    /// The variables file could not be loaded.
    #[error(transparent)]
    Variables(#[from] VariablesError),

    /// Describing the stack failed; its state is unknown.
    #[error("Error describing stack {stack}: {source}")]
    Query { stack: String, source: ClientError },

    /// The remote API rejected a mutating call.
    #[error("Stack {stack} {operation} request rejected: {source}")]
    Submit {
        stack: String,
        operation: String,
        source: ClientError,
    },

    /// The operation landed in a terminal status other than the expected one.
    #[error("Stack {stack} {operation} FAILED! ({status})")]
    OperationFailed {
        stack: String,
        operation: String,
        status: String,
    },

    /// The poll budget ran out before the stack settled.
    #[error("Timeout waiting for Stack {stack} ({operation}, {attempts} polls, last status {last})")]
    Timeout {
        stack: String,
        operation: String,
        attempts: u32,
        last: String,
    },

    /// Polling was interrupted locally.
    #[error("Stopped waiting for Stack {stack}; the remote operation continues")]
    Cancelled { stack: String },

    /// The AWS client could not be configured.
    #[error("AWS client error: {0}")]
    Client(String),

    /// Wrapper for standard I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
