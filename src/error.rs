//! Error types for the promptpipe CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for promptpipe operations.
///
/// Each variant maps to a distinct exit code. No variant is ever swallowed or
/// retried internally; every failure surfaces at the process boundary.
#[derive(Error, Debug)]
pub enum PipeError {
    /// Invalid CLI flags or configuration file contents.
    #[error("{0}")]
    Config(String),

    /// Input file unreadable or not valid text, or output file unwritable.
    #[error("I/O error: {0}")]
    Io(String),

    /// The generation backend failed: model load, inference, or decode fault.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The response marker was not found in the generated exchange.
    ///
    /// This is a hard error rather than a silent fallback: writing the whole
    /// exchange (prompt included) to the output file would violate the
    /// contract of "write only the completion".
    #[error("response marker '{0}' not found in generated text")]
    MarkerNotFound(String),
}

impl PipeError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipeError::Config(_) => exit_codes::CONFIG_ERROR,
            PipeError::Io(_) => exit_codes::IO_FAILURE,
            PipeError::Generation(_) => exit_codes::GENERATION_FAILURE,
            PipeError::MarkerNotFound(_) => exit_codes::MARKER_FAILURE,
        }
    }
}

/// Result type alias for promptpipe operations.
pub type Result<T> = std::result::Result<T, PipeError>;
