//! Error types for the party-line protocol.

use thiserror::Error;

/// Errors that can occur when building commands or decoding lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Invalid command format (bad token, embedded line break, ...).
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// No catalogue entry with the given name.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Wrong number of arguments for a catalogue operation.
    #[error("{operation} takes {min}..={max} arguments, got {actual}")]
    ArgumentCount {
        /// Operation name.
        operation: &'static str,
        /// Number of required parameters.
        min: usize,
        /// Total number of parameters.
        max: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// A required argument was empty.
    #[error("{operation}: missing required argument '{param}'")]
    MissingArgument {
        /// Operation name.
        operation: &'static str,
        /// Parameter name.
        param: &'static str,
    },

    /// A single-word argument contained whitespace.
    #[error("{operation}: argument '{param}' must be a single word")]
    UnexpectedWhitespace {
        /// Operation name.
        operation: &'static str,
        /// Parameter name.
        param: &'static str,
    },

    /// Buffer overflow (line too long without a terminator).
    #[error("buffer overflow: max {max} bytes, got {actual}")]
    BufferOverflow { max: usize, actual: usize },
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
