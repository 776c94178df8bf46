//! Error types for the party-line client.
//!
//! Failures are split the way callers need to branch on them:
//! [`ConnectionError`] when no logged-in session could be obtained,
//! [`IoError`] when a command failed on an established session, and
//! [`CommandError`] wrapping either (plus invalid input) for `send`.

use std::io;
use std::time::Duration;

use partyline_protocol::ProtocolError;
use thiserror::Error;

use crate::session::HandshakeStage;

/// The socket could not be opened or the login handshake did not complete.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Handle or password cannot be sent as a single line.
    #[error("invalid connection config: {0}")]
    InvalidConfig(String),

    /// Connection refused or otherwise failed to open.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Dialing took longer than the connect timeout.
    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout {
        /// `host:port` that was dialed.
        addr: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// The peer closed the stream before the handshake completed.
    #[error("connection closed by peer while {stage}")]
    Closed {
        /// Stage at which the stream ended.
        stage: HandshakeStage,
    },

    /// Socket error during the handshake.
    #[error("I/O error while {stage}: {source}")]
    Io {
        /// Stage at which the error happened.
        stage: HandshakeStage,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The peer sent a line longer than the codec accepts.
    #[error("oversized line while {stage}: {source}")]
    LineTooLong {
        /// Stage at which the line arrived.
        stage: HandshakeStage,
        /// Codec error.
        #[source]
        source: ProtocolError,
    },

    /// The expected prompt did not arrive within the handshake timeout.
    #[error("handshake timed out after {timeout:?} while {stage}")]
    HandshakeTimeout {
        /// Stage that was still waiting.
        stage: HandshakeStage,
        /// Configured handshake timeout.
        timeout: Duration,
    },

    /// The cancellation token fired.
    #[error("connection cancelled while {stage}")]
    Cancelled {
        /// Stage that was interrupted.
        stage: HandshakeStage,
    },
}

impl ConnectionError {
    /// Stage of the handshake at which the failure happened.
    pub fn stage(&self) -> HandshakeStage {
        match self {
            ConnectionError::InvalidConfig(_)
            | ConnectionError::Connect { .. }
            | ConnectionError::ConnectTimeout { .. } => HandshakeStage::Dialing,
            ConnectionError::Closed { stage }
            | ConnectionError::Io { stage, .. }
            | ConnectionError::LineTooLong { stage, .. }
            | ConnectionError::HandshakeTimeout { stage, .. }
            | ConnectionError::Cancelled { stage } => *stage,
        }
    }
}

/// A command failed on an established session.
///
/// The session is invalidated whenever one of these is returned, so the next
/// command performs a full reconnect and handshake.
#[derive(Debug, Error)]
pub enum IoError {
    /// Writing the command line failed.
    #[error("failed to write command: {0}")]
    Write(#[source] io::Error),

    /// Reading the reply line failed.
    #[error("failed to read reply: {0}")]
    Read(#[source] io::Error),

    /// The peer closed the stream before replying.
    #[error("connection closed by peer before reply")]
    Closed,

    /// The reply line was longer than the codec accepts.
    #[error("oversized reply: {0}")]
    LineTooLong(#[source] ProtocolError),

    /// No reply within the response timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The cancellation token fired.
    #[error("command cancelled")]
    Cancelled,
}

/// Errors returned by [`Controller::send`](crate::Controller::send) and the
/// catalogue methods.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command was rejected before anything was written.
    #[error(transparent)]
    InvalidCommand(#[from] ProtocolError),

    /// No logged-in session could be obtained; nothing was written.
    #[error("not connected: {0}")]
    NotConnected(#[source] ConnectionError),

    /// The session failed while the command was in flight.
    #[error("command failed: {0}")]
    Io(#[source] IoError),
}

impl CommandError {
    /// True if the failure happened before a session was available.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, CommandError::NotConnected(_))
    }

    /// True if the failure happened on an established session.
    pub fn is_io_failure(&self) -> bool {
        matches!(self, CommandError::Io(_))
    }

    /// Short label used for metrics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CommandError::InvalidCommand(_) => "invalid",
            CommandError::NotConnected(_) => "not_connected",
            CommandError::Io(_) => "io",
        }
    }
}

/// Result type alias for commands.
pub type CommandResult<T> = Result<T, CommandError>;
