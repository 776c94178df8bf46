//! Async client for a bot's party-line admin console.
//!
//! The console is a raw TCP socket speaking free text. A [`Controller`]
//! logs in with a handle and password on first use, then sends one command
//! line per call and returns the single reply line verbatim.
//!
//! # Example
//!
//! ```rust,no_run
//! use partyline_client::{ConnectionConfig, Controller};
//!
//! # async fn run() -> Result<(), partyline_client::CommandError> {
//! let config = ConnectionConfig::new("bot.example.net", 3333, "admin", "secret");
//! let mut bot = Controller::new(config);
//!
//! let reply = bot.add_channel("#test", Some("+nodesynch")).await?;
//! println!("{reply}");
//!
//! bot.kick("#test", "baduser", Some("spam")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Failure handling
//!
//! - Invalid input fails with [`CommandError::InvalidCommand`] before any
//!   I/O.
//! - If no session can be established the call fails with
//!   [`CommandError::NotConnected`].
//! - If the session breaks mid-command the call fails with
//!   [`CommandError::Io`] and the next call reconnects from scratch.
//!
//! There is no automatic retry.

mod config;
mod dispatcher;
mod error;
mod session;
mod transport;

pub use config::*;
pub use dispatcher::Controller;
pub use error::*;
pub use session::{HandshakeStage, Session, SessionManager, SessionState};
pub use transport::{Connector, TcpConnector};

pub use partyline_protocol::{Command, Operation, PromptPatterns, ProtocolError};
pub use tokio_util::sync::CancellationToken;
