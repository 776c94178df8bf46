//! Party-line console protocol
//!
//! This crate provides types and utilities for talking to a bot's interactive
//! party-line console over a raw socket. It performs no I/O itself; the
//! `partyline-client` crate drives a socket with these pieces.
//!
//! # Protocol Overview
//!
//! The console is a line-based free-text interface:
//!
//! - **Login** (bot → host): a handle prompt, a password prompt and a join
//!   confirmation, possibly interleaved with banner/MOTD lines
//! - **Commands** (host → bot): `<token> <args...>` terminated with `\n`
//! - **Responses** (bot → host): one free-text line per command, passed
//!   through uninterpreted
//!
//! # Example
//!
//! ```rust
//! use partyline_protocol::{LineCodec, Operation, Prompt, PromptPatterns};
//!
//! // Build a command from the catalogue
//! let cmd = Operation::Kick.command(&["#test", "baduser", "spam"])?;
//! assert_eq!(cmd.encode(), b".kick #test baduser spam\n");
//!
//! // Split received bytes into lines
//! let mut codec = LineCodec::new();
//! codec.push(b"Please enter your handle.\n");
//! let line = codec.decode_line()?.unwrap();
//! assert!(PromptPatterns::default().matches(Prompt::Handle, &line));
//! # Ok::<(), partyline_protocol::ProtocolError>(())
//! ```

mod codec;
mod commands;
mod error;
mod operations;
mod prompts;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use operations::*;
pub use prompts::*;
