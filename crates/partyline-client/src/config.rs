//! Connection configuration.

use std::time::Duration;

use partyline_protocol::{Prompt, PromptPatterns};
use serde::{Deserialize, Serialize};

/// Default timeout for opening the socket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for the whole login sequence after the socket is open.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for one command round trip.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds on every blocking point of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Opening the TCP connection.
    #[serde(rename = "connect_ms", with = "duration_ms")]
    pub connect: Duration,
    /// Handle prompt through join confirmation.
    #[serde(rename = "handshake_ms", with = "duration_ms")]
    pub handshake: Duration,
    /// Writing a command and reading its reply.
    #[serde(rename = "response_ms", with = "duration_ms")]
    pub response: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            connect: DEFAULT_CONNECT_TIMEOUT,
            handshake: DEFAULT_HANDSHAKE_TIMEOUT,
            response: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Use the same timeout for every blocking point.
    pub fn uniform(timeout: Duration) -> Self {
        Timeouts {
            connect: timeout,
            handshake: timeout,
            response: timeout,
        }
    }
}

/// Where to connect and how to log in.
///
/// Immutable once handed to a [`Controller`](crate::Controller).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Bot hostname or address.
    pub host: String,
    /// Party-line port.
    pub port: u16,
    /// Handle to log in with.
    pub handle: String,
    /// Password for the handle.
    pub password: String,
    /// Timeouts for the session.
    #[serde(default)]
    pub timeouts: Timeouts,
    /// Login prompt patterns.
    #[serde(default)]
    pub prompts: PromptPatterns,
}

impl ConnectionConfig {
    /// Create a config with default timeouts and prompts.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        handle: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        ConnectionConfig {
            host: host.into(),
            port,
            handle: handle.into(),
            password: password.into(),
            timeouts: Timeouts::default(),
            prompts: PromptPatterns::default(),
        }
    }

    /// Replace the timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replace the login prompt patterns.
    pub fn with_prompts(mut self, prompts: PromptPatterns) -> Self {
        self.prompts = prompts;
        self
    }

    /// `host:port`, for messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check that the credentials can be sent as single lines and that
    /// every prompt pattern is non-blank.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host is empty".to_string());
        }
        for (name, value) in [("handle", &self.handle), ("password", &self.password)] {
            if value.is_empty() {
                return Err(format!("{} is empty", name));
            }
            if value.contains(['\r', '\n']) {
                return Err(format!("{} contains a line break", name));
            }
        }
        // An empty pattern matches every line, including banners.
        for prompt in [Prompt::Handle, Prompt::Password, Prompt::Joined] {
            if self.prompts.pattern(prompt).trim().is_empty() {
                return Err(format!("{} prompt pattern is empty", prompt));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("handle", &self.handle)
            .field("password", &"<redacted>")
            .field("timeouts", &self.timeouts)
            .field("prompts", &self.prompts)
            .finish()
    }
}

/// Serialize a [`Duration`] as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
