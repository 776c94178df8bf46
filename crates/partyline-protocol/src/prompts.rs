//! Login prompts sent by the console during the handshake.
//!
//! The console is free text, so each prompt is recognised by a substring
//! rather than by position. Lines that match nothing (banners, MOTD) are
//! skipped by the caller.

/// Default pattern for the handle prompt.
pub const DEFAULT_HANDLE_PROMPT: &str = "please enter your handle";

/// Default pattern for the password prompt.
pub const DEFAULT_PASSWORD_PROMPT: &str = "enter your password";

/// Default pattern for the join confirmation.
pub const DEFAULT_JOINED_PROMPT: &str = "joined the party line";

/// The three prompts of the login sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// "Please enter your handle."
    Handle,
    /// "Enter your password."
    Password,
    /// "*** admin joined the party line."
    Joined,
}

impl Prompt {
    /// Short lowercase name, used in logs and metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Prompt::Handle => "handle",
            Prompt::Password => "password",
            Prompt::Joined => "joined",
        }
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substrings identifying each login prompt.
///
/// Matching is case-insensitive, so the defaults accept both
/// `Please enter your handle.` and `please enter your handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PromptPatterns {
    /// Pattern for the handle prompt.
    pub handle: String,
    /// Pattern for the password prompt.
    pub password: String,
    /// Pattern for the join confirmation.
    pub joined: String,
}

impl Default for PromptPatterns {
    fn default() -> Self {
        PromptPatterns {
            handle: DEFAULT_HANDLE_PROMPT.to_string(),
            password: DEFAULT_PASSWORD_PROMPT.to_string(),
            joined: DEFAULT_JOINED_PROMPT.to_string(),
        }
    }
}

impl PromptPatterns {
    /// Get the pattern for a prompt.
    pub fn pattern(&self, prompt: Prompt) -> &str {
        match prompt {
            Prompt::Handle => &self.handle,
            Prompt::Password => &self.password,
            Prompt::Joined => &self.joined,
        }
    }

    /// Check whether `line` is the given prompt.
    pub fn matches(&self, prompt: Prompt, line: &str) -> bool {
        line.to_lowercase()
            .contains(&self.pattern(prompt).to_lowercase())
    }
}
