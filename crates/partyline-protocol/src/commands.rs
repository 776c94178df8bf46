//! Command lines sent to the party-line console.
//!
//! A command line is a fixed leading token (e.g. `.chanset`) followed by the
//! arguments joined with single spaces. Commands are validated on
//! construction so that an encoded command is always exactly one line.

use crate::codec::LineCodec;
use crate::error::{ProtocolError, ProtocolResult};

/// A single command request: token plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    token: String,
    args: Vec<String>,
}

impl Command {
    /// Build a command from a token and its arguments.
    ///
    /// Empty arguments are dropped so that optional trailing arguments never
    /// leave a dangling space. Fails if the token is empty or contains
    /// whitespace, or if any part contains a line break.
    pub fn new<I, S>(token: &str, args: I) -> ProtocolResult<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_token(token)?;

        let args: Vec<String> = args
            .into_iter()
            .map(Into::into)
            .filter(|arg: &String| !arg.is_empty())
            .collect();

        if let Some(arg) = args.iter().find(|arg| contains_line_break(arg)) {
            return Err(ProtocolError::InvalidCommand(format!(
                "argument {:?} contains a line break",
                arg
            )));
        }

        Ok(Command {
            token: token.to_string(),
            args,
        })
    }

    /// Build a command from a token and a preformatted argument line.
    pub fn with_argument_line(token: &str, argument_line: &str) -> ProtocolResult<Command> {
        Command::new(token, [argument_line])
    }

    /// The command token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The arguments, in wire order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the command line without the terminator.
    pub fn to_command_string(&self) -> String {
        if self.args.is_empty() {
            self.token.clone()
        } else {
            format!("{} {}", self.token, self.args.join(" "))
        }
    }

    /// Encode the command as a line to send to the console.
    /// Returns the bytes to send (including the `\n` terminator).
    pub fn encode(&self) -> Vec<u8> {
        LineCodec::encode_line(&self.to_command_string())
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_command_string())
    }
}

fn contains_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

fn validate_token(token: &str) -> ProtocolResult<()> {
    if token.is_empty() {
        return Err(ProtocolError::InvalidCommand("empty command token".to_string()));
    }
    if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ProtocolError::InvalidCommand(format!(
            "command token {:?} contains whitespace or control characters",
            token
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_args() {
        let cmd = Command::new(".+chan", ["#test", "+nodesynch"]).unwrap();
        assert_eq!(cmd.encode(), b".+chan #test +nodesynch\n");
    }

    #[test]
    fn test_encode_without_args() {
        let cmd = Command::new(".version", Vec::<String>::new()).unwrap();
        assert_eq!(cmd.encode(), b".version\n");
    }

    #[test]
    fn test_empty_argument_line_has_no_trailing_space() {
        let cmd = Command::with_argument_line(".uptime", "").unwrap();
        assert_eq!(cmd.to_command_string(), ".uptime");
    }

    #[test]
    fn test_argument_line_is_passed_through() {
        let cmd = Command::with_argument_line(".topic", "#test hello  world").unwrap();
        assert_eq!(cmd.to_command_string(), ".topic #test hello  world");
        assert_eq!(cmd.args().len(), 1);
    }

    #[test]
    fn test_empty_optional_dropped() {
        let cmd = Command::new(".kick", ["#test", "baduser", ""]).unwrap();
        assert_eq!(cmd.to_command_string(), ".kick #test baduser");
    }

    #[test]
    fn test_rejects_line_break_in_argument() {
        let err = Command::new(".topic", ["#test", "hi\n.die"]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand(_)));

        let err = Command::with_argument_line(".topic", "#test\r").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidCommand(_)));
    }

    #[test]
    fn test_rejects_bad_token() {
        assert!(Command::new("", ["x"]).is_err());
        assert!(Command::new(".chan set", ["x"]).is_err());
        assert!(Command::new(".die\n", Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_display_matches_command_string() {
        let cmd = Command::new(".op", ["#test", "alice"]).unwrap();
        assert_eq!(cmd.to_string(), ".op #test alice");
    }
}
