//! Line-based codec for party-line communication.
//!
//! Both directions are `\n`-terminated text lines. The console may also be
//! reached through a telnet-style listener, in which case the bot interleaves
//! telnet option negotiation (e.g. `IAC WILL ECHO` around the password
//! prompt) with the text. Those sequences are stripped before line splitting.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};

/// Line terminator used in both directions.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Maximum accepted length of a single received line, in bytes.
pub const MAX_LINE_LENGTH: usize = 4096;

const IAC: u8 = 0xFF;
const SB: u8 = 0xFA;
const SE: u8 = 0xF0;
const WILL: u8 = 0xFB;
const DONT: u8 = 0xFE;

/// Position inside a telnet command sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TelnetState {
    Data,
    Iac,
    Option,
    Subnegotiation,
    SubnegotiationIac,
}

/// A codec for reading and writing party-line lines.
///
/// This handles the line-based nature of the console:
/// - Accumulates received bytes until a complete line is found
/// - Drops telnet negotiation bytes, even when split across reads
/// - Refuses to buffer a line beyond the configured maximum length
#[derive(Debug)]
pub struct LineCodec {
    /// Buffer for accumulating incoming text.
    buffer: BytesMut,
    /// Telnet filter state carried between pushes.
    telnet: TelnetState,
    /// Longest line accepted before reporting an overflow.
    max_line_length: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new line codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create a new line codec accepting lines up to `max_line_length` bytes.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(256),
            telnet: TelnetState::Data,
            max_line_length,
        }
    }

    /// Add received data to the buffer, filtering telnet commands.
    pub fn push(&mut self, data: &[u8]) {
        for &byte in data {
            self.telnet = match (self.telnet, byte) {
                (TelnetState::Data, IAC) => TelnetState::Iac,
                (TelnetState::Data, _) => {
                    self.buffer.put_u8(byte);
                    TelnetState::Data
                }
                // IAC IAC is an escaped 0xFF data byte
                (TelnetState::Iac, IAC) => {
                    self.buffer.put_u8(IAC);
                    TelnetState::Data
                }
                (TelnetState::Iac, WILL..=DONT) => TelnetState::Option,
                (TelnetState::Iac, SB) => TelnetState::Subnegotiation,
                (TelnetState::Iac, _) => TelnetState::Data,
                (TelnetState::Option, _) => TelnetState::Data,
                (TelnetState::Subnegotiation, IAC) => TelnetState::SubnegotiationIac,
                (TelnetState::Subnegotiation, _) => TelnetState::Subnegotiation,
                (TelnetState::SubnegotiationIac, SE) => TelnetState::Data,
                (TelnetState::SubnegotiationIac, _) => TelnetState::Subnegotiation,
            };
        }
    }

    /// Try to decode one complete line from the buffer.
    ///
    /// Returns `Ok(Some(line))` with the terminator (and one trailing `\r`)
    /// removed, or `Ok(None)` if more data is needed. Empty lines are
    /// returned as empty strings. A line longer than the maximum is consumed
    /// and reported as [`ProtocolError::BufferOverflow`].
    ///
    /// Lines that are not valid UTF-8 are read as Latin-1, one char per
    /// byte, so no byte is lost.
    pub fn decode_line(&mut self) -> ProtocolResult<Option<String>> {
        let Some(end) = self.buffer.iter().position(|&b| b == LINE_TERMINATOR) else {
            if self.buffer.len() > self.max_line_length {
                let actual = self.buffer.len();
                self.buffer.clear();
                log::warn!("discarding unterminated line of {} bytes", actual);
                return Err(ProtocolError::BufferOverflow {
                    max: self.max_line_length,
                    actual,
                });
            }
            return Ok(None);
        };

        let line = self.buffer.split_to(end);
        self.buffer.advance(1);

        if line.len() > self.max_line_length {
            log::warn!("discarding line of {} bytes", line.len());
            return Err(ProtocolError::BufferOverflow {
                max: self.max_line_length,
                actual: line.len(),
            });
        }

        let text = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        Ok(Some(decode_text(text)))
    }

    /// Encode a line for transmission.
    ///
    /// Appends the `\n` terminator.
    pub fn encode_line(line: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(LINE_TERMINATOR);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer and telnet state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.telnet = TelnetState::Data;
    }
}

/// Decode a line as UTF-8, falling back to Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_line() {
        assert_eq!(LineCodec::encode_line(".+chan #test"), b".+chan #test\n");
    }

    #[test]
    fn test_decode_line() {
        let mut codec = LineCodec::new();
        codec.push(b"line1\nline2\r\n");

        assert_eq!(codec.decode_line().unwrap(), Some("line1".to_string()));
        assert_eq!(codec.decode_line().unwrap(), Some("line2".to_string()));
        assert_eq!(codec.decode_line().unwrap(), None);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_partial_line() {
        let mut codec = LineCodec::new();
        codec.push(b"#test ad");
        assert_eq!(codec.decode_line().unwrap(), None);

        codec.push(b"ded.\n");
        assert_eq!(codec.decode_line().unwrap(), Some("#test added.".to_string()));
    }

    #[test]
    fn test_empty_line_is_returned() {
        let mut codec = LineCodec::new();
        codec.push(b"\nnext\n");

        assert_eq!(codec.decode_line().unwrap(), Some(String::new()));
        assert_eq!(codec.decode_line().unwrap(), Some("next".to_string()));
    }

    #[test]
    fn test_only_one_carriage_return_is_stripped() {
        let mut codec = LineCodec::new();
        codec.push(b"  padded \r\r\n");

        assert_eq!(codec.decode_line().unwrap(), Some("  padded \r".to_string()));
    }

    #[test]
    fn test_telnet_negotiation_is_stripped() {
        let mut codec = LineCodec::new();
        // IAC WILL ECHO, then text, then IAC WONT ECHO
        codec.push(b"\xff\xfb\x01Enter your password.\xff\xfc\x01\n");

        assert_eq!(
            codec.decode_line().unwrap(),
            Some("Enter your password.".to_string())
        );
    }

    #[test]
    fn test_telnet_sequence_split_across_pushes() {
        let mut codec = LineCodec::new();
        codec.push(b"abc\xff");
        codec.push(b"\xfd");
        codec.push(b"\x03def\n");

        assert_eq!(codec.decode_line().unwrap(), Some("abcdef".to_string()));
    }

    #[test]
    fn test_telnet_subnegotiation_is_stripped() {
        let mut codec = LineCodec::new();
        codec.push(b"x\xff\xfa\x18\x01\xff\xf0y\n");

        assert_eq!(codec.decode_line().unwrap(), Some("xy".to_string()));
    }

    #[test]
    fn test_escaped_iac_is_kept() {
        let mut codec = LineCodec::new();
        codec.push(b"a\xff\xffb\n");

        assert_eq!(codec.decode_line().unwrap(), Some("a\u{ff}b".to_string()));
    }

    #[test]
    fn test_utf8_line_decoded_as_utf8() {
        let mut codec = LineCodec::new();
        codec.push("Café topic\n".as_bytes());

        assert_eq!(codec.decode_line().unwrap(), Some("Café topic".to_string()));
    }

    #[test]
    fn test_latin1_line_keeps_every_byte() {
        let mut codec = LineCodec::new();
        codec.push(b"Caf\xe9 topic \xa9\r\n");

        let line = codec.decode_line().unwrap().unwrap();
        assert_eq!(line, "Caf\u{e9} topic \u{a9}");
        let bytes: Vec<u8> = line.chars().map(|c| c as u8).collect();
        assert_eq!(bytes, b"Caf\xe9 topic \xa9");
    }

    #[test]
    fn test_unterminated_overflow() {
        let mut codec = LineCodec::with_max_line_length(8);
        codec.push(b"0123456789");

        assert_eq!(
            codec.decode_line(),
            Err(ProtocolError::BufferOverflow { max: 8, actual: 10 })
        );
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_terminated_overflow_is_consumed() {
        let mut codec = LineCodec::with_max_line_length(4);
        codec.push(b"toolong\nok\n");

        assert!(codec.decode_line().is_err());
        assert_eq!(codec.decode_line().unwrap(), Some("ok".to_string()));
    }
}
