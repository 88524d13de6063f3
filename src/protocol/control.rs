//! Control channel: short ASCII messages carried inline with frame bodies.
//!
//! Every control message is decimal ASCII text terminated by a single `\n`:
//! ```text
//! 3\n            total frame count
//! 1\n            frame-number increment
//! 2000\n         body size of the next frame
//! OK FRAME 2\n   acknowledgment (receiver -> sender)
//! ```
//!
//! The terminator counts toward the [`MAX_CONTROL_MESSAGE_LEN`] bound.
//!
//! # Example
//!
//! ```
//! use framewire::protocol::{ControlBuffer, ControlMessage};
//!
//! let mut buffer = ControlBuffer::new();
//! let messages = buffer.push(b"3\n1\nOK FRA").unwrap();
//! assert_eq!(messages, vec!["3".to_string(), "1".to_string()]);
//!
//! let messages = buffer.push(b"ME 0\n").unwrap();
//! assert_eq!(ControlMessage::parse(&messages[0]).unwrap(), ControlMessage::Ack(0));
//! ```

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{FramewireError, Result};

/// Upper bound for one control message, terminator included.
pub const MAX_CONTROL_MESSAGE_LEN: usize = 1024;

/// Byte that ends every control message.
pub const TERMINATOR: u8 = b'\n';

/// Literal prefix of an acknowledgment.
pub const ACK_PREFIX: &str = "OK FRAME ";

/// Render a value as a terminated control message.
pub fn encode<T: fmt::Display>(value: T) -> Bytes {
    let mut text = value.to_string();
    text.push(TERMINATOR as char);
    Bytes::from(text)
}

/// Decode raw message bytes as UTF-8 and strip newline characters.
pub fn decode_message(raw: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| FramewireError::Protocol(format!("Control message is not UTF-8: {}", e)))?;
    Ok(text.chars().filter(|c| *c != '\n' && *c != '\r').collect())
}

/// A typed control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Decimal integer: frame count, increment or body size.
    Value(u64),
    /// `OK FRAME <n>`.
    Ack(u64),
}

impl ControlMessage {
    /// Encode with terminator.
    pub fn encode(&self) -> Bytes {
        encode(self)
    }

    /// Parse a decoded (terminator-free) message.
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(frame) = parse_ack(text) {
            return Ok(Self::Ack(frame));
        }
        parse_value(text, "control value").map(Self::Value)
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{}", value),
            Self::Ack(frame) => write!(f, "{}{}", ACK_PREFIX, frame),
        }
    }
}

/// Parse a decimal control value; `what` names it in the error.
///
/// Only ASCII digits are accepted: no sign, no surrounding whitespace.
pub fn parse_value(text: &str, what: &str) -> Result<u64> {
    let invalid =
        || FramewireError::Protocol(format!("Expected {} as decimal integer, got {:?}", what, text));
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    text.parse::<u64>().map_err(|_| invalid())
}

/// Frame number of an `OK FRAME <n>` message, or `None` for anything else.
pub fn parse_ack(text: &str) -> Option<u64> {
    let number = text.strip_prefix(ACK_PREFIX)?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    number.parse().ok()
}

/// Accumulates socket bytes and splits them into control messages.
///
/// Bytes left over after a message (the start of a frame body, typically)
/// stay buffered and are handed out by [`ControlBuffer::drain_into`].
pub struct ControlBuffer {
    /// Bytes read from the socket and not yet consumed.
    buffer: BytesMut,
    /// Longest accepted message, terminator included.
    max_message_len: usize,
}

impl ControlBuffer {
    /// Create a buffer with the default message bound.
    pub fn new() -> Self {
        Self::with_max_message_len(MAX_CONTROL_MESSAGE_LEN)
    }

    /// Create a buffer with a custom message bound.
    pub fn with_max_message_len(max_message_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            max_message_len,
        }
    }

    /// Append data and extract every complete message.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<String>> {
        self.extend(data);

        let mut messages = Vec::new();
        while let Some(message) = self.next_message()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Append data without extracting messages.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract the next complete message, if one is buffered.
    ///
    /// Fails once the buffered bytes exceed the bound without a terminator.
    pub fn next_message(&mut self) -> Result<Option<String>> {
        match self.buffer.iter().position(|&b| b == TERMINATOR) {
            Some(pos) if pos < self.max_message_len => {
                let raw = self.buffer.split_to(pos + 1);
                decode_message(&raw[..pos]).map(Some)
            }
            Some(pos) => Err(self.too_long(pos + 1)),
            None if self.buffer.len() >= self.max_message_len => {
                Err(self.too_long(self.buffer.len()))
            }
            None => Ok(None),
        }
    }

    fn too_long(&self, len: usize) -> FramewireError {
        FramewireError::Protocol(format!(
            "Control message of {} bytes exceeds maximum {}",
            len, self.max_message_len
        ))
    }

    /// Move up to `out.len()` buffered bytes into `out`.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.buffer.len());
        let chunk = self.buffer.split_to(n);
        out[..n].copy_from_slice(&chunk);
        n
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for ControlBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_terminator() {
        assert_eq!(&encode(3u64)[..], b"3\n");
        assert_eq!(&encode("OK FRAME 12")[..], b"OK FRAME 12\n");
        assert_eq!(&ControlMessage::Value(2000).encode()[..], b"2000\n");
        assert_eq!(&ControlMessage::Ack(0).encode()[..], b"OK FRAME 0\n");
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(ControlMessage::parse("42").unwrap(), ControlMessage::Value(42));
        assert_eq!(
            ControlMessage::parse("OK FRAME 9").unwrap(),
            ControlMessage::Ack(9)
        );
        assert!(ControlMessage::parse("OK FRAME").is_err());
        assert!(ControlMessage::parse("hello").is_err());
        assert!(ControlMessage::parse("-1").is_err());
    }

    #[test]
    fn test_parse_ack_is_exact() {
        assert_eq!(parse_ack("OK FRAME 5"), Some(5));
        assert_eq!(parse_ack("OK FRAME 5 "), None);
        assert_eq!(parse_ack("ok frame 5"), None);
        assert_eq!(parse_ack("OK FRAME +5"), None);
        assert_eq!(parse_ack("5"), None);
    }

    #[test]
    fn test_parse_value_digits_only() {
        assert_eq!(parse_value("0", "frame size").unwrap(), 0);
        assert_eq!(parse_value("2000", "frame size").unwrap(), 2000);
        for text in ["", " 5", "5 ", " +5 ", "+5", "-1", "5x", "18446744073709551616"] {
            assert!(parse_value(text, "frame size").is_err(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_parse_value_names_field() {
        let err = parse_value("abc", "frame size").unwrap_err();
        assert!(err.to_string().contains("frame size"));
    }

    #[test]
    fn test_decode_strips_newlines() {
        assert_eq!(decode_message(b"12\r").unwrap(), "12");
        assert_eq!(decode_message(b"1\n2").unwrap(), "12");
        assert!(decode_message(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_coalesced_messages() {
        let mut buffer = ControlBuffer::new();
        let messages = buffer.push(b"3\n1\n10\n").unwrap();
        assert_eq!(messages, vec!["3", "1", "10"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_message() {
        let mut buffer = ControlBuffer::new();
        assert!(buffer.push(b"20").unwrap().is_empty());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.push(b"00\n").unwrap(), vec!["2000"]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = ControlBuffer::new();
        let mut all = Vec::new();
        for byte in b"OK FRAME 7\n" {
            all.extend(buffer.push(&[*byte]).unwrap());
        }
        assert_eq!(all, vec!["OK FRAME 7"]);
    }

    #[test]
    fn test_body_bytes_stay_buffered() {
        let mut buffer = ControlBuffer::new();
        buffer.extend(b"4\n\x00\n\xFF\x01");

        assert_eq!(buffer.next_message().unwrap(), Some("4".to_string()));

        let mut body = [0u8; 8];
        let n = buffer.drain_into(&mut body);
        assert_eq!(&body[..n], b"\x00\n\xFF\x01");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_into_respects_output_len() {
        let mut buffer = ControlBuffer::new();
        buffer.extend(b"abcdef");

        let mut out = [0u8; 4];
        assert_eq!(buffer.drain_into(&mut out), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_unterminated_overlong_message_rejected() {
        let mut buffer = ControlBuffer::with_max_message_len(8);
        let result = buffer.push(b"123456789");
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_terminated_overlong_message_rejected() {
        let mut buffer = ControlBuffer::with_max_message_len(4);
        assert!(buffer.push(b"12345\n").is_err());
    }

    #[test]
    fn test_message_at_bound_accepted() {
        let mut buffer = ControlBuffer::with_max_message_len(4);
        assert_eq!(buffer.push(b"123\n").unwrap(), vec!["123"]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = ControlBuffer::new();
        buffer.extend(b"partial");
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
