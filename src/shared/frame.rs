//! STOMP Frame Codec
//!
//! Frames travel as WebSocket text messages in STOMP 1.2 layout:
//!
//! ```text
//! COMMAND
//! header1:value1
//! header2:value2
//!
//! body^@
//! ```
//!
//! # Escaping
//!
//! Header names and values escape `\\`, `\n`, `\r` and `:` as `\\\\`, `\\n`,
//! `\\r` and `\\c`. CONNECT and CONNECTED frames are exempt, so a bearer
//! token in the handshake is carried verbatim.
//!
//! # Leniency
//!
//! - The trailing NUL is optional on input
//! - A message made only of end-of-line characters is a heart-beat and
//!   parses to `None`
//! - When a header repeats, the first occurrence wins
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Frame codec errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Command line names no STOMP command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Header line without a colon
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    /// Undefined escape sequence in a header
    #[error("Invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    /// content-length that is not a number or does not fit the body
    #[error("Invalid content-length")]
    InvalidContentLength,

    /// Frame ended before the blank line closing the headers
    #[error("Incomplete frame")]
    Incomplete,
}

/// STOMP commands, client and server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// CONNECT or its STOMP alias
    pub fn is_handshake(&self) -> bool {
        matches!(self, Command::Connect | Command::Stomp)
    }

    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Stomp | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "CONNECTED" => Command::Connected,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(FrameError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// A single STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header (exact name match)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value of a header, ignoring ASCII case of the name
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `destination` header
    pub fn destination(&self) -> Option<&str> {
        self.get("destination")
    }

    /// `receipt` header requested by the client
    pub fn receipt(&self) -> Option<&str> {
        self.get("receipt")
    }

    /// CONNECTED acknowledgment
    pub fn connected(user_name: Option<&str>) -> Self {
        let frame = Frame::new(Command::Connected)
            .header("version", "1.2")
            .header("heart-beat", "0,0");
        match user_name {
            Some(name) => frame.header("user-name", name),
            None => frame,
        }
    }

    /// ERROR frame carrying a short message
    pub fn error(message: impl Into<String>, receipt_id: Option<&str>) -> Self {
        let message = message.into();
        let frame = Frame::new(Command::Error)
            .header("message", message.clone())
            .header("content-type", "text/plain");
        let frame = match receipt_id {
            Some(id) => frame.header("receipt-id", id),
            None => frame,
        };
        frame.with_body(message)
    }

    /// RECEIPT for a client frame that asked for one
    pub fn receipt_for(receipt_id: &str) -> Self {
        Frame::new(Command::Receipt).header("receipt-id", receipt_id)
    }

    /// MESSAGE delivered on a subscription
    pub fn message(
        subscription: &str,
        message_id: &str,
        destination: &str,
        body: impl Into<String>,
    ) -> Self {
        Frame::new(Command::Message)
            .header("subscription", subscription)
            .header("message-id", message_id)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body)
    }

    /// Parse one frame from a text message
    ///
    /// # Returns
    /// * `Ok(Some(frame))` - A complete frame
    /// * `Ok(None)` - A heart-beat (only end-of-line characters)
    /// * `Err(FrameError)` - Malformed input
    pub fn parse(input: &str) -> Result<Option<Frame>, FrameError> {
        let mut rest = input.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(None);
        }

        let command_line = next_line(&mut rest).ok_or(FrameError::Incomplete)?;
        let command: Command = command_line.parse()?;
        let escaped = command.escapes_headers();

        let mut headers = Vec::new();
        loop {
            let line = next_line(&mut rest).ok_or(FrameError::Incomplete)?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            if escaped {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let mut frame = Frame {
            command,
            headers,
            body: String::new(),
        };

        let body = match frame.get("content-length") {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| FrameError::InvalidContentLength)?;
                let body = rest.get(..len).ok_or(FrameError::InvalidContentLength)?;
                let tail = &rest[len..];
                if !(tail.is_empty() || tail.starts_with('\0')) {
                    return Err(FrameError::InvalidContentLength);
                }
                body
            }
            None => rest.split('\0').next().unwrap_or_default(),
        };
        frame.body = body.to_string();
        Ok(Some(frame))
    }

    /// Encode the frame into its wire text, NUL-terminated
    pub fn encode(&self) -> String {
        let escaped = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Split off the next line, dropping a trailing `\r`
fn next_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let idx = rest.find('\n')?;
    let line = &rest[..idx];
    *rest = &rest[idx + 1..];
    Some(line.strip_suffix('\r').unwrap_or(line))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_connect_with_token() {
        let raw = "CONNECT\naccept-version:1.2\nAuthorization:Bearer abc.def:ghi\n\n\0";
        let frame = Frame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.command, Command::Connect);
        assert_eq!(frame.get_ignore_case("authorization"), Some("Bearer abc.def:ghi"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_parse_send_with_body_and_crlf() {
        let raw = "SEND\r\ndestination:app.chat.1.send\r\n\r\n{\"content\":\"hi\"}\0\n";
        let frame = Frame::parse(raw).unwrap().unwrap();
        assert_eq!(frame.command, Command::Send);
        assert_eq!(frame.destination(), Some("app.chat.1.send"));
        assert_eq!(frame.body, "{\"content\":\"hi\"}");
    }

    #[test]
    fn test_parse_without_trailing_nul() {
        let frame = Frame::parse("SUBSCRIBE\nid:sub-0\ndestination:room.1\n\n")
            .unwrap()
            .unwrap();
        assert_eq!(frame.command, Command::Subscribe);
        assert_eq!(frame.get("id"), Some("sub-0"));
    }

    #[test]
    fn test_heartbeat_is_none() {
        assert_eq!(Frame::parse("\n").unwrap(), None);
        assert_eq!(Frame::parse("\r\n").unwrap(), None);
        assert_eq!(Frame::parse("").unwrap(), None);
    }

    #[test]
    fn test_first_repeated_header_wins() {
        let frame = Frame::parse("SEND\ndestination:a\ndestination:b\n\n\0")
            .unwrap()
            .unwrap();
        assert_eq!(frame.destination(), Some("a"));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Frame::parse("HELLO\n\n\0"),
            Err(FrameError::UnknownCommand("HELLO".to_string()))
        );
    }

    #[test]
    fn test_malformed_and_incomplete() {
        assert_eq!(
            Frame::parse("SEND\nno-colon\n\n\0"),
            Err(FrameError::MalformedHeader("no-colon".to_string()))
        );
        assert_eq!(Frame::parse("SEND\ndestination:x"), Err(FrameError::Incomplete));
        assert!(matches!(
            Frame::parse("SEND\nbad:\\t\n\n\0"),
            Err(FrameError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_content_length_allows_nul_in_body() {
        let frame = Frame::parse("SEND\ncontent-length:3\n\na\0b\0").unwrap().unwrap();
        assert_eq!(frame.body, "a\0b");
        assert_eq!(
            Frame::parse("SEND\ncontent-length:9\n\nabc\0"),
            Err(FrameError::InvalidContentLength)
        );
    }

    #[test]
    fn test_escaping_applies_except_on_connect() {
        let frame = Frame::new(Command::Message).header("note", "a:b\nc");
        let wire = frame.encode();
        assert!(wire.contains("note:a\\cb\\nc\n"));
        let back = Frame::parse(&wire).unwrap().unwrap();
        assert_eq!(back.get("note"), Some("a:b\nc"));

        let connected = Frame::connected(Some("user:1"));
        assert!(connected.encode().contains("user-name:user:1\n"));
    }

    #[test]
    fn test_encode_adds_content_length_for_body() {
        let wire = Frame::message("sub-0", "m-1", "room.1", "{}").encode();
        assert!(wire.starts_with("MESSAGE\n"));
        assert!(wire.contains("content-length:2\n"));
        assert!(wire.ends_with("\n\n{}\0"));
    }

    #[test]
    fn test_error_frame_headers() {
        let frame = Frame::error("access denied", Some("r-7"));
        assert_eq!(frame.command, Command::Error);
        assert_eq!(frame.get("message"), Some("access denied"));
        assert_eq!(frame.get("receipt-id"), Some("r-7"));
    }
}
