//! Line framing for the receiver's text protocol.
//!
//! Wire format:
//! ```text
//! request:  [METHOD ' '] VERB [' ' ARG] '\r'     (or the empty line)
//! reply:    TOKEN (WS TOKEN)*                     (one bounded read)
//! ```
//!
//! The empty request line is the status probe: the receiver answers it
//! with its current channel status.

use std::fmt;

use crate::method::InputMethod;

/// Request line terminator.
pub const TERMINATOR: char = '\r';

/// An encoded request line, terminator included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    text: String,
}

impl CommandLine {
    /// Build a request line from its parts.
    ///
    /// The argument joins the verb with a single space before the method
    /// prefix is applied. An empty verb without argument encodes to the empty
    /// line regardless of method.
    pub fn encode(verb: &str, method: InputMethod, argument: Option<&str>) -> Self {
        let mut body = verb.to_owned();
        if let Some(arg) = argument.filter(|a| !a.is_empty()) {
            body.push(' ');
            body.push_str(arg);
        }

        if body.is_empty() {
            return Self::probe();
        }

        let text = match method {
            InputMethod::Unspecified => format!("{body}{TERMINATOR}"),
            other => format!("{} {body}{TERMINATOR}", other.as_prefix()),
        };
        Self { text }
    }

    /// The empty status-probe line.
    pub fn probe() -> Self {
        Self { text: String::new() }
    }

    pub fn is_probe(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_probe() {
            return write!(f, "<probe>");
        }
        write!(f, "{}", self.text.trim_end_matches(TERMINATOR))
    }
}

/// A reply split into whitespace-separated tokens.
///
/// Never fails: an empty or garbled reply just yields fewer (or odd)
/// tokens, and the typed decoders in [`crate::protocol`] reject it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    raw: String,
    tokens: Vec<String>,
}

impl ReplyLine {
    /// Tokenize raw reply bytes. Invalid UTF-8 is replaced, not rejected.
    pub fn parse(raw: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(raw))
    }

    pub fn from_text(text: &str) -> Self {
        let tokens = text.split_whitespace().map(str::to_owned).collect();
        Self { raw: text.trim().to_owned(), tokens }
    }

    /// First token, if any.
    pub fn keyword(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Reply text with surrounding whitespace trimmed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
