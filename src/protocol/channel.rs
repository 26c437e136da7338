//! Channel numbers.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::codec;
use crate::error::{ReplyError, Result};

/// A channel number in its wire form: 4 ASCII digits, zero-padded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    /// Parse a digit string, zero-padding it to the wire width.
    pub fn parse(s: &str) -> Result<Self> {
        codec::pad_channel(s.trim()).map(Self)
    }

    /// Parse a spoken channel number such as `"6 1 2"`.
    ///
    /// Digit groups are joined before padding, so `"6 1 2"` and `"612"`
    /// both become `0612`.
    pub fn from_utterance(s: &str) -> Result<Self> {
        let joined: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if joined.is_empty() {
            return Err(ReplyError::InvalidChannel { value: s.to_owned() });
        }
        Self::parse(&joined)
    }

    pub fn from_number(n: u16) -> Result<Self> {
        Self::parse(&n.to_string())
    }

    /// Wire form, e.g. `"0612"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Spoken form without leading zeros, e.g. `"612"`.
    pub fn number(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() { "0" } else { trimmed }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Channel {
    type Err = ReplyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pads() {
        let ch = Channel::parse("612").unwrap();
        assert_eq!(ch.as_str(), "0612");
        assert_eq!(ch.number(), "612");
        assert_eq!(ch.to_string(), "0612");
    }

    #[test]
    fn utterance_joins_digit_groups() {
        assert_eq!(Channel::from_utterance("6 1 2").unwrap().as_str(), "0612");
        assert_eq!(Channel::from_utterance(" 45 ").unwrap().as_str(), "0045");
    }

    #[test]
    fn utterance_rejects_words() {
        assert!(Channel::from_utterance("").is_err());
        assert!(Channel::from_utterance("   ").is_err());
        assert!(Channel::from_utterance("six twelve").is_err());
    }

    #[test]
    fn number_of_zero_channel() {
        assert_eq!(Channel::from_number(0).unwrap().number(), "0");
    }

    #[test]
    fn from_str_matches_parse() {
        let ch: Channel = "0645".parse().unwrap();
        assert_eq!(ch, Channel::from_number(645).unwrap());
    }

    #[test]
    fn serializes_as_wire_string() {
        let ch = Channel::parse("7").unwrap();
        assert_eq!(serde_json::to_string(&ch).unwrap(), "\"0007\"");
    }
}
