//! Field codecs for the receiver's text protocol.
//!
//! Replies are positional: token 0 is the keyword, later tokens are fields.
//! Channel numbers travel as 4-digit zero-padded decimal strings.

use crate::error::{ReplyError, Result};
use crate::frame::ReplyLine;

/// Width of a channel number on the wire.
pub const CHANNEL_WIDTH: usize = 4;

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

/// Read the token at `index`.
pub fn read_token<'a>(reply: &'a ReplyLine, index: usize, keyword: &'static str) -> Result<&'a str> {
    check_len(reply, index + 1, keyword)?;
    Ok(reply.tokens()[index].as_str())
}

/// Read the token at `index` as a zero-padded channel number.
pub fn read_channel(reply: &ReplyLine, index: usize, keyword: &'static str) -> Result<String> {
    let raw = read_token(reply, index, keyword)?;
    pad_channel(raw)
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Left-pad a run of ASCII digits with zeros to [`CHANNEL_WIDTH`].
///
/// Longer inputs are accepted only when the excess is leading zeros.
pub fn pad_channel(digits: &str) -> Result<String> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReplyError::InvalidChannel { value: digits.to_owned() });
    }
    let significant = digits.trim_start_matches('0');
    if significant.len() > CHANNEL_WIDTH {
        return Err(ReplyError::InvalidChannel { value: digits.to_owned() });
    }
    Ok(format!("{significant:0>width$}", width = CHANNEL_WIDTH))
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn check_len(reply: &ReplyLine, need: usize, keyword: &'static str) -> Result<()> {
    if reply.len() < need {
        Err(ReplyError::missing_token(keyword, need, reply.len()).with_raw(reply.raw()))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_short_numbers() {
        assert_eq!(pad_channel("7").unwrap(), "0007");
        assert_eq!(pad_channel("612").unwrap(), "0612");
        assert_eq!(pad_channel("1234").unwrap(), "1234");
    }

    #[test]
    fn pad_keeps_padded_numbers() {
        assert_eq!(pad_channel("0645").unwrap(), "0645");
        assert_eq!(pad_channel("00645").unwrap(), "0645");
        assert_eq!(pad_channel("0").unwrap(), "0000");
    }

    #[test]
    fn pad_rejects_non_digits() {
        for bad in ["", "12a", "6 1", "-12", "twelve"] {
            assert!(
                matches!(pad_channel(bad), Err(ReplyError::InvalidChannel { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn pad_rejects_five_significant_digits() {
        assert!(pad_channel("12345").is_err());
    }

    #[test]
    fn read_token_in_range() {
        let reply = ReplyLine::from_text("CH_STATUS 0612 LOCAL");
        assert_eq!(read_token(&reply, 2, "CH_STATUS").unwrap(), "LOCAL");
    }

    #[test]
    fn read_token_out_of_range() {
        let reply = ReplyLine::from_text("CH_STATUS 0612");
        let err = read_token(&reply, 2, "CH_STATUS").unwrap_err();
        assert_eq!(
            err,
            ReplyError::MissingToken {
                keyword: "CH_STATUS",
                need: 3,
                got: 2,
                raw: "CH_STATUS 0612".into(),
            }
        );
    }

    #[test]
    fn read_channel_pads() {
        let reply = ReplyLine::from_text("CH_STATUS 45 LOCAL");
        assert_eq!(read_channel(&reply, 1, "CH_STATUS").unwrap(), "0045");
    }
}
