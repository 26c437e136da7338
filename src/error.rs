use thiserror::Error;

use crate::config::ConfigError;
use crate::conn::ConnError;
use crate::listings::ListingsError;

/// Errors arising from reply parsing and command-argument validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("empty reply")]
    Empty,

    #[error("reply too short for {keyword}: need {need} tokens, got {got}{}", format_raw_suffix(raw))]
    MissingToken {
        keyword: &'static str,
        need: usize,
        got: usize,
        /// Raw reply line for debug context.
        raw: String,
    },

    #[error("invalid channel number {value:?}")]
    InvalidChannel { value: String },
}

impl ReplyError {
    /// Create a `MissingToken` error (raw line filled in later via `with_raw`).
    pub(crate) fn missing_token(keyword: &'static str, need: usize, got: usize) -> Self {
        Self::MissingToken { keyword, need, got, raw: String::new() }
    }

    /// Attach the raw reply line to decode-phase errors for diagnostics.
    pub fn with_raw(self, line: &str) -> Self {
        match self {
            Self::MissingToken { keyword, need, got, .. } => {
                Self::MissingToken { keyword, need, got, raw: line.to_owned() }
            }
            other => other,
        }
    }
}

/// Format the raw line as a suffix like ` | "CH_STATUS 0612"` (empty if none).
fn format_raw_suffix(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 40;
    let clipped: String = raw.chars().take(limit).collect();
    let ellipsis = if raw.chars().count() > limit { "..." } else { "" };
    format!(" | {clipped:?}{ellipsis}")
}

pub type Result<T> = std::result::Result<T, ReplyError>;

/// Top-level error surfaced to the skill façade.
///
/// Parse failures and device timeouts never show up here: the state machine
/// absorbs them into an "unknown" state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not reach the receiver: {0}")]
    Transport(#[from] ConnError),

    #[error("program guide unavailable: {0}")]
    Listings(#[from] ListingsError),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_message_includes_raw_line() {
        let err = ReplyError::missing_token("CH_STATUS", 3, 2).with_raw("CH_STATUS 0612");
        let msg = err.to_string();
        assert!(msg.contains("need 3 tokens, got 2"), "{msg}");
        assert!(msg.ends_with("| \"CH_STATUS 0612\""), "{msg}");
    }

    #[test]
    fn missing_token_without_raw_has_no_suffix() {
        let msg = ReplyError::missing_token("CH_STATUS", 2, 1).to_string();
        assert!(!msg.contains('|'), "{msg}");
    }

    #[test]
    fn long_raw_lines_are_clipped() {
        let long = "X".repeat(100);
        let msg = ReplyError::missing_token("CH_STATUS", 3, 1).with_raw(&long).to_string();
        assert!(msg.ends_with("..."), "{msg}");
    }
}
