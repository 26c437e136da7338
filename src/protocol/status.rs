//! Channel status replies.

use crate::codec;
use crate::error::Result;
use crate::frame::ReplyLine;
use crate::protocol::channel::Channel;
use crate::protocol::REPLY_CH_STATUS;

/// Status qualifier reported while recording the tuned channel.
pub const QUALIFIER_RECORDING: &str = "RECORDING";
/// Status qualifier reported for plain live viewing.
pub const QUALIFIER_LOCAL: &str = "LOCAL";

/// `CH_STATUS <nnnn> <qualifier>`.
///
/// Sent in answer to the status probe, channel changes and some teleports,
/// e.g. `CH_STATUS 0645 LOCAL` or `CH_STATUS 0645 RECORDING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub channel: Channel,
    /// Raw qualifier token (`LOCAL`, `RECORDING`, ...).
    pub qualifier: String,
}

impl ChannelStatus {
    pub fn decode(reply: &ReplyLine) -> Result<Self> {
        let channel = codec::read_channel(reply, 1, REPLY_CH_STATUS)?;
        let qualifier = codec::read_token(reply, 2, REPLY_CH_STATUS)?;
        Ok(Self {
            channel: Channel::parse(&channel)?,
            qualifier: qualifier.to_owned(),
        })
    }

    pub fn is_recording(&self) -> bool {
        self.qualifier == QUALIFIER_RECORDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReplyError;

    #[test]
    fn decode_local() {
        let st = ChannelStatus::decode(&ReplyLine::from_text("CH_STATUS 0645 LOCAL")).unwrap();
        assert_eq!(st.channel.as_str(), "0645");
        assert_eq!(st.qualifier, QUALIFIER_LOCAL);
        assert!(!st.is_recording());
    }

    #[test]
    fn decode_recording() {
        let st = ChannelStatus::decode(&ReplyLine::from_text("CH_STATUS 0645 RECORDING")).unwrap();
        assert!(st.is_recording());
    }

    #[test]
    fn missing_qualifier() {
        let err = ChannelStatus::decode(&ReplyLine::from_text("CH_STATUS 0645")).unwrap_err();
        assert!(matches!(err, ReplyError::MissingToken { need: 3, got: 2, .. }));
    }

    #[test]
    fn garbage_channel() {
        let err = ChannelStatus::decode(&ReplyLine::from_text("CH_STATUS abc LOCAL")).unwrap_err();
        assert!(matches!(err, ReplyError::InvalidChannel { .. }));
    }
}
