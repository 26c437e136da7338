//! Command and reply types and encode/decode dispatch.
//!
//! - [`Command`]: lines we send to the receiver
//! - [`Reply`]: lines the receiver sends back
//!
//! Commands fall into three classes by [`InputMethod`]: bare protocol
//! commands (`SETCH`, `FORCECH`, the status probe), remote-control button
//! presses (`IRCODE ...`) and screen jumps (`TELEPORT ...`).

pub mod channel;
pub mod status;

use std::fmt;

use crate::error::{ReplyError, Result};
use crate::frame::{CommandLine, ReplyLine};
use crate::method::InputMethod;

pub use channel::Channel;
pub use status::ChannelStatus;

// ---------------------------------------------------------------------------
// Verb constants
// ---------------------------------------------------------------------------

// Bare commands
pub const VERB_SETCH: &str = "SETCH";
pub const VERB_FORCECH: &str = "FORCECH";

// Teleport targets
pub const VERB_LIVETV: &str = "LIVETV";
pub const VERB_GUIDE: &str = "GUIDE";
pub const VERB_TIVO: &str = "TIVO";
pub const VERB_NOWPLAYING: &str = "NOWPLAYING";

// IR codes
pub const VERB_CHANNELUP: &str = "CHANNELUP";
pub const VERB_CHANNELDOWN: &str = "CHANNELDOWN";
pub const VERB_STANDBY: &str = "STANDBY";
pub const VERB_PLAY: &str = "PLAY";
pub const VERB_PAUSE: &str = "PAUSE";
pub const VERB_STOP: &str = "STOP";
pub const VERB_RECORD: &str = "RECORD";
pub const VERB_REVERSE: &str = "REVERSE";
pub const VERB_FORWARD: &str = "FORWARD";

// Reply keywords
pub const REPLY_CH_STATUS: &str = "CH_STATUS";
pub const REPLY_INVALID: &str = "INVALID";
pub const REPLY_LIVETV_READY: &str = "LIVETV_READY";

// ---------------------------------------------------------------------------
// Commands we send
// ---------------------------------------------------------------------------

/// Screens reachable with a `TELEPORT` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    LiveTv,
    Guide,
    /// The TiVo main menu.
    Menu,
    NowPlaying,
}

impl Screen {
    pub fn verb(self) -> &'static str {
        match self {
            Self::LiveTv => VERB_LIVETV,
            Self::Guide => VERB_GUIDE,
            Self::Menu => VERB_TIVO,
            Self::NowPlaying => VERB_NOWPLAYING,
        }
    }
}

/// Remote-control buttons sent as `IRCODE` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrCode {
    ChannelUp,
    ChannelDown,
    /// Power toggle.
    Standby,
    Play,
    Pause,
    Stop,
    Record,
    Reverse,
    Forward,
}

impl IrCode {
    pub fn verb(self) -> &'static str {
        match self {
            Self::ChannelUp => VERB_CHANNELUP,
            Self::ChannelDown => VERB_CHANNELDOWN,
            Self::Standby => VERB_STANDBY,
            Self::Play => VERB_PLAY,
            Self::Pause => VERB_PAUSE,
            Self::Stop => VERB_STOP,
            Self::Record => VERB_RECORD,
            Self::Reverse => VERB_REVERSE,
            Self::Forward => VERB_FORWARD,
        }
    }
}

/// A line we send to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty line; the receiver answers with its channel status.
    StatusProbe,
    /// `TELEPORT <screen>`.
    Teleport(Screen),
    /// `IRCODE <button>`.
    Ir(IrCode),
    /// `SETCH <nnnn>`. Only honoured in live TV.
    SetChannel(Channel),
    /// `FORCECH <nnnn>`. Changes channel even while recording.
    ForceChannel(Channel),
    /// Anything else, e.g. `KEYBOARD` key presses.
    Custom {
        verb: String,
        method: InputMethod,
        argument: Option<String>,
    },
}

impl Command {
    pub fn verb(&self) -> &str {
        match self {
            Command::StatusProbe => "",
            Command::Teleport(s) => s.verb(),
            Command::Ir(c) => c.verb(),
            Command::SetChannel(_) => VERB_SETCH,
            Command::ForceChannel(_) => VERB_FORCECH,
            Command::Custom { verb, .. } => verb,
        }
    }

    pub fn method(&self) -> InputMethod {
        match self {
            Command::StatusProbe | Command::SetChannel(_) | Command::ForceChannel(_) => {
                InputMethod::Unspecified
            }
            Command::Teleport(_) => InputMethod::Teleport,
            Command::Ir(_) => InputMethod::IrCode,
            Command::Custom { method, .. } => *method,
        }
    }

    pub fn argument(&self) -> Option<&str> {
        match self {
            Command::SetChannel(ch) | Command::ForceChannel(ch) => Some(ch.as_str()),
            Command::Custom { argument, .. } => argument.as_deref(),
            _ => None,
        }
    }

    /// Encode into a request line ready for the wire.
    pub fn encode(&self) -> CommandLine {
        CommandLine::encode(self.verb(), self.method(), self.argument())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

// ---------------------------------------------------------------------------
// Replies the receiver sends
// ---------------------------------------------------------------------------

/// A decoded receiver reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `CH_STATUS <nnnn> <qualifier>`.
    ChannelStatus(ChannelStatus),
    /// `INVALID`: the receiver rejected the command (e.g. unknown channel).
    Invalid,
    /// `LIVETV_READY`: live TV is up and will accept `SETCH`.
    LiveTvReady,

    // -- Forward compat --
    Unknown { keyword: String, raw: String },
}

impl Reply {
    /// Decode a tokenized reply into a typed `Reply`.
    ///
    /// Empty replies and known keywords with missing fields are errors;
    /// unrecognised keywords decode to [`Reply::Unknown`].
    pub fn decode(reply: &ReplyLine) -> Result<Self> {
        let Some(keyword) = reply.keyword() else {
            return Err(ReplyError::Empty);
        };
        match keyword {
            REPLY_CH_STATUS => Ok(Reply::ChannelStatus(ChannelStatus::decode(reply)?)),
            REPLY_INVALID => Ok(Reply::Invalid),
            REPLY_LIVETV_READY => Ok(Reply::LiveTvReady),
            _ => Ok(Reply::Unknown {
                keyword: keyword.to_owned(),
                raw: reply.raw().to_owned(),
            }),
        }
    }

    pub fn channel_status(&self) -> Option<&ChannelStatus> {
        match self {
            Reply::ChannelStatus(st) => Some(st),
            _ => None,
        }
    }
}
