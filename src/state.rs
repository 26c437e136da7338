//! Derived receiver state and its transition rules.
//!
//! The receiver never pushes updates; everything here is inferred from the
//! replies to our own commands. [`apply`] is the only way state changes.

use std::fmt;

use serde::Serialize;

use crate::listings::ChannelDirectory;
use crate::protocol::{Channel, ChannelStatus, Screen};

/// Rendering of a field whose value is not known.
pub const UNKNOWN: &str = "unknown";

/// What the receiver is showing, as far as we can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// No command has completed yet.
    Uninitialized,
    Tv,
    Guide,
    Menu,
    NowPlaying,
    /// The last status probe got no usable reply.
    None,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Tv => "tv",
            Self::Guide => "guide",
            Self::Menu => "menu",
            Self::NowPlaying => "now-playing",
            Self::None => "none",
        }
    }
}

impl From<Screen> for Mode {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::LiveTv => Self::Tv,
            Screen::Guide => Self::Guide,
            Screen::Menu => Self::Menu,
            Screen::NowPlaying => Self::NowPlaying,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally derived receiver state.
///
/// `standby` is tracked separately from `mode`: the last mode stays
/// meaningful while the receiver is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub mode: Mode,
    /// `None` means unknown.
    pub channel: Option<Channel>,
    /// Raw status qualifier (`LOCAL`, `RECORDING`); `None` means unknown.
    pub status: Option<String>,
    pub standby: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self { mode: Mode::Uninitialized, channel: None, status: None, standby: false }
    }
}

impl DeviceState {
    /// Display title for the current channel.
    ///
    /// `"channel 612 Evening News"` when a guide knows what is airing,
    /// `"channel 612"` otherwise, `"unknown"` without a channel.
    pub fn title(&self, guide: Option<&ChannelDirectory>) -> String {
        let Some(channel) = &self.channel else {
            return UNKNOWN.to_owned();
        };
        match guide.and_then(|g| g.title(channel)) {
            Some(program) => format!("channel {} {program}", channel.number()),
            None => format!("channel {}", channel.number()),
        }
    }

    pub fn channel_or_unknown(&self) -> &str {
        self.channel.as_ref().map_or(UNKNOWN, Channel::as_str)
    }

    pub fn status_or_unknown(&self) -> &str {
        self.status.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn is_recording(&self) -> bool {
        self.status.as_deref() == Some(crate::protocol::status::QUALIFIER_RECORDING)
    }
}

/// Something that happened to the receiver, as observed through a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Reply to the status probe; `None` if it was missing or malformed.
    Probed(Option<ChannelStatus>),
    /// A teleport was sent. Assumed to succeed.
    ScreenShown(Screen),
    /// Reply to a channel up/down; `None` if it was missing or malformed.
    Stepped(Option<ChannelStatus>),
    /// Reply to `SETCH`/`FORCECH`; `None` if the receiver did not confirm.
    Tuned(Option<ChannelStatus>),
    StandbyEntered,
    StandbyLeft,
}

/// Compute the state that follows `event`.
pub fn apply(state: &DeviceState, event: &Event) -> DeviceState {
    let mut next = state.clone();
    match event {
        Event::Probed(Some(st)) => {
            next.mode = Mode::Tv;
            next.channel = Some(st.channel.clone());
            next.status = Some(st.qualifier.clone());
        }
        Event::Probed(None) => {
            next.mode = Mode::None;
            next.channel = None;
            next.status = None;
        }
        Event::ScreenShown(screen) => next.mode = Mode::from(*screen),
        Event::Stepped(Some(st)) | Event::Tuned(Some(st)) => {
            next.channel = Some(st.channel.clone());
            next.status = Some(st.qualifier.clone());
            if matches!(event, Event::Tuned(_)) {
                next.mode = Mode::Tv;
            }
        }
        Event::Stepped(None) | Event::Tuned(None) => {}
        Event::StandbyEntered => next.standby = true,
        Event::StandbyLeft => next.standby = false,
    }
    next
}
