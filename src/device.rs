//! Receiver operations: command sequences and state transitions.
//!
//! Each command operation sends one or more lines through a [`Transport`],
//! decodes the replies and folds them into [`DeviceState`] with
//! [`state::apply`]. Query operations never touch the network.
//!
//! Timeouts and malformed replies are not errors here. They turn into an
//! "unknown" state (status probe) or no change (channel step). Only
//! transport failures propagate.

use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::conn::{ConnError, Response, Session, SessionConfig, Transport};
use crate::listings::{ChannelDirectory, ProgramGuide};
use crate::protocol::{Channel, ChannelStatus, Command, IrCode, Reply, Screen};
use crate::state::{self, DeviceState, Event, Mode};

/// Coarse player state for media-player style front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Off,
    /// The receiver cannot report pause, so anything not off is playing.
    Playing,
}

/// Result of [`Device::stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Receiver is in standby; nothing sent.
    Standby,
    /// Already watching live TV, where stop means nothing; nothing sent.
    InLiveTv,
    /// `STOP` was sent. Carries the reply's status qualifier if there was one.
    Stopped { status: Option<String> },
}

/// A TiVo receiver and the state we derive for it.
pub struct Device<T = Session> {
    name: String,
    transport: T,
    state: DeviceState,
    guide: Option<Arc<dyn ProgramGuide>>,
}

impl Device<Session> {
    /// Device talking TCP to `config.host:config.port`. No I/O happens here.
    pub fn open(name: impl Into<String>, config: SessionConfig) -> Self {
        Self::new(name, Session::new(config))
    }
}

impl<T: Transport> Device<T> {
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        Self { name: name.into(), transport, state: DeviceState::default(), guide: None }
    }

    /// Enrich titles from a program guide.
    pub fn with_guide(mut self, guide: Arc<dyn ProgramGuide>) -> Self {
        self.guide = Some(guide);
        self
    }

    pub fn set_guide(&mut self, guide: Option<Arc<dyn ProgramGuide>>) {
        self.guide = guide;
    }

    pub fn has_guide(&self) -> bool {
        self.guide.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn is_standby(&self) -> bool {
        self.state.standby
    }

    pub fn playback(&self) -> Playback {
        if self.state.standby { Playback::Off } else { Playback::Playing }
    }

    /// Current directory snapshot, if a guide is attached.
    pub fn directory(&self) -> Option<Arc<ChannelDirectory>> {
        self.guide.as_ref().map(|g| g.snapshot())
    }

    /// Display title, derived from the current channel and the latest guide.
    /// `None` in standby.
    pub fn title(&self) -> Option<String> {
        if self.state.standby {
            return None;
        }
        let directory = self.directory();
        Some(self.state.title(directory.as_deref()))
    }

    /// Call sign of the current channel, if the guide knows it.
    pub fn call_sign(&self) -> Option<String> {
        if self.state.standby {
            return None;
        }
        let channel = self.state.channel.as_ref()?;
        self.directory()?.call_sign(channel).map(str::to_owned)
    }

    /// `"<status> (<channel>)"`, e.g. `"LOCAL (0612)"`. `None` in standby.
    pub fn media_channel(&self) -> Option<String> {
        if self.state.standby {
            return None;
        }
        Some(format!("{} ({})", self.state.status_or_unknown(), self.state.channel_or_unknown()))
    }

    /// Raw status qualifier. `None` in standby or when unknown.
    pub fn content_id(&self) -> Option<&str> {
        if self.state.standby {
            return None;
        }
        self.state.status.as_deref()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Send the empty status probe and adopt whatever it reports.
    pub fn probe_status(&mut self) -> Result<&DeviceState, ConnError> {
        let resp = self.transport.execute(&Command::StatusProbe)?;
        let status = channel_status(&resp);
        if status.is_none() {
            warn!(device = %self.name, reply = %String::from_utf8_lossy(resp.payload()).trim(), "receiver did not respond correctly");
        }
        self.transition(Event::Probed(status));
        Ok(&self.state)
    }

    /// Jump to live TV. Mode becomes TV whatever the reply says.
    pub fn show_live(&mut self) -> Result<Option<Reply>, ConnError> {
        self.show(Screen::LiveTv)
    }

    pub fn show_guide(&mut self) -> Result<Option<Reply>, ConnError> {
        self.show(Screen::Guide)
    }

    /// Jump to the TiVo main menu.
    pub fn show_menu(&mut self) -> Result<Option<Reply>, ConnError> {
        self.show(Screen::Menu)
    }

    pub fn show_now_playing(&mut self) -> Result<Option<Reply>, ConnError> {
        self.show(Screen::NowPlaying)
    }

    /// Switch to live TV, then tune `channel`.
    pub fn set_channel(&mut self, channel: &Channel) -> Result<(), ConnError> {
        let ready = self.show_live()?;
        if ready != Some(Reply::LiveTvReady) {
            debug!(?ready, "live TV not confirmed; tuning anyway");
        }
        let resp = self.transport.execute(&Command::SetChannel(channel.clone()))?;
        self.transition(Event::Tuned(channel_status(&resp)));
        Ok(())
    }

    /// Tune `channel` with `FORCECH`, which also works while recording.
    pub fn force_channel(&mut self, channel: &Channel) -> Result<(), ConnError> {
        let resp = self.transport.execute(&Command::ForceChannel(channel.clone()))?;
        self.transition(Event::Tuned(channel_status(&resp)));
        Ok(())
    }

    /// Channel up. Only acts in live TV; returns whether a command was sent.
    pub fn channel_up(&mut self) -> Result<bool, ConnError> {
        self.step(IrCode::ChannelUp)
    }

    /// Channel down. Only acts in live TV; returns whether a command was sent.
    pub fn channel_down(&mut self) -> Result<bool, ConnError> {
        self.step(IrCode::ChannelDown)
    }

    /// Leave standby. Returns whether a command was sent.
    pub fn turn_on(&mut self) -> Result<bool, ConnError> {
        if !self.state.standby {
            return Ok(false);
        }
        self.transport.execute(&Command::Ir(IrCode::Standby))?;
        self.transition(Event::StandbyLeft);
        Ok(true)
    }

    /// Enter standby. Returns whether commands were sent.
    ///
    /// The toggle goes out twice: from some screens one press only brings up
    /// the standby prompt.
    pub fn turn_off(&mut self) -> Result<bool, ConnError> {
        if self.state.standby {
            return Ok(false);
        }
        self.transport.execute(&Command::Ir(IrCode::Standby))?;
        self.transport.execute(&Command::Ir(IrCode::Standby))?;
        self.transition(Event::StandbyEntered);
        Ok(true)
    }

    pub fn play(&mut self) -> Result<bool, ConnError> {
        self.press(IrCode::Play)
    }

    pub fn pause(&mut self) -> Result<bool, ConnError> {
        self.press(IrCode::Pause)
    }

    /// Start recording the current program.
    pub fn record(&mut self) -> Result<bool, ConnError> {
        self.press(IrCode::Record)
    }

    pub fn stop(&mut self) -> Result<StopOutcome, ConnError> {
        if self.state.standby {
            return Ok(StopOutcome::Standby);
        }
        if self.state.mode == Mode::Tv {
            return Ok(StopOutcome::InLiveTv);
        }
        let resp = self.transport.execute(&Command::Ir(IrCode::Stop))?;
        let status = resp.reply().tokens().get(2).cloned();
        Ok(StopOutcome::Stopped { status })
    }

    /// Previous channel in live TV, rewind elsewhere; then re-probe.
    pub fn seek_previous(&mut self) -> Result<&DeviceState, ConnError> {
        self.seek(IrCode::ChannelDown, IrCode::Reverse)
    }

    /// Next channel in live TV, fast-forward elsewhere; then re-probe.
    pub fn seek_next(&mut self) -> Result<&DeviceState, ConnError> {
        self.seek(IrCode::ChannelUp, IrCode::Forward)
    }

    /// Try `SETCH` on every channel in `range` and return those the receiver
    /// rejected with `INVALID`. Ends with a status probe.
    pub fn scan_channels(&mut self, range: RangeInclusive<u16>) -> Result<Vec<Channel>, ConnError> {
        let mut invalid = Vec::new();
        for n in range {
            let Ok(channel) = Channel::from_number(n) else {
                continue;
            };
            let resp = self.transport.execute(&Command::SetChannel(channel.clone()))?;
            if matches!(decode(&resp), Some(Reply::Invalid)) {
                invalid.push(channel);
            }
        }
        debug!(count = invalid.len(), "channel scan finished");
        self.probe_status()?;
        Ok(invalid)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, event: Event) {
        let next = state::apply(&self.state, &event);
        if next != self.state {
            debug!(device = %self.name, ?event, mode = %next.mode, channel = next.channel_or_unknown(), "state changed");
        }
        self.state = next;
    }

    fn show(&mut self, screen: Screen) -> Result<Option<Reply>, ConnError> {
        let resp = self.transport.execute(&Command::Teleport(screen))?;
        self.transition(Event::ScreenShown(screen));
        Ok(decode(&resp))
    }

    fn step(&mut self, code: IrCode) -> Result<bool, ConnError> {
        if self.state.mode != Mode::Tv {
            return Ok(false);
        }
        let resp = self.transport.execute(&Command::Ir(code))?;
        self.transition(Event::Stepped(channel_status(&resp)));
        Ok(true)
    }

    fn press(&mut self, code: IrCode) -> Result<bool, ConnError> {
        if self.state.standby {
            return Ok(false);
        }
        self.transport.execute(&Command::Ir(code))?;
        Ok(true)
    }

    fn seek(&mut self, in_tv: IrCode, elsewhere: IrCode) -> Result<&DeviceState, ConnError> {
        if self.state.standby {
            return Ok(&self.state);
        }
        match self.state.mode {
            Mode::Tv | Mode::None => {
                self.step(in_tv)?;
            }
            _ => {
                self.transport.execute(&Command::Ir(elsewhere))?;
            }
        }
        self.probe_status()
    }
}

/// Decode a response, treating timeouts and garbage as "no reply".
fn decode(resp: &Response) -> Option<Reply> {
    if resp.is_timed_out() {
        return None;
    }
    match Reply::decode(&resp.reply()) {
        Ok(reply) => Some(reply),
        Err(e) => {
            debug!(error = %e, "undecodable reply");
            None
        }
    }
}

fn channel_status(resp: &Response) -> Option<ChannelStatus> {
    match decode(resp)? {
        Reply::ChannelStatus(st) => Some(st),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
