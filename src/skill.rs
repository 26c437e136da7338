//! Intent handling for voice front ends.
//!
//! A [`Skill`] owns one [`Device`] and, optionally, the program guide that
//! enriches its titles. Each [`Intent`] maps onto a device operation and
//! comes back as a [`SkillResponse`] ready to be spoken.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::conn::{Session, Transport};
use crate::device::Device;
use crate::error::Error;
use crate::listings::{DirectoryHandle, HttpClient, ListingsClient, Refresher};
use crate::protocol::Channel;
use crate::state::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Structured request from the voice front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Status,
    Play,
    Pause,
    Record,
    Stop,
    Power(Power),
    /// Spoken digits, e.g. `"6 1 2"`.
    SetChannel(String),
    Step(Direction),
}

/// What to say back. `status` is `None` when there is nothing to report,
/// e.g. a status request while not watching live TV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillResponse {
    pub device_name: String,
    pub status: Option<String>,
}

impl SkillResponse {
    fn new(device_name: impl Into<String>, status: Option<String>) -> Self {
        Self { device_name: device_name.into(), status }
    }
}

impl fmt::Display for SkillResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{} is {status}", self.device_name),
            None => write!(f, "{} status is unknown", self.device_name),
        }
    }
}

pub struct Skill<T = Session> {
    device: Device<T>,
    guide: Option<DirectoryHandle>,
    /// Stops the background refresh when dropped.
    _refresher: Option<Refresher>,
}

impl Skill<Session> {
    /// Build a skill from configuration.
    ///
    /// With listings configured, the guide is fetched once up front and then
    /// refreshed in the background. A failed first fetch is logged and the
    /// skill starts without titles. Ends with a status probe, so an
    /// unreachable receiver is reported here.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut skill = Self::new(Device::open(config.name.clone(), config.session_config()));

        if let (Some(listings), Some(credentials), Some(interval)) =
            (&config.listings, config.listings_credentials(), config.refresh_interval())
        {
            let client = ListingsClient::new(credentials).with_base_url(listings.base_url.clone());
            skill.attach_listings(Arc::new(client), interval);
        }

        let state = skill.device.probe_status()?;
        info!(device = %config.name, mode = %state.mode, channel = state.channel_or_unknown(), "receiver ready");
        Ok(skill)
    }
}

impl<T: Transport> Skill<T> {
    pub fn new(device: Device<T>) -> Self {
        Self { device, guide: None, _refresher: None }
    }

    /// Attach a program guide: refresh once now, then every `interval`.
    pub fn attach_listings<H>(&mut self, client: Arc<ListingsClient<H>>, interval: Duration)
    where
        H: HttpClient + 'static,
    {
        let handle = DirectoryHandle::new();
        if let Err(e) = client.refresh(&handle) {
            warn!(error = %e, "initial program guide fetch failed; titles will show channel numbers only");
        }
        self.device.set_guide(Some(Arc::new(handle.clone())));

        match Refresher::spawn(client, handle.clone(), interval) {
            Ok(refresher) => self._refresher = Some(refresher),
            Err(e) => warn!(error = %e, "could not start guide refresher"),
        }
        self.guide = Some(handle);
    }

    pub fn device(&self) -> &Device<T> {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device<T> {
        &mut self.device
    }

    pub fn guide(&self) -> Option<&DirectoryHandle> {
        self.guide.as_ref()
    }

    /// Carry out `intent` and describe the outcome.
    pub fn handle(&mut self, intent: Intent) -> Result<SkillResponse, Error> {
        let status = match intent {
            Intent::Status => {
                self.device.probe_status()?;
                self.watching()
            }
            Intent::Play => {
                self.device.play()?;
                Some("playing".to_owned())
            }
            Intent::Pause => {
                self.device.pause()?;
                Some("paused".to_owned())
            }
            Intent::Record => {
                self.device.record()?;
                Some("recording".to_owned())
            }
            Intent::Stop => {
                self.device.stop()?;
                let name = format!("{} recording", self.device.name());
                return Ok(SkillResponse::new(name, Some("stopped".to_owned())));
            }
            Intent::Power(power) => {
                match power {
                    Power::On => self.device.turn_on()?,
                    Power::Off => self.device.turn_off()?,
                };
                Some(power.as_str().to_owned())
            }
            Intent::SetChannel(spoken) => {
                let channel = Channel::from_utterance(&spoken)?;
                self.device.set_channel(&channel)?;
                self.watching()
            }
            Intent::Step(Direction::Up) => {
                self.device.seek_next()?;
                self.watching()
            }
            Intent::Step(Direction::Down) => {
                self.device.seek_previous()?;
                self.watching()
            }
        };
        Ok(SkillResponse::new(self.device.name(), status))
    }

    fn watching(&self) -> Option<String> {
        if self.device.mode() != Mode::Tv {
            return None;
        }
        self.device.title().map(|title| format!("watching {title}"))
    }
}
