//! Programming grid decoding and title derivation.
//!
//! Grid JSON (one-hour window):
//! ```text
//! { "channels": [ { "channelNo": "612", "callSign": "WXYZ",
//!                   "events": [ { "startTime": "2024-05-01T18:00:00Z",
//!                                 "endTime":   "2024-05-01T18:30:00Z",
//!                                 "program": { "title": "Evening News" } } ] } ] }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::directory::ChannelDirectory;
use super::{ListingsError, Result};
use crate::protocol::Channel;

/// Timestamp layout used by the grid service (always UTC).
pub const GRID_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

// Entries are kept as raw values and decoded one at a time, so a single
// off-shape channel or event cannot fail the whole grid.

#[derive(Debug, Deserialize)]
struct GridWire {
    channels: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ChannelWire {
    #[serde(rename = "channelNo", default)]
    channel_no: Value,
    #[serde(rename = "callSign", default)]
    call_sign: Option<String>,
    #[serde(default)]
    events: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct EventWire {
    #[serde(rename = "startTime")]
    start_time: Option<String>,
    #[serde(rename = "endTime")]
    end_time: Option<String>,
    program: Option<ProgramWire>,
}

#[derive(Debug, Deserialize)]
struct ProgramWire {
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoded grid
// ---------------------------------------------------------------------------

/// The first scheduled event on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl GridEvent {
    /// True when `now` falls strictly inside the event window.
    pub fn is_airing(&self, now: DateTime<Utc>) -> bool {
        self.start < now && now < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridChannel {
    pub channel: Channel,
    pub call_sign: Option<String>,
    /// Only the first event is kept; later ones are never consulted.
    pub first_event: Option<GridEvent>,
}

/// A decoded programming grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub channels: Vec<GridChannel>,
}

impl Grid {
    /// Decode a grid response body.
    ///
    /// Fails when the body is not JSON or has no `channels` array. Individual
    /// malformed channel entries are skipped.
    pub fn parse(body: &str) -> Result<Self> {
        let wire: GridWire = serde_json::from_str(body).map_err(|e| ListingsError::Fetch {
            message: format!("grid response is not valid JSON: {e}"),
        })?;
        let Some(channels) = wire.channels else {
            return Err(ListingsError::Fetch { message: "grid response has no channels array".into() });
        };

        let channels = channels.into_iter().filter_map(decode_channel).collect();
        Ok(Self { channels })
    }

    /// Channel → call sign for every channel in the grid.
    pub fn call_signs(&self) -> BTreeMap<Channel, String> {
        self.channels
            .iter()
            .filter_map(|c| Some((c.channel.clone(), c.call_sign.clone()?)))
            .collect()
    }

    /// Channel → title for channels whose first event is airing at `now`.
    ///
    /// Channels outside their window get no entry at all.
    pub fn derive_titles(&self, now: DateTime<Utc>) -> BTreeMap<Channel, String> {
        self.channels
            .iter()
            .filter_map(|c| {
                let event = c.first_event.as_ref()?;
                event.is_airing(now).then(|| (c.channel.clone(), event.title.clone()))
            })
            .collect()
    }

    /// Build both lookup tables from this grid in one go.
    pub fn to_directory(&self, now: DateTime<Utc>) -> ChannelDirectory {
        ChannelDirectory::new(self.call_signs(), self.derive_titles(now), now)
    }
}

/// Parse a grid timestamp such as `2024-05-01T18:00:00Z`.
pub fn parse_grid_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, GRID_TIME_FORMAT).ok().map(|t| t.and_utc())
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn decode_channel(raw: Value) -> Option<GridChannel> {
    let wire: ChannelWire = match serde_json::from_value(raw) {
        Ok(wire) => wire,
        Err(e) => {
            debug!(error = %e, "skipping malformed grid entry");
            return None;
        }
    };
    let number = match &wire.channel_no {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            debug!(channel_no = %other, "skipping grid entry without channel number");
            return None;
        }
    };
    let channel = match Channel::parse(&number) {
        Ok(ch) => ch,
        Err(e) => {
            debug!(%number, error = %e, "skipping grid entry");
            return None;
        }
    };

    let first_event = wire.events.unwrap_or_default().into_iter().next().and_then(|raw| {
        let ev: EventWire = serde_json::from_value(raw).ok()?;
        let title = ev.program?.title?;
        let start = parse_grid_time(ev.start_time.as_deref()?)?;
        let end = parse_grid_time(ev.end_time.as_deref()?)?;
        Some(GridEvent { title, start, end })
    });

    Some(GridChannel { channel, call_sign: wire.call_sign, first_event })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
