//! Channel directory: call signs and currently airing titles.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::Channel;

/// Lookup tables built from one grid fetch.
///
/// Both tables always come from the same fetch; a directory is never
/// updated in place, only replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelDirectory {
    call_signs: BTreeMap<Channel, String>,
    titles: BTreeMap<Channel, String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl ChannelDirectory {
    pub fn new(
        call_signs: BTreeMap<Channel, String>,
        titles: BTreeMap<Channel, String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self { call_signs, titles, fetched_at: Some(fetched_at) }
    }

    pub fn call_sign(&self, channel: &Channel) -> Option<&str> {
        self.call_signs.get(channel).map(String::as_str)
    }

    /// Title of the program airing on `channel` when the directory was built.
    pub fn title(&self, channel: &Channel) -> Option<&str> {
        self.titles.get(channel).map(String::as_str)
    }

    pub fn call_signs(&self) -> &BTreeMap<Channel, String> {
        &self.call_signs
    }

    pub fn titles(&self) -> &BTreeMap<Channel, String> {
        &self.titles
    }

    /// `None` for the empty directory a handle starts with.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Number of channels with a known call sign.
    pub fn len(&self) -> usize {
        self.call_signs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.call_signs.is_empty() && self.titles.is_empty()
    }
}

/// Read access to the most recent directory.
pub trait ProgramGuide: Send + Sync {
    fn snapshot(&self) -> Arc<ChannelDirectory>;
}

/// Shared slot holding the current directory.
///
/// Readers get a consistent `Arc` snapshot; a refresh publishes a fully
/// built directory with one pointer swap.
#[derive(Clone)]
pub struct DirectoryHandle {
    current: Arc<ArcSwap<ChannelDirectory>>,
}

impl DirectoryHandle {
    pub fn new() -> Self {
        Self { current: Arc::new(ArcSwap::from_pointee(ChannelDirectory::default())) }
    }

    pub fn load(&self) -> Arc<ChannelDirectory> {
        self.current.load_full()
    }

    pub fn publish(&self, directory: ChannelDirectory) {
        self.current.store(Arc::new(directory));
    }
}

impl Default for DirectoryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DirectoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.load();
        f.debug_struct("DirectoryHandle")
            .field("channels", &dir.len())
            .field("titles", &dir.titles().len())
            .field("fetched_at", &dir.fetched_at())
            .finish()
    }
}

impl ProgramGuide for DirectoryHandle {
    fn snapshot(&self) -> Arc<ChannelDirectory> {
        self.load()
    }
}
