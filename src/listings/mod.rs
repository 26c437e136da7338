//! Program-guide enrichment from the listings web service.
//!
//! - [`client`]: login and grid fetch over HTTP
//! - [`grid`]: grid decoding and "currently airing" title derivation
//! - [`directory`]: the atomically replaced channel directory
//! - [`refresh`]: periodic background refresh

pub mod client;
pub mod directory;
pub mod grid;
pub mod refresh;

use thiserror::Error;

pub use client::{Credentials, HttpClient, ListingsClient, ListingsSession, UreqClient};
pub use directory::{ChannelDirectory, DirectoryHandle, ProgramGuide};
pub use grid::{Grid, GridChannel, GridEvent};
pub use refresh::Refresher;

/// Errors from the listings service. Any of them aborts the refresh in
/// progress and leaves the published directory untouched.
#[derive(Debug, Error)]
pub enum ListingsError {
    #[error("listings login failed: {message}")]
    Authentication { message: String },

    #[error("listings grid fetch failed: {message}")]
    Fetch { message: String },

    #[error("listings HTTP request failed: {0}")]
    Http(String),

    #[error("postal code {postal_code:?} needs a postal-code lineup lookup, which is not supported")]
    UnsupportedRegion { postal_code: String },
}

pub type Result<T> = std::result::Result<T, ListingsError>;
