//! Internal domain models for scrobbling.
//!
//! These types are OUR types - they don't change when the Last.fm API changes.
//! API responses get converted into these types via the adapter.

/// A play event to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrobbleTrack {
    /// Artist name
    pub artist: String,
    /// Track title (display form)
    pub title: String,
    /// Unix timestamp (seconds) at which playback started
    pub timestamp: i64,
    /// Album name, empty when unknown
    pub album: String,
}

/// What Last.fm did with a submitted scrobble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrobbleReceipt {
    /// Number of scrobbles accepted
    pub accepted: u32,
    /// Number of scrobbles ignored (e.g. timestamp too old, filtered artist)
    pub ignored: u32,
}

impl ScrobbleReceipt {
    /// Whether at least one scrobble was accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted > 0
    }
}

/// Errors that can occur while talking to Last.fm
#[derive(Debug, Clone, thiserror::Error)]
pub enum LastfmError {
    #[error("API error {code}: {message}")]
    Api { code: u32, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Missing Last.fm API credentials")]
    MissingCredentials,
}

impl LastfmError {
    /// Last.fm error code 9: the session key is invalid or was revoked.
    pub const INVALID_SESSION: u32 = 9;

    /// Whether the user's linked session is no longer valid.
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == Self::INVALID_SESSION)
    }
}
