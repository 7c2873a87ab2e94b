//! Last.fm API Data Transfer Objects
//!
//! These types match what the Last.fm API returns for `format=json`.
//! DO NOT use these types outside the lastfm module - convert to domain types.
//!
//! API Reference: https://www.last.fm/api/show/track.scrobble
//!
//! Example response:
//! ```json
//! {
//!   "scrobbles": {
//!     "scrobble": {
//!       "artist": {"corrected": "0", "#text": "ABBA"},
//!       "track": {"corrected": "0", "#text": "Dancing Queen"},
//!       "timestamp": "1700000000",
//!       "ignoredMessage": {"code": "0", "#text": ""}
//!     },
//!     "@attr": {"accepted": 1, "ignored": 0}
//!   }
//! }
//! ```
//!
//! Errors come back as `{"error": 9, "message": "Invalid session key"}`,
//! sometimes with a 200 status.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level `track.scrobble` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrobbleResponse {
    pub scrobbles: Scrobbles,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scrobbles {
    #[serde(rename = "@attr")]
    pub attr: ScrobblesAttr,
}

/// Batch counters. Last.fm has been seen sending these as strings too.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrobblesAttr {
    #[serde(deserialize_with = "number_or_string")]
    pub accepted: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub ignored: u32,
}

/// Error payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: u32,
    #[serde(default)]
    pub message: String,
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
