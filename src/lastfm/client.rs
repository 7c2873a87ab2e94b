//! Last.fm HTTP client
//!
//! Handles communication with the Last.fm web service.
//! See: https://www.last.fm/api/rest
//!
//! ## Request Signing
//!
//! Write methods must be signed: sort all parameters by name, concatenate
//! `name` + `value` for each, append the shared secret and take the MD5 hex
//! digest. That goes in `api_sig`. The `format` parameter is NOT part of the
//! signature - including it makes Last.fm reject the call with error 13.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use tracing::{debug, warn};

use super::domain::{LastfmError, ScrobbleReceipt, ScrobbleTrack};
use super::{adapter, dto};

/// Last.fm API client
pub struct LastfmClient {
    api_key: String,
    api_secret: String,
    http_client: reqwest::Client,
    base_url: String,
}

impl LastfmClient {
    /// Create a new client with the given API key and shared secret
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, LastfmError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| LastfmError::Network(e.to_string()))?;

        Ok(Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http_client,
            base_url: "https://ws.audioscrobbler.com/2.0/".to_string(),
        })
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Whether both the API key and the shared secret are set
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Report a play to Last.fm on behalf of the session's user
    pub async fn scrobble(
        &self,
        track: &ScrobbleTrack,
        session_key: &str,
    ) -> Result<ScrobbleReceipt, LastfmError> {
        if !self.is_configured() {
            return Err(LastfmError::MissingCredentials);
        }

        let params = self.scrobble_params(track, session_key);
        let response = self.send_signed_request(params).await?;
        let receipt = adapter::to_receipt(response);

        if receipt.is_accepted() {
            debug!(artist = %track.artist, title = %track.title, "Scrobble accepted");
        } else {
            warn!(artist = %track.artist, title = %track.title, "Scrobble ignored by Last.fm");
        }
        Ok(receipt)
    }

    /// Parameters for `track.scrobble`, without the signature
    fn scrobble_params(
        &self,
        track: &ScrobbleTrack,
        session_key: &str,
    ) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("method", "track.scrobble".to_string());
        params.insert("artist", track.artist.clone());
        params.insert("track", track.title.clone());
        params.insert("timestamp", track.timestamp.to_string());
        if !track.album.is_empty() {
            params.insert("album", track.album.clone());
        }
        params.insert("api_key", self.api_key.clone());
        params.insert("sk", session_key.to_string());
        params
    }

    /// Compute `api_sig` for a set of parameters
    fn sign(&self, params: &BTreeMap<&'static str, String>) -> String {
        let mut hasher = Md5::new();
        // BTreeMap iterates in key order, which is what the signature needs
        for (name, value) in params {
            hasher.update(name.as_bytes());
            hasher.update(value.as_bytes());
        }
        hasher.update(self.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Sign, POST and parse the response
    async fn send_signed_request(
        &self,
        mut params: BTreeMap<&'static str, String>,
    ) -> Result<dto::ScrobbleResponse, LastfmError> {
        let signature = self.sign(&params);
        params.insert("api_sig", signature);
        params.insert("format", "json".to_string());

        let response = self
            .http_client
            .post(&self.base_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| LastfmError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LastfmError::Network(e.to_string()))?;

        parse_response(status, &body)
    }
}

/// Classify a `track.scrobble` HTTP response
fn parse_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<dto::ScrobbleResponse, LastfmError> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LastfmError::RateLimited);
    }

    // Last.fm reports failures in the body, regardless of status code
    if let Ok(error) = serde_json::from_str::<dto::ApiError>(body) {
        return Err(adapter::to_error(error));
    }

    if !status.is_success() {
        return Err(LastfmError::Network(format!(
            "HTTP {}: {} - {}",
            status,
            status.canonical_reason().unwrap_or("Unknown"),
            body.chars().take(200).collect::<String>()
        )));
    }

    serde_json::from_str::<dto::ScrobbleResponse>(body)
        .map_err(|e| LastfmError::Parse(e.to_string()))
}
