//! Trait definitions for the scrobbling collaborator.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses [`LastfmClient`], while tests substitute the mocks
//! below.
//!
//! [`LastfmClient`]: super::LastfmClient

use async_trait::async_trait;

use super::domain::{LastfmError, ScrobbleReceipt, ScrobbleTrack};

/// Anything that can accept a scrobble.
#[async_trait]
pub trait ScrobbleApi: Send + Sync {
    /// Submit one play for the user owning `session_key`.
    async fn scrobble(
        &self,
        track: &ScrobbleTrack,
        session_key: &str,
    ) -> Result<ScrobbleReceipt, LastfmError>;
}

#[async_trait]
impl ScrobbleApi for super::client::LastfmClient {
    async fn scrobble(
        &self,
        track: &ScrobbleTrack,
        session_key: &str,
    ) -> Result<ScrobbleReceipt, LastfmError> {
        self.scrobble(track, session_key).await
    }
}
