//! Core data models for the song library.
//!
//! Defines the primary entities: [`Song`], [`Artist`], [`Album`],
//! [`Playlist`] and [`User`]. They are plain data mapped with SQLx;
//! persistence lives in [`crate::db`] and business operations in
//! [`crate::scrobble`].
//!
//! # Database Schema
//!
//! The models map to the following tables:
//! - `artists` - Artist records with unique names
//! - `albums` - Albums belonging to an artist
//! - `songs` - Audio files keyed by a hash of their path
//! - `users` - Listeners, with an optional linked Last.fm session
//! - `playlists` / `playlist_song` - User playlists (many-to-many with songs)

mod song;

pub use song::{Song, SongResource, decode_entities, lyrics_for_display};

use sqlx::FromRow;

/// Reserved ID of the placeholder artist, and of that artist's placeholder
/// album. Both rows are seeded by the initial migration.
pub const UNKNOWN_ID: i64 = 1;

/// An artist in the library.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Artist {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Artist name (unique)
    pub name: String,
}

impl Artist {
    /// Name of the placeholder artist.
    pub const UNKNOWN_NAME: &'static str = "Unknown Artist";

    /// Whether this is the "no metadata available" placeholder.
    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_ID
    }
}

/// An album in the library.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Album {
    /// Database ID (auto-generated)
    pub id: i64,
    /// Owning artist
    pub artist_id: i64,
    /// Album name
    pub name: String,
    /// Set on the per-artist "no album known" row
    pub placeholder: bool,
}

impl Album {
    /// Name of the placeholder album.
    pub const UNKNOWN_NAME: &'static str = "Unknown Album";

    /// Whether this is an artist's "no album known" placeholder.
    ///
    /// Decided by the stored flag, so a real album that happens to be
    /// called "Unknown Album" is not a placeholder.
    pub fn is_unknown(&self) -> bool {
        self.placeholder
    }
}

/// A listener.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Session key obtained when the user connected their Last.fm account
    pub lastfm_session_key: Option<String>,
}

impl User {
    /// The linked Last.fm session key, if any.
    ///
    /// An empty stored key is treated as not linked.
    pub fn lastfm_session_key(&self) -> Option<&str> {
        self.lastfm_session_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

/// A user-owned playlist.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Playlist {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// A song together with its already-loaded album and artist.
///
/// Built by [`crate::db::load_song_context`] so operations that need the
/// relationship chain receive it explicitly.
#[derive(Debug, Clone)]
pub struct SongContext {
    pub song: Song,
    pub album: Album,
    pub artist: Artist,
}
