//! Song lookup by path and by directory.
//!
//! A song's identity key is a hash of its path, salted with the
//! installation's app key. The same path always produces the same key,
//! which is what makes rescans idempotent and lets [`find_by_path`] go
//! straight to the primary key.

use std::path::MAIN_SEPARATOR;

use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::db;
use crate::error::{Result, ResultExt};
use crate::model::Song;

/// Compute the identity key for a song path.
///
/// SHA256 of `app_key` followed by `path`, as a lowercase hex string
/// (64 characters).
pub fn song_id(app_key: &str, path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(app_key.as_bytes());
    hasher.update(path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Normalize a directory path for prefix matching.
///
/// Trims surrounding whitespace and guarantees exactly one trailing
/// separator, so `/music/Ab` becomes `/music/Ab/` and can't match
/// anything under `/music/Abba/`.
pub fn normalize_directory(dir: &str) -> String {
    let trimmed = dir.trim().trim_end_matches(MAIN_SEPARATOR);
    format!("{trimmed}{MAIN_SEPARATOR}")
}

/// Find a song by its file path.
///
/// Returns `Ok(None)` when no song is stored for the path.
pub async fn find_by_path(pool: &SqlitePool, app_key: &str, path: &str) -> Result<Option<Song>> {
    let id = song_id(app_key, path);
    db::get_song(pool, &id)
        .await
        .with_context(format!("looking up song at {path}"))
}

/// All songs stored anywhere below `dir`.
pub async fn songs_in_directory(pool: &SqlitePool, dir: &str) -> Result<Vec<Song>> {
    let prefix = normalize_directory(dir);
    let songs = db::get_songs_with_prefix(pool, &prefix)
        .await
        .with_context(format!("listing songs in {prefix}"))?;
    debug!(dir = %prefix, count = songs.len(), "Listed songs in directory");
    Ok(songs)
}
