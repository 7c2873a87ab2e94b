//! Test utilities and fixtures for songkeeper tests.
//!
//! This module provides common test helpers, mock factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use songkeeper::test_utils::{temp_db, insert_mock_song};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     let id = insert_mock_song(&pool, "/music/song.mp3").await;
//!     // ... test logic
//! }
//! ```

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::library::song_id;
use crate::model::Song;

/// App key used for every identity hash in tests.
pub const TEST_APP_KEY: &str = "test-app-key";

/// Creates a temporary database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// Creates an untitled mock song at `path` on the placeholder album.
///
/// The ID is derived from [`TEST_APP_KEY`]. Customize with the builder
/// methods:
///
/// ```ignore
/// let song = mock_song("/music/a.mp3").with_title("A").with_length(90.0);
/// ```
pub fn mock_song(path: &str) -> Song {
    Song::new(song_id(TEST_APP_KEY, path), path, crate::model::UNKNOWN_ID).with_length(180.0)
}

/// Inserts a mock song into the database and returns its ID.
///
/// The song belongs to "Test Album" by "Test Artist", created as needed.
pub async fn insert_mock_song(pool: &SqlitePool, path: &str) -> String {
    let artist_id = crate::db::get_or_create_artist(pool, "Test Artist")
        .await
        .expect("Failed to create artist");
    let album_id = crate::db::get_or_create_album(pool, artist_id, "Test Album")
        .await
        .expect("Failed to create album");

    let mut song = mock_song(path);
    song.album_id = album_id;
    crate::db::upsert_song(pool, &song)
        .await
        .expect("Failed to insert song");
    song.id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        let songs = crate::db::get_all_songs(&pool).await.unwrap();
        assert!(songs.is_empty());
    }

    #[tokio::test]
    async fn test_insert_mock_song() {
        let (pool, _dir) = temp_db().await;

        let id = insert_mock_song(&pool, "/test/song.mp3").await;
        assert_eq!(id, song_id(TEST_APP_KEY, "/test/song.mp3"));

        let songs = crate::db::get_all_songs(&pool).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].path, "/test/song.mp3");
        assert_eq!(songs[0].title(), "song");
    }

    #[test]
    fn test_mock_song_defaults() {
        let song = mock_song("/music/a.mp3");
        assert_eq!(song.stored_title(), "");
        assert_eq!(song.length, 180.0);
        assert_eq!(song.album_id, crate::model::UNKNOWN_ID);
    }
}
