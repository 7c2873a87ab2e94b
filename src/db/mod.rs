//! Database module for song, album, artist, user and playlist persistence.
//!
//! Uses SQLx with SQLite for lightweight, embedded database storage.
//! Provides async operations for:
//! - Song upserts keyed by identity hash
//! - Artist and album management (with the "unknown" placeholders)
//! - Relationship loading (song -> album -> artist, song <-> playlists)
//! - Users and their linked Last.fm sessions
//!
//! Lyrics are deliberately left out of the regular song queries; use
//! [`get_song_with_lyrics`] or [`get_song_lyrics`] to fetch them.
//!
//! # Example
//!
//! ```ignore
//! use songkeeper::db::{init_db, get_all_songs};
//!
//! let pool = init_db("sqlite:songkeeper.db").await?;
//! let songs = get_all_songs(&pool).await?;
//! ```

use crate::model::{Album, Artist, Playlist, Song, SongContext, UNKNOWN_ID, User};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "songkeeper.db";

/// Columns selected for a [`Song`], without lyrics.
const SONG_COLUMNS: &str =
    "id, album_id, title, length, path, mtime, created_at, updated_at";

/// Build a SQLite database URL from an optional path.
///
/// If no path is provided, uses [`DEFAULT_DB_NAME`] in the current directory.
pub fn db_url(path: Option<&std::path::Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist, establishes a connection
/// pool with up to 5 connections, and runs all pending migrations.
///
/// # Errors
///
/// Returns an error if:
/// - Database creation fails
/// - Connection cannot be established
/// - Migration fails
pub async fn init_db(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// ============================================================================
// Artists & albums
// ============================================================================

/// Get or create an artist by name.
///
/// An empty (or whitespace-only) name resolves to the placeholder artist.
/// Idempotent: the same name always returns the same ID.
pub async fn get_or_create_artist(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(UNKNOWN_ID);
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM artists WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    if let Some((id,)) = row {
        Ok(id)
    } else {
        let result = sqlx::query("INSERT INTO artists (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

/// Get or create an album by name and artist.
///
/// An empty (or whitespace-only) name resolves to the artist's own
/// placeholder album, created on first use. The song keeps its artist
/// even when no album is known.
pub async fn get_or_create_album(
    pool: &SqlitePool,
    artist_id: i64,
    name: &str,
) -> sqlx::Result<i64> {
    let name = name.trim();
    let (name, placeholder) = if name.is_empty() {
        (Album::UNKNOWN_NAME, true)
    } else {
        (name, false)
    };

    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM albums WHERE artist_id = ? AND name = ? AND placeholder = ?",
    )
    .bind(artist_id)
    .bind(name)
    .bind(placeholder)
    .fetch_optional(pool)
    .await?;

    if let Some((id,)) = row {
        Ok(id)
    } else {
        let result =
            sqlx::query("INSERT INTO albums (artist_id, name, placeholder) VALUES (?, ?, ?)")
                .bind(artist_id)
                .bind(name)
                .bind(placeholder)
                .execute(pool)
                .await?;
        debug!(artist_id, name, placeholder, "Created album");
        Ok(result.last_insert_rowid())
    }
}

/// Get an artist by ID.
pub async fn get_artist(pool: &SqlitePool, artist_id: i64) -> sqlx::Result<Option<Artist>> {
    sqlx::query_as::<_, Artist>("SELECT id, name FROM artists WHERE id = ?")
        .bind(artist_id)
        .fetch_optional(pool)
        .await
}

/// Get an album by ID.
pub async fn get_album(pool: &SqlitePool, album_id: i64) -> sqlx::Result<Option<Album>> {
    sqlx::query_as::<_, Album>(
        "SELECT id, artist_id, name, placeholder FROM albums WHERE id = ?",
    )
        .bind(album_id)
        .fetch_optional(pool)
        .await
}

// ============================================================================
// Songs
// ============================================================================

/// Insert or update a song record.
///
/// Keyed by the song's identity hash, so rescanning a file updates its
/// existing row. `created_at` and stored lyrics are kept on update.
pub async fn upsert_song(pool: &SqlitePool, song: &Song) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO songs (id, album_id, title, length, path, mtime, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            album_id = excluded.album_id,
            title = excluded.title,
            length = excluded.length,
            path = excluded.path,
            mtime = excluded.mtime,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&song.id)
    .bind(song.album_id)
    .bind(song.stored_title())
    .bind(song.length)
    .bind(&song.path)
    .bind(song.mtime)
    .bind(&song.created_at)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    debug!(id = %song.id, path = %song.path, "Upserted song");
    Ok(())
}

/// Get a song by its identity key.
pub async fn get_song(pool: &SqlitePool, song_id: &str) -> sqlx::Result<Option<Song>> {
    sqlx::query_as::<_, Song>(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"))
        .bind(song_id)
        .fetch_optional(pool)
        .await
}

/// Get all songs, ordered by path.
pub async fn get_all_songs(pool: &SqlitePool) -> sqlx::Result<Vec<Song>> {
    sqlx::query_as::<_, Song>(&format!("SELECT {SONG_COLUMNS} FROM songs ORDER BY path"))
        .fetch_all(pool)
        .await
}

/// Get all songs whose path starts with `prefix`, ordered by path.
///
/// This is a literal, case-sensitive prefix match: `%` and `_` in the
/// prefix have no special meaning.
pub async fn get_songs_with_prefix(pool: &SqlitePool, prefix: &str) -> sqlx::Result<Vec<Song>> {
    sqlx::query_as::<_, Song>(&format!(
        "SELECT {SONG_COLUMNS} FROM songs WHERE substr(path, 1, length(?1)) = ?1 ORDER BY path"
    ))
    .bind(prefix)
    .fetch_all(pool)
    .await
}

/// Delete a song. Returns whether a row was removed.
pub async fn delete_song(pool: &SqlitePool, song_id: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM songs WHERE id = ?")
        .bind(song_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Fetch the raw stored lyrics of a song.
///
/// Returns `None` if the song doesn't exist or has no lyrics.
pub async fn get_song_lyrics(pool: &SqlitePool, song_id: &str) -> sqlx::Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT lyrics FROM songs WHERE id = ?")
        .bind(song_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|(lyrics,)| lyrics))
}

/// Get a song by its identity key with its lyrics loaded.
pub async fn get_song_with_lyrics(pool: &SqlitePool, song_id: &str) -> sqlx::Result<Option<Song>> {
    let Some(mut song) = get_song(pool, song_id).await? else {
        return Ok(None);
    };
    song.lyrics = get_song_lyrics(pool, song_id).await?;
    Ok(Some(song))
}

/// Replace a song's lyrics. Returns whether the song exists.
pub async fn set_song_lyrics(
    pool: &SqlitePool,
    song_id: &str,
    lyrics: Option<&str>,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE songs SET lyrics = ?, updated_at = ? WHERE id = ?")
        .bind(lyrics)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(song_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load the album and artist belonging to `song`.
///
/// Returns `None` if either row is missing.
pub async fn load_song_context(pool: &SqlitePool, song: Song) -> sqlx::Result<Option<SongContext>> {
    let Some(album) = get_album(pool, song.album_id).await? else {
        return Ok(None);
    };
    let Some(artist) = get_artist(pool, album.artist_id).await? else {
        return Ok(None);
    };

    Ok(Some(SongContext {
        song,
        album,
        artist,
    }))
}

// ============================================================================
// Users
// ============================================================================

/// Create a user and return the new ID.
pub async fn create_user(pool: &SqlitePool, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO users (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT id, name, lastfm_session_key FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Link (`Some`) or unlink (`None`) a user's Last.fm session.
///
/// Returns whether the user exists.
pub async fn set_lastfm_session_key(
    pool: &SqlitePool,
    user_id: i64,
    session_key: Option<&str>,
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE users SET lastfm_session_key = ? WHERE id = ?")
        .bind(session_key)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Playlists
// ============================================================================

/// Create a playlist for a user and return the new ID.
pub async fn create_playlist(pool: &SqlitePool, user_id: i64, name: &str) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO playlists (user_id, name) VALUES (?, ?)")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Add a song to a playlist. Adding it twice is a no-op.
pub async fn add_song_to_playlist(
    pool: &SqlitePool,
    playlist_id: i64,
    song_id: &str,
) -> sqlx::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO playlist_song (playlist_id, song_id) VALUES (?, ?)")
        .bind(playlist_id)
        .bind(song_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Get a playlist by ID.
pub async fn get_playlist(pool: &SqlitePool, playlist_id: i64) -> sqlx::Result<Option<Playlist>> {
    sqlx::query_as::<_, Playlist>("SELECT id, user_id, name FROM playlists WHERE id = ?")
        .bind(playlist_id)
        .fetch_optional(pool)
        .await
}

/// Songs on a playlist, ordered by path.
pub async fn get_playlist_songs(pool: &SqlitePool, playlist_id: i64) -> sqlx::Result<Vec<Song>> {
    sqlx::query_as::<_, Song>(
        r#"
        SELECT s.id, s.album_id, s.title, s.length, s.path, s.mtime, s.created_at, s.updated_at
        FROM songs s
        JOIN playlist_song ps ON ps.song_id = s.id
        WHERE ps.playlist_id = ?
        ORDER BY s.path
        "#,
    )
    .bind(playlist_id)
    .fetch_all(pool)
    .await
}

/// Playlists containing a song.
pub async fn get_song_playlists(pool: &SqlitePool, song_id: &str) -> sqlx::Result<Vec<Playlist>> {
    sqlx::query_as::<_, Playlist>(
        r#"
        SELECT p.id, p.user_id, p.name
        FROM playlists p
        JOIN playlist_song ps ON ps.playlist_id = p.id
        WHERE ps.song_id = ?
        ORDER BY p.id
        "#,
    )
    .bind(song_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{insert_mock_song, mock_song, temp_db};

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}", db_path.display());

        let pool = init_db(&db_url).await.expect("Failed to init db");
        assert!(db_path.exists());

        let songs = get_all_songs(&pool).await.expect("Failed to query songs");
        assert!(songs.is_empty());
    }

    #[tokio::test]
    async fn test_placeholders_are_seeded() {
        let (pool, _dir) = temp_db().await;

        let artist = get_artist(&pool, UNKNOWN_ID).await.unwrap().unwrap();
        assert!(artist.is_unknown());
        assert_eq!(artist.name, Artist::UNKNOWN_NAME);

        let album = get_album(&pool, UNKNOWN_ID).await.unwrap().unwrap();
        assert!(album.is_unknown());
        assert_eq!(album.name, Album::UNKNOWN_NAME);
        assert_eq!(album.artist_id, UNKNOWN_ID);

        // No artist and no album lands on the seeded pair
        let artist_id = get_or_create_artist(&pool, "").await.unwrap();
        assert_eq!(get_or_create_album(&pool, artist_id, "").await.unwrap(), UNKNOWN_ID);
    }

    #[tokio::test]
    async fn test_artist_creation_and_retrieval() {
        let (pool, _dir) = temp_db().await;

        let id1 = get_or_create_artist(&pool, "ABBA").await.unwrap();
        assert_ne!(id1, UNKNOWN_ID);

        // Same artist - same ID
        let id2 = get_or_create_artist(&pool, "ABBA").await.unwrap();
        assert_eq!(id1, id2);

        // Different artist - different ID
        let id3 = get_or_create_artist(&pool, "Queen").await.unwrap();
        assert_ne!(id1, id3);

        // No name - placeholder
        assert_eq!(get_or_create_artist(&pool, "  ").await.unwrap(), UNKNOWN_ID);
    }

    #[tokio::test]
    async fn test_album_creation_and_retrieval() {
        let (pool, _dir) = temp_db().await;
        let artist_id = get_or_create_artist(&pool, "ABBA").await.unwrap();

        let album_id1 = get_or_create_album(&pool, artist_id, "Arrival").await.unwrap();
        let album_id2 = get_or_create_album(&pool, artist_id, "Arrival").await.unwrap();
        assert_eq!(album_id1, album_id2);

        let album = get_album(&pool, album_id1).await.unwrap().unwrap();
        assert_eq!(album.name, "Arrival");
        assert_eq!(album.artist_id, artist_id);

        assert!(!album.is_unknown());
    }

    #[tokio::test]
    async fn test_missing_album_keeps_artist() {
        let (pool, _dir) = temp_db().await;
        let abba = get_or_create_artist(&pool, "ABBA").await.unwrap();
        let queen = get_or_create_artist(&pool, "Queen").await.unwrap();

        let abba_unknown = get_or_create_album(&pool, abba, "").await.unwrap();
        let queen_unknown = get_or_create_album(&pool, queen, " ").await.unwrap();
        assert_ne!(abba_unknown, UNKNOWN_ID);
        assert_ne!(abba_unknown, queen_unknown);
        assert_eq!(get_or_create_album(&pool, abba, "").await.unwrap(), abba_unknown);

        let album = get_album(&pool, abba_unknown).await.unwrap().unwrap();
        assert!(album.is_unknown());
        assert_eq!(album.artist_id, abba);

        // A real album with the placeholder's name is a separate row
        let real = get_or_create_album(&pool, abba, Album::UNKNOWN_NAME).await.unwrap();
        assert_ne!(real, abba_unknown);
        assert!(!get_album(&pool, real).await.unwrap().unwrap().is_unknown());

        let mut song = mock_song("/music/Abba/Waterloo.mp3");
        song.album_id = abba_unknown;
        upsert_song(&pool, &song).await.unwrap();

        let ctx = load_song_context(&pool, song).await.unwrap().unwrap();
        assert_eq!(ctx.artist.name, "ABBA");
        assert!(!ctx.artist.is_unknown());
        assert!(ctx.album.is_unknown());
    }

    #[tokio::test]
    async fn test_upsert_song_is_idempotent() {
        let (pool, _dir) = temp_db().await;

        let song = mock_song("/music/Abba/Waterloo.mp3");
        upsert_song(&pool, &song).await.unwrap();

        let updated = song.clone().with_title("Waterloo (Remastered)").with_length(170.0);
        upsert_song(&pool, &updated).await.unwrap();

        let songs = get_all_songs(&pool).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].stored_title(), "Waterloo (Remastered)");
        assert_eq!(songs[0].length, 170.0);
        assert_eq!(songs[0].created_at, song.created_at);
    }

    #[tokio::test]
    async fn test_song_queries_do_not_load_lyrics() {
        let (pool, _dir) = temp_db().await;
        let id = insert_mock_song(&pool, "/music/a.mp3").await;

        assert!(set_song_lyrics(&pool, &id, Some("line one\nline two")).await.unwrap());

        let song = get_song(&pool, &id).await.unwrap().unwrap();
        assert_eq!(song.lyrics, None);

        let lyrics = get_song_lyrics(&pool, &id).await.unwrap();
        assert_eq!(lyrics.as_deref(), Some("line one\nline two"));

        let song = get_song_with_lyrics(&pool, &id).await.unwrap().unwrap();
        assert_eq!(song.lyrics.as_deref(), Some("line one\nline two"));
        assert_eq!(song.lyrics().as_deref(), Some("line one<br />\nline two"));
    }

    #[tokio::test]
    async fn test_lyrics_missing_song() {
        let (pool, _dir) = temp_db().await;
        assert_eq!(get_song_lyrics(&pool, "nope").await.unwrap(), None);
        assert!(get_song_with_lyrics(&pool, "nope").await.unwrap().is_none());
        assert!(!set_song_lyrics(&pool, "nope", Some("x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_prefix_query_is_literal() {
        let (pool, _dir) = temp_db().await;
        insert_mock_song(&pool, "/music/100%/a.mp3").await;
        insert_mock_song(&pool, "/music/100x/b.mp3").await;
        insert_mock_song(&pool, "/music/A_B/c.mp3").await;
        insert_mock_song(&pool, "/music/AxB/d.mp3").await;

        let songs = get_songs_with_prefix(&pool, "/music/100%/").await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].path, "/music/100%/a.mp3");

        let songs = get_songs_with_prefix(&pool, "/music/A_B/").await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].path, "/music/A_B/c.mp3");

        // Case-sensitive
        assert!(get_songs_with_prefix(&pool, "/MUSIC/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_song() {
        let (pool, _dir) = temp_db().await;
        let id = insert_mock_song(&pool, "/music/a.mp3").await;

        assert!(delete_song(&pool, &id).await.unwrap());
        assert!(!delete_song(&pool, &id).await.unwrap());
        assert!(get_song(&pool, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_song_context() {
        let (pool, _dir) = temp_db().await;
        let id = insert_mock_song(&pool, "/music/a.mp3").await;
        let song = get_song(&pool, &id).await.unwrap().unwrap();

        let ctx = load_song_context(&pool, song).await.unwrap().unwrap();
        assert_eq!(ctx.artist.name, "Test Artist");
        assert_eq!(ctx.album.name, "Test Album");
        assert_eq!(ctx.album.artist_id, ctx.artist.id);
    }

    #[tokio::test]
    async fn test_user_session_link_and_unlink() {
        let (pool, _dir) = temp_db().await;
        let user_id = create_user(&pool, "listener").await.unwrap();

        let user = get_user(&pool, user_id).await.unwrap().unwrap();
        assert_eq!(user.lastfm_session_key(), None);

        assert!(set_lastfm_session_key(&pool, user_id, Some("sk-1")).await.unwrap());
        let user = get_user(&pool, user_id).await.unwrap().unwrap();
        assert_eq!(user.lastfm_session_key(), Some("sk-1"));

        assert!(set_lastfm_session_key(&pool, user_id, None).await.unwrap());
        let user = get_user(&pool, user_id).await.unwrap().unwrap();
        assert_eq!(user.lastfm_session_key(), None);

        assert!(!set_lastfm_session_key(&pool, 999, Some("x")).await.unwrap());
    }

    #[tokio::test]
    async fn test_playlists_many_to_many() {
        let (pool, _dir) = temp_db().await;
        let user_id = create_user(&pool, "listener").await.unwrap();
        let a = insert_mock_song(&pool, "/music/a.mp3").await;
        let b = insert_mock_song(&pool, "/music/b.mp3").await;

        let road = create_playlist(&pool, user_id, "Road trip").await.unwrap();
        let gym = create_playlist(&pool, user_id, "Gym").await.unwrap();

        add_song_to_playlist(&pool, road, &a).await.unwrap();
        add_song_to_playlist(&pool, road, &b).await.unwrap();
        add_song_to_playlist(&pool, road, &a).await.unwrap();
        add_song_to_playlist(&pool, gym, &a).await.unwrap();

        let songs = get_playlist_songs(&pool, road).await.unwrap();
        assert_eq!(songs.len(), 2);

        let playlists = get_song_playlists(&pool, &a).await.unwrap();
        let names: Vec<_> = playlists.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Road trip", "Gym"]);

        let playlist = get_playlist(&pool, gym).await.unwrap().unwrap();
        assert_eq!(playlist.user_id, user_id);
    }
}
