//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed arguments
//! and returns an `anyhow::Result<()>`.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::{self, Config};
use crate::lastfm::LastfmClient;
use crate::model::{Song, UNKNOWN_ID};
use crate::scrobble::{ScrobbleOutcome, SkipReason};
use crate::{db, library, scrobble};

/// Songkeeper CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, global = true, env = "SONGKEEPER_DB")]
    pub db: Option<PathBuf>,

    /// Config file (default: OS config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Add or update a song record
    Add {
        /// Absolute path of the audio file
        path: String,
        /// Title (HTML entities are decoded)
        #[arg(long)]
        title: Option<String>,
        /// Artist name
        #[arg(long)]
        artist: Option<String>,
        /// Album name
        #[arg(long)]
        album: Option<String>,
        /// Duration in seconds
        #[arg(long)]
        length: Option<f64>,
        /// File modification time (Unix seconds)
        #[arg(long)]
        mtime: Option<i64>,
    },
    /// Show the song stored for a path
    Show {
        path: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List all songs
    List {
        #[arg(long)]
        json: bool,
    },
    /// List songs under a directory
    InDir {
        /// Directory path
        dir: String,
        #[arg(long)]
        json: bool,
    },
    /// Print a song's lyrics
    Lyrics {
        path: String,
        /// Print raw lyrics instead of HTML-ready text
        #[arg(long)]
        raw: bool,
    },
    /// Set a song's lyrics from a file, or clear them
    SetLyrics {
        path: String,
        /// Text file containing the lyrics (omit to clear)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove a song record
    Remove { path: String },
    /// Create a user
    UserAdd { name: String },
    /// Link a user to a Last.fm session key
    LastfmLink { user: i64, session_key: String },
    /// Unlink a user's Last.fm session
    LastfmUnlink { user: i64 },
    /// Create a playlist
    PlaylistCreate { user: i64, name: String },
    /// Add a song to a playlist
    PlaylistAdd { playlist: i64, path: String },
    /// Show a playlist's songs
    PlaylistShow {
        playlist: i64,
        #[arg(long)]
        json: bool,
    },
    /// Write a config file with defaults (and optionally an app key)
    ConfigInit {
        /// Installation key mixed into song IDs
        #[arg(long)]
        app_key: Option<String>,
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Scrobble a play to Last.fm
    Scrobble {
        /// Path of the played song
        path: String,
        /// ID of the listening user
        #[arg(long)]
        user: i64,
        /// Unix timestamp the play started at (default: now)
        #[arg(long)]
        timestamp: Option<i64>,
        /// Last.fm API key (or set LASTFM_API_KEY env var)
        #[arg(long, env = "LASTFM_API_KEY")]
        api_key: Option<String>,
        /// Last.fm shared secret (or set LASTFM_API_SECRET env var)
        #[arg(long, env = "LASTFM_API_SECRET")]
        api_secret: Option<String>,
    },
}

/// Resolved settings shared by all commands.
struct Session {
    pool: SqlitePool,
    config: Config,
}

impl Session {
    async fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => config::load_from(path),
            None => config::load(),
        };
        let db_path = cli.db.as_deref().or(config.library.database.as_deref());
        let url = db::db_url(db_path);
        debug!(%url, "Opening database");

        let pool = db::init_db(&url)
            .await
            .with_context(|| format!("Failed to open database {url}"))?;
        Ok(Self { pool, config })
    }

    fn app_key(&self) -> &str {
        &self.config.library.app_key
    }

    /// Find the song at `path` or fail with a readable message.
    async fn require_song(&self, path: &str) -> anyhow::Result<Song> {
        match library::find_by_path(&self.pool, self.app_key(), path).await? {
            Some(song) => Ok(song),
            None => bail!("No song stored for {path}"),
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    rt.block_on(dispatch(cli))
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    // Runs before anything touches the database
    if let Commands::ConfigInit { app_key, force } = &cli.command {
        return cmd_config_init(cli.config.as_deref(), app_key.as_deref(), *force);
    }

    let session = Session::open(cli).await?;

    match &cli.command {
        Commands::Add {
            path,
            title,
            artist,
            album,
            length,
            mtime,
        } => {
            cmd_add(
                &session,
                path,
                title.as_deref(),
                artist.as_deref(),
                album.as_deref(),
                *length,
                *mtime,
            )
            .await
        }
        Commands::Show { path, json } => cmd_show(&session, path, *json).await,
        Commands::List { json } => {
            let songs = db::get_all_songs(&session.pool).await?;
            print_songs(&songs, *json)
        }
        Commands::InDir { dir, json } => {
            let songs = library::songs_in_directory(&session.pool, dir).await?;
            print_songs(&songs, *json)
        }
        Commands::Lyrics { path, raw } => cmd_lyrics(&session, path, *raw).await,
        Commands::SetLyrics { path, file } => {
            cmd_set_lyrics(&session, path, file.as_deref()).await
        }
        Commands::Remove { path } => cmd_remove(&session, path).await,
        Commands::UserAdd { name } => {
            let id = db::create_user(&session.pool, name).await?;
            println!("Created user {} (id {})", name, id);
            Ok(())
        }
        Commands::LastfmLink { user, session_key } => {
            link_session(&session, *user, Some(session_key)).await
        }
        Commands::LastfmUnlink { user } => link_session(&session, *user, None).await,
        Commands::PlaylistCreate { user, name } => {
            let id = db::create_playlist(&session.pool, *user, name).await?;
            println!("Created playlist {} (id {})", name, id);
            Ok(())
        }
        Commands::PlaylistAdd { playlist, path } => {
            let song = session.require_song(path).await?;
            if db::get_playlist(&session.pool, *playlist).await?.is_none() {
                bail!("No playlist with id {playlist}");
            }
            db::add_song_to_playlist(&session.pool, *playlist, &song.id).await?;
            println!("Added {} to playlist {}", song.title(), playlist);
            Ok(())
        }
        Commands::PlaylistShow { playlist, json } => {
            let Some(found) = db::get_playlist(&session.pool, *playlist).await? else {
                bail!("No playlist with id {playlist}");
            };
            let songs = db::get_playlist_songs(&session.pool, found.id).await?;
            if !json {
                println!("{} ({} songs)", found.name, songs.len());
            }
            print_songs(&songs, *json)
        }
        Commands::ConfigInit { .. } => Ok(()),
        Commands::Scrobble {
            path,
            user,
            timestamp,
            api_key,
            api_secret,
        } => {
            cmd_scrobble(
                &session,
                path,
                *user,
                *timestamp,
                api_key.as_deref(),
                api_secret.as_deref(),
            )
            .await
        }
    }
}

// ============================================================================
// Individual command implementations
// ============================================================================

/// Add a song, or update the one already stored for `path`.
///
/// Flags left out keep the stored values on update.
async fn cmd_add(
    session: &Session,
    path: &str,
    title: Option<&str>,
    artist: Option<&str>,
    album: Option<&str>,
    length: Option<f64>,
    mtime: Option<i64>,
) -> anyhow::Result<()> {
    let pool = &session.pool;
    let existing = library::find_by_path(pool, session.app_key(), path).await?;

    let album_id = match (&existing, artist, album) {
        (Some(song), None, None) => song.album_id,
        _ => {
            let artist_id = match (artist, &existing) {
                (Some(name), _) => db::get_or_create_artist(pool, name).await?,
                // Only the album changes: stay with the stored artist
                (None, Some(song)) => match db::get_album(pool, song.album_id).await? {
                    Some(stored) => stored.artist_id,
                    None => UNKNOWN_ID,
                },
                (None, None) => UNKNOWN_ID,
            };
            db::get_or_create_album(pool, artist_id, album.unwrap_or_default()).await?
        }
    };

    let mut song = match existing {
        Some(existing) => existing,
        None => Song::new(library::song_id(session.app_key(), path), path, album_id),
    };
    song.album_id = album_id;
    if let Some(length) = length {
        song.length = length;
    }
    if let Some(mtime) = mtime {
        song.mtime = mtime;
    }
    if let Some(title) = title {
        song.set_title(title);
    }

    db::upsert_song(pool, &song).await?;
    println!("Stored {} ({})", song.title(), song.id);
    Ok(())
}

async fn cmd_show(session: &Session, path: &str, json: bool) -> anyhow::Result<()> {
    let Some(song) = library::find_by_path(&session.pool, session.app_key(), path).await? else {
        println!("No song stored for {}", path);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&song)?);
        return Ok(());
    }

    let Some(ctx) = db::load_song_context(&session.pool, song).await? else {
        bail!("Song at {path} references a missing album or artist");
    };
    let playlists = db::get_song_playlists(&session.pool, &ctx.song.id).await?;

    println!("  ID:     {}", ctx.song.id);
    println!("  Title:  {}", ctx.song.title());
    println!("  Artist: {}", ctx.artist.name);
    println!("  Album:  {}", ctx.album.name);
    println!("  Length: {:.1}s", ctx.song.length);
    if !playlists.is_empty() {
        let names: Vec<_> = playlists.iter().map(|p| p.name.as_str()).collect();
        println!("  Playlists: {}", names.join(", "));
    }
    Ok(())
}

async fn cmd_lyrics(session: &Session, path: &str, raw: bool) -> anyhow::Result<()> {
    let id = session.require_song(path).await?.id;
    let Some(song) = db::get_song_with_lyrics(&session.pool, &id).await? else {
        bail!("No song stored for {path}");
    };

    let text = if raw { song.lyrics.clone() } else { song.lyrics() };
    match text {
        Some(text) => println!("{}", text),
        None => println!("No lyrics for {}", song.title()),
    }
    Ok(())
}

async fn cmd_set_lyrics(session: &Session, path: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let song = session.require_song(path).await?;
    let lyrics = match file {
        Some(file) => Some(
            std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read lyrics from {}", file.display()))?,
        ),
        None => None,
    };

    db::set_song_lyrics(&session.pool, &song.id, lyrics.as_deref()).await?;
    if lyrics.is_some() {
        println!("Lyrics updated for {}", song.title());
    } else {
        println!("Lyrics cleared for {}", song.title());
    }
    Ok(())
}

async fn cmd_remove(session: &Session, path: &str) -> anyhow::Result<()> {
    let id = library::song_id(session.app_key(), path);
    if db::delete_song(&session.pool, &id).await? {
        println!("Removed {}", path);
    } else {
        println!("No song stored for {}", path);
    }
    Ok(())
}

async fn link_session(
    session: &Session,
    user: i64,
    session_key: Option<&str>,
) -> anyhow::Result<()> {
    if !db::set_lastfm_session_key(&session.pool, user, session_key).await? {
        bail!("No user with id {user}");
    }
    match session_key {
        Some(_) => println!("Linked Last.fm session for user {}", user),
        None => println!("Unlinked Last.fm session for user {}", user),
    }
    Ok(())
}

async fn cmd_scrobble(
    session: &Session,
    path: &str,
    user: i64,
    timestamp: Option<i64>,
    api_key: Option<&str>,
    api_secret: Option<&str>,
) -> anyhow::Result<()> {
    let credentials = &session.config.credentials;
    let api_key = api_key
        .map(str::to_string)
        .or_else(|| credentials.lastfm_api_key.clone())
        .unwrap_or_default();
    let api_secret = api_secret
        .map(str::to_string)
        .or_else(|| credentials.lastfm_api_secret.clone())
        .unwrap_or_default();

    let Some(actor) = db::get_user(&session.pool, user).await? else {
        bail!("No user with id {user}");
    };
    let song = session.require_song(path).await?;
    let Some(ctx) = db::load_song_context(&session.pool, song).await? else {
        bail!("Song at {path} references a missing album or artist");
    };

    let client = LastfmClient::new(api_key, api_secret)?;
    let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());

    let outcome = match scrobble::scrobble(&client, &ctx, &actor, timestamp).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_invalid_session() => {
            bail!("Last.fm rejected the session key of user {user}; link a new one with `lastfm-link`")
        }
        Err(e) => return Err(e.into()),
    };

    match outcome {
        ScrobbleOutcome::Submitted(receipt) if receipt.is_accepted() => {
            println!("✓ Scrobbled {} - {}", ctx.artist.name, ctx.song.title());
        }
        ScrobbleOutcome::Submitted(_) => {
            println!("✗ Last.fm ignored the scrobble");
        }
        ScrobbleOutcome::Skipped(SkipReason::UnknownArtist) => {
            println!("Skipped: song has no known artist");
        }
        ScrobbleOutcome::Skipped(SkipReason::NoLinkedSession) => {
            println!("Skipped: user {} has no linked Last.fm session", actor.id);
        }
    }
    Ok(())
}

fn cmd_config_init(path: Option<&Path>, app_key: Option<&str>, force: bool) -> anyhow::Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => config::config_path().context("Could not determine config directory")?,
    };
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }

    let mut config = Config::default();
    if let Some(key) = app_key {
        config.library.app_key = key.to_string();
    }

    match path {
        Some(path) => config::save_to(&config, path)?,
        None => config::save(&config)?,
    }
    println!("Wrote {}", target.display());
    Ok(())
}

fn print_songs(songs: &[Song], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(songs)?);
        return Ok(());
    }

    for song in songs {
        println!("{}  {:>7.1}s  {}", song.id, song.length, song.title());
    }
    Ok(())
}
