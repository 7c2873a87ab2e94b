//! The song record and its attribute rules.
//!
//! Stored values and displayed values differ for two attributes:
//! - `title` is entity-decoded on write, and falls back to the file name
//!   on read when nothing is stored.
//! - `lyrics` gets HTML line breaks on read.
//!
//! Neither read-time rule touches the stored value.

use std::borrow::Cow;
use std::path::Path;

use serde::Serialize;
use sqlx::FromRow;

/// Inserted before every line break when lyrics are prepared for display.
const LINE_BREAK: &str = "<br />";

/// A song (audio file) in the library.
///
/// The `id` is derived from `path` (see [`crate::library::song_id`]), so
/// rescanning the same file always lands on the same row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Song {
    /// Identity key: hash of the file path
    pub id: String,
    /// Foreign key to albums table
    pub album_id: i64,
    /// Title as stored (already entity-decoded, may be empty)
    #[sqlx(rename = "title")]
    stored_title: String,
    /// Duration in seconds
    pub length: f64,
    /// Raw lyrics. Only populated by an explicit lyrics query.
    #[sqlx(default)]
    pub lyrics: Option<String>,
    /// Absolute file path
    pub path: String,
    /// File modification time (Unix seconds) at ingestion
    pub mtime: i64,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// RFC 3339 last update timestamp
    pub updated_at: String,
}

impl Song {
    /// Create a new, untitled song record.
    pub fn new(id: impl Into<String>, path: impl Into<String>, album_id: i64) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            album_id,
            stored_title: String::new(),
            length: 0.0,
            lyrics: None,
            path: path.into(),
            mtime: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Builder-style title setter. See [`Song::set_title`].
    pub fn with_title(mut self, raw: &str) -> Self {
        self.set_title(raw);
        self
    }

    /// Builder-style length setter.
    pub fn with_length(mut self, seconds: f64) -> Self {
        self.length = seconds;
        self
    }

    /// Store a title, decoding any HTML entities first.
    ///
    /// Tag extractors sometimes hand over entity-encoded text
    /// (`Caf&eacute;`); storage always holds the decoded form.
    pub fn set_title(&mut self, raw: &str) {
        self.stored_title = decode_entities(raw).into_owned();
    }

    /// The title exactly as stored.
    pub fn stored_title(&self) -> &str {
        &self.stored_title
    }

    /// The display title.
    ///
    /// Songs without a stored title use their file name minus the extension.
    pub fn title(&self) -> Cow<'_, str> {
        if !self.stored_title.is_empty() {
            return Cow::Borrowed(&self.stored_title);
        }

        Path::new(&self.path)
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or(Cow::Borrowed(""))
    }

    /// Lyrics prepared for display, if they were loaded.
    pub fn lyrics(&self) -> Option<String> {
        self.lyrics.as_deref().map(lyrics_for_display)
    }

    /// External representation with hidden fields removed.
    pub fn to_resource(&self) -> SongResource<'_> {
        SongResource {
            id: &self.id,
            album_id: self.album_id,
            title: self.title(),
            length: self.length,
        }
    }
}

/// What a song looks like to the outside world.
///
/// `path`, `lyrics`, `mtime` and the timestamps never leave the process
/// this way. Lyrics have their own query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongResource<'a> {
    pub id: &'a str,
    pub album_id: i64,
    pub title: Cow<'a, str>,
    pub length: f64,
}

impl Serialize for Song {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_resource().serialize(serializer)
    }
}

/// Decode HTML entities (`&amp;`, `&eacute;`, `&#233;`, ...).
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(raw)
}

/// Insert an HTML line break before every newline sequence.
///
/// `\r\n`, `\n\r`, `\n` and `\r` each count as one break. The newline
/// characters themselves are kept.
pub fn lyrics_for_display(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                out.push_str(LINE_BREAK);
                out.push(c);
                let pair = if c == '\r' { '\n' } else { '\r' };
                if chars.peek() == Some(&pair) {
                    out.push(pair);
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}
