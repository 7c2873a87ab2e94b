//! Scrobbling a song play.
//!
//! Two guards run before anything leaves the process, in this order:
//! 1. songs by the placeholder artist are never scrobbled;
//! 2. listeners without a linked Last.fm session can't be scrobbled for.
//!
//! Either guard produces [`ScrobbleOutcome::Skipped`]. Otherwise the play is
//! handed to the [`ScrobbleApi`] and its answer, success or error, comes back
//! untouched. There is no retry.

use tracing::{debug, info};

use crate::lastfm::{LastfmError, ScrobbleApi, ScrobbleReceipt, ScrobbleTrack};
use crate::model::{SongContext, User};

/// Why a play was not submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The song belongs to the placeholder artist
    UnknownArtist,
    /// The listener has no Last.fm session linked
    NoLinkedSession,
}

/// Result of a scrobble attempt that didn't fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrobbleOutcome {
    /// Nothing was sent
    Skipped(SkipReason),
    /// The play was submitted; this is what the service said
    Submitted(ScrobbleReceipt),
}

/// Build the payload sent for a song.
///
/// The album name is blanked for the placeholder album.
pub fn scrobble_track(ctx: &SongContext, timestamp: i64) -> ScrobbleTrack {
    let album = if ctx.album.is_unknown() {
        String::new()
    } else {
        ctx.album.name.clone()
    };

    ScrobbleTrack {
        artist: ctx.artist.name.clone(),
        title: ctx.song.title().into_owned(),
        timestamp,
        album,
    }
}

/// Scrobble a play of `ctx.song` by `actor`, started at `timestamp`
/// (Unix seconds).
pub async fn scrobble<A>(
    api: &A,
    ctx: &SongContext,
    actor: &User,
    timestamp: i64,
) -> Result<ScrobbleOutcome, LastfmError>
where
    A: ScrobbleApi + ?Sized,
{
    if ctx.artist.is_unknown() {
        debug!(song = %ctx.song.id, "Not scrobbling song by unknown artist");
        return Ok(ScrobbleOutcome::Skipped(SkipReason::UnknownArtist));
    }

    let Some(session_key) = actor.lastfm_session_key() else {
        debug!(user = actor.id, "Not scrobbling, no Last.fm session linked");
        return Ok(ScrobbleOutcome::Skipped(SkipReason::NoLinkedSession));
    };

    let track = scrobble_track(ctx, timestamp);
    let receipt = api.scrobble(&track, session_key).await?;

    info!(
        user = actor.id,
        artist = %track.artist,
        title = %track.title,
        accepted = receipt.accepted,
        "Scrobbled"
    );
    Ok(ScrobbleOutcome::Submitted(receipt))
}
