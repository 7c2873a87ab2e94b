//! Command-line interface for songkeeper.
//!
//! This module provides CLI commands for managing song records, users,
//! playlists and Last.fm scrobbling.

mod commands;

pub use commands::{Cli, Commands, run_command};
