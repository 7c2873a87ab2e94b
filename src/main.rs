//! Songkeeper - song records for a self-hosted music library.
//!
//! Stores songs keyed by a hash of their file path, renders their display
//! attributes, filters them by directory and scrobbles plays to Last.fm.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod lastfm;
pub mod library;
pub mod model;
pub mod scrobble;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("songkeeper=info".parse()?))
        .init();

    cli::run_command(&args)
}
