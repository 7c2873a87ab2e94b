//! Last.fm integration - reports plays ("scrobbles") to Last.fm.
//!
//! # Architecture
//!
//! Same layering as any external API we talk to:
//! - **Domain models** (`domain.rs`) - Our types, stable across API changes
//! - **API DTOs** (`dto.rs`) - Exact API response shapes
//! - **Adapter** (`adapter.rs`) - Converts DTOs to domain models
//! - **Client** (`client.rs`) - Signed HTTP calls
//! - **Traits** (`traits.rs`) - Seams for dependency injection and mocks
//!
//! Only `track.scrobble` is implemented. Obtaining a session key (the
//! web auth flow) happens elsewhere; users link the resulting key.
//!
//! API docs: https://www.last.fm/api/show/track.scrobble

pub mod domain;
pub mod dto;
pub mod traits;
mod adapter;
mod client;

pub use client::LastfmClient;
pub use domain::{LastfmError, ScrobbleReceipt, ScrobbleTrack};
pub use traits::ScrobbleApi;
