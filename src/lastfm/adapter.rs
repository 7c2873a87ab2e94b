//! Converts Last.fm DTOs to domain types.

use super::domain::{LastfmError, ScrobbleReceipt};
use super::dto;

/// Convert a scrobble response into a receipt
pub fn to_receipt(response: dto::ScrobbleResponse) -> ScrobbleReceipt {
    let attr = response.scrobbles.attr;
    ScrobbleReceipt {
        accepted: attr.accepted,
        ignored: attr.ignored,
    }
}

/// Convert an API error payload into our error type
pub fn to_error(error: dto::ApiError) -> LastfmError {
    match error.error {
        // 29: Rate limit exceeded
        29 => LastfmError::RateLimited,
        code => LastfmError::Api {
            code,
            message: error.message,
        },
    }
}
