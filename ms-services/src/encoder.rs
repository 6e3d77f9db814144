//! Photo metadata encoding seam.
//!
//! When a snap's title or note changes, its photo payload is handed to a
//! `MetadataEncoder` so the embedded metadata can follow the edit. The
//! default encoder leaves the payload untouched.

use chrono::{DateTime, Utc};

use ms_core::error::MsResult;
use ms_models::{Location, Snap};

/// Everything an encoder may embed into a photo.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub title: &'a str,
    pub note: &'a str,
    /// Photo as a `data:` URL. May be empty.
    pub payload: &'a str,
    pub location: Location,
    pub captured_at: DateTime<Utc>,
}

impl<'a> EncodeRequest<'a> {
    pub fn for_snap(snap: &'a Snap) -> Self {
        Self {
            title: &snap.title,
            note: &snap.note,
            payload: &snap.photo,
            location: snap.location,
            captured_at: snap.captured_at,
        }
    }
}

/// Rewrites a photo payload to carry the snap's metadata.
///
/// Returns the new payload. On `Err` callers keep the original payload.
pub trait MetadataEncoder: Send + Sync {
    fn encode(&self, request: &EncodeRequest<'_>) -> MsResult<String>;
}

/// Encoder that returns the payload unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEncoder;

impl MetadataEncoder for PassthroughEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> MsResult<String> {
        Ok(request.payload.to_string())
    }
}
