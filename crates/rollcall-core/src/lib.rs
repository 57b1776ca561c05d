//! rollcall-core — Presence tracking for face-based attendance.
//!
//! Converts a stream of per-frame face detections into discrete attendance
//! events: the enrollment gallery and nearest-neighbor matcher resolve
//! embeddings to identities, and the presence state machine decides when a
//! sighting becomes a punch-in or punch-out.

pub mod gallery;
pub mod matcher;
pub mod presence;
pub mod types;

pub use gallery::{Gallery, GalleryError};
pub use matcher::{Matcher, NearestMatcher, DEFAULT_MATCH_THRESHOLD};
pub use presence::{PresenceState, PresenceTracker};
pub use types::{
    AttendanceRecord, BoundingBox, Detection, DisplayStatus, Embedding, EmbeddingError, EventKind,
};

/// Default data directory: `$XDG_DATA_HOME/rollcall`, falling back to
/// `~/.local/share/rollcall`.
pub fn default_data_dir() -> std::path::PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            std::path::PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}
