//! Error types for Montage.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for model and edit operations.
///
/// Every variant is a validation outcome: the operation that produced it
/// left the timeline unchanged.
#[derive(Error, Debug)]
pub enum MontageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(Uuid),

    #[error("Track not found: {0}")]
    TrackNotFound(Uuid),

    #[error("Composition not found: {0}")]
    CompositionNotFound(Uuid),

    #[error("Keyframe not found: {0}")]
    KeyframeNotFound(Uuid),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Clip {clip_id} would overlap clip {other_id} on track {track_id}")]
    Overlap {
        clip_id: Uuid,
        other_id: Uuid,
        track_id: Uuid,
    },

    #[error("Clip {clip_id} cannot be placed on track {track_id}: {reason}")]
    TrackKindMismatch {
        clip_id: Uuid,
        track_id: Uuid,
        reason: String,
    },

    #[error("Nesting composition {nested} inside {host} would create a cycle")]
    NestingCycle { host: Uuid, nested: Uuid },

    #[error("Parenting {child} to {parent} would create a cycle")]
    ParentCycle { child: Uuid, parent: Uuid },

    #[error("A linked group needs at least 2 clips, got {0}")]
    GroupTooSmall(usize),

    #[error("Track is locked: {0}")]
    TrackLocked(Uuid),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Montage operations.
pub type Result<T> = std::result::Result<T, MontageError>;
