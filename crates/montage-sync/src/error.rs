//! Error types for multicam synchronization.

use montage_core::{ClipId, MontageError};
use thiserror::Error;

/// Errors that can occur while synchronizing clips.
///
/// None of them leave anything written to the timeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fewer than two clips could take part.
    #[error("Need at least 2 clips with usable data to sync, got {0}")]
    InsufficientInput(usize),

    /// The master clip has no audio or no waveform/transcript.
    #[error("Master clip {clip_id} has no {what}")]
    MissingMasterData { clip_id: ClipId, what: String },

    #[error("Sync was cancelled")]
    Cancelled,

    /// The background task panicked or was aborted.
    #[error("Sync task failed: {0}")]
    TaskFailed(String),

    /// Writing the result to the timeline was rejected.
    #[error("Timeline rejected sync result: {0}")]
    Timeline(#[from] MontageError),
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
