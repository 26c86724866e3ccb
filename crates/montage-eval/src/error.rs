//! Error types for composition evaluation.

use montage_core::{CompositionId, MediaId};
use thiserror::Error;

/// Errors that can occur during evaluation.
///
/// Only `CompositionNotFound` for the root composition aborts a call; the
/// others are raised per clip and that clip's layer is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Composition not found: {0}")]
    CompositionNotFound(CompositionId),

    #[error("Nested composition nesting too deep (max {max_depth}): {composition_id}")]
    NestingTooDeep {
        max_depth: usize,
        composition_id: CompositionId,
    },

    #[error("Composition {0} is already being evaluated further up")]
    NestingCycle(CompositionId),

    #[error("Media {media_id} unavailable: {reason}")]
    Media { media_id: MediaId, reason: String },
}

pub type Result<T> = std::result::Result<T, EvalError>;
