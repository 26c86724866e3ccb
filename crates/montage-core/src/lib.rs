//! Montage Core - Foundation types for the editing engine
//!
//! This crate provides the fundamental types shared by every Montage crate:
//! - Time representation (FrameRate, TimeRange, frame indexing)
//! - Keyframe tracks with eased interpolation
//! - Clip transforms and blend modes
//! - Engine configuration
//! - The common error type

pub mod config;
pub mod error;
pub mod geometry;
pub mod keyframe;
pub mod time;

pub use config::{EngineConfig, SyncConfig};
pub use error::{MontageError, Result};
pub use geometry::{BlendMode, Rect, Transform};
pub use keyframe::{AnimatableProperty, CubicBezier, Easing, Keyframe, KeyframeTrack};
pub use time::{frame_index, FrameRate, TimeRange, TIME_EPSILON};

/// Identifier aliases. Every entity is addressed by a v4 UUID; references
/// between entities are always by id, never by ownership.
pub mod ids {
    use uuid::Uuid;

    pub type ClipId = Uuid;
    pub type TrackId = Uuid;
    pub type CompositionId = Uuid;
    pub type MediaId = Uuid;
    pub type GroupId = Uuid;
    pub type KeyframeId = Uuid;
    pub type EffectId = Uuid;
}

pub use ids::{ClipId, CompositionId, EffectId, GroupId, KeyframeId, MediaId, TrackId};
