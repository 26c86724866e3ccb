//! Track types for the timeline.

use montage_core::TrackId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// A lane of clips. Tracks do not own clips; clips point at their track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Row height in pixels
    pub height: f64,
    pub visible: bool,
    pub muted: bool,
    pub solo: bool,
    /// Is track locked (prevent edits)
    pub locked: bool,
    /// Keyframe lanes are shown under the track
    pub expanded: bool,
    /// Transform inheritance from another track
    pub parent_track_id: Option<TrackId>,
}

impl Track {
    pub const DEFAULT_HEIGHT: f64 = 60.0;

    fn with_kind(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            height: Self::DEFAULT_HEIGHT,
            visible: true,
            muted: false,
            solo: false,
            locked: false,
            expanded: false,
            parent_track_id: None,
        }
    }

    /// Create a new video track.
    pub fn new_video(name: impl Into<String>) -> Self {
        Self::with_kind(name, TrackKind::Video)
    }

    /// Create a new audio track.
    pub fn new_audio(name: impl Into<String>) -> Self {
        Self::with_kind(name, TrackKind::Audio)
    }

    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }
}
