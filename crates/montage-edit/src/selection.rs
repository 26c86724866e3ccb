//! Selection state and gesture outcomes shared by every gesture.

use std::collections::BTreeSet;

use montage_core::{ClipId, KeyframeId};

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Toggle membership / extend selection.
    pub shift: bool,
    /// Break links: move or trim the clip on its own.
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        alt: false,
    };
    pub const SHIFT: Self = Self {
        shift: true,
        alt: false,
    };
    pub const ALT: Self = Self {
        shift: false,
        alt: true,
    };
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// A single commit was made.
    Committed,
    /// The end state was invalid; the model is as before the gesture.
    Reverted { reason: String },
    /// Nothing to commit.
    Unchanged,
}

impl GestureOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Selected clips and keyframes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub clips: BTreeSet<ClipId>,
    pub keyframes: BTreeSet<(ClipId, KeyframeId)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, clip_id: ClipId) -> bool {
        self.clips.contains(&clip_id)
    }

    /// Add or remove a clip.
    pub fn toggle(&mut self, clip_id: ClipId) {
        if !self.clips.remove(&clip_id) {
            self.clips.insert(clip_id);
        }
    }

    /// Replace the selection with a single clip.
    pub fn select_only(&mut self, clip_id: ClipId) {
        self.clips.clear();
        self.keyframes.clear();
        self.clips.insert(clip_id);
    }

    pub fn clear(&mut self) {
        self.clips.clear();
        self.keyframes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty() && self.keyframes.is_empty()
    }

    /// Union of two selections.
    pub fn union(&self, other: &Selection) -> Selection {
        Selection {
            clips: self.clips.union(&other.clips).copied().collect(),
            keyframes: self.keyframes.union(&other.keyframes).copied().collect(),
        }
    }
}
