//! Pick-whip: drag from a parent handle onto another clip or track to
//! parent it.

use glam::DVec2;
use montage_core::{ClipId, TrackId};
use montage_timeline::{Composition, TimelineStore};
use tracing::warn;

use crate::selection::GestureOutcome;
use crate::view::{TimelineView, TrackLayout};

/// Where the whip was dragged from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickWhipSource {
    Clip(ClipId),
    Track(TrackId),
}

/// What the whip currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhipTarget {
    /// Empty space: releasing clears the parent.
    Empty,
    Valid(uuid::Uuid),
    /// Self or a descendant: releasing is rejected.
    Invalid(uuid::Uuid),
}

#[derive(Debug, Clone)]
pub struct PickWhipGesture {
    source: PickWhipSource,
    target: WhipTarget,
}

impl PickWhipGesture {
    pub fn begin(source: PickWhipSource) -> Self {
        Self {
            source,
            target: WhipTarget::Empty,
        }
    }

    pub fn source(&self) -> PickWhipSource {
        self.source
    }

    pub fn target(&self) -> WhipTarget {
        self.target
    }

    /// Pointer moved: classify what is under it.
    pub fn update(
        &mut self,
        comp: &Composition,
        layout: &TrackLayout,
        view: &TimelineView,
        pointer: DVec2,
    ) -> WhipTarget {
        self.target = match self.source {
            PickWhipSource::Clip(child) => match layout.clip_at(comp, view, pointer) {
                None => WhipTarget::Empty,
                Some(parent) if parent.id == child => WhipTarget::Invalid(parent.id),
                Some(parent) if comp.clip_parent_chain_reaches(parent.id, child) => {
                    WhipTarget::Invalid(parent.id)
                }
                Some(parent) => WhipTarget::Valid(parent.id),
            },
            PickWhipSource::Track(child) => match layout.track_at_y(pointer.y) {
                None => WhipTarget::Empty,
                Some(row) if row.track_id == child => WhipTarget::Invalid(row.track_id),
                Some(row) if comp.track_parent_chain_reaches(row.track_id, child) => {
                    WhipTarget::Invalid(row.track_id)
                }
                Some(row) => WhipTarget::Valid(row.track_id),
            },
        };
        self.target
    }

    /// Release: set, clear, or reject.
    pub fn finish(self, store: &mut TimelineStore) -> GestureOutcome {
        let parent = match self.target {
            WhipTarget::Invalid(id) => {
                return GestureOutcome::Reverted {
                    reason: format!("{id} cannot be a parent here"),
                }
            }
            WhipTarget::Valid(id) => Some(id),
            WhipTarget::Empty => None,
        };
        let current = match self.source {
            PickWhipSource::Clip(child) => store.active().clip(child).map(|c| c.parent_clip_id),
            PickWhipSource::Track(child) => store.active().track(child).map(|t| t.parent_track_id),
        };
        if current == Some(parent) {
            return GestureOutcome::Unchanged;
        }
        let result = match self.source {
            PickWhipSource::Clip(child) => store.set_parent_clip(child, parent),
            PickWhipSource::Track(child) => store.set_parent_track(child, parent),
        };
        match result {
            Ok(()) => GestureOutcome::Committed,
            Err(e) => {
                warn!(source = ?self.source, error = %e, "Pick-whip rejected");
                GestureOutcome::Reverted {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn cancel(self) -> GestureOutcome {
        GestureOutcome::Unchanged
    }
}
