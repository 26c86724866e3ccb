//! Trim handle interaction for timeline clips.

use glam::DVec2;
use montage_core::{ClipId, Rect, Result};
use montage_timeline::{Clip, TimelineStore, TrimEdge, TrimPlan};
use tracing::{debug, warn};

use crate::selection::{GestureOutcome, Modifiers};
use crate::snapping::{SnapPoint, SnappingEngine};
use crate::view::TimelineView;

/// Hit test a position against a clip's trim handles.
///
/// Returns `Some(TrimEdge)` if the position is over a trim handle, otherwise `None`.
pub fn hit_test_trim_handle(clip_rect: Rect, pos: DVec2, handle_width: f64) -> Option<TrimEdge> {
    if !clip_rect.contains(pos) {
        return None;
    }
    // Narrow clips split the rect between both handles.
    let handle_width = handle_width.min(clip_rect.width / 2.0);

    let left_handle = Rect::new(clip_rect.x, clip_rect.y, handle_width, clip_rect.height);
    if left_handle.contains(pos) {
        return Some(TrimEdge::Left);
    }

    let right_handle = Rect::new(
        clip_rect.right() - handle_width,
        clip_rect.y,
        handle_width,
        clip_rect.height,
    );
    if right_handle.contains(pos) {
        return Some(TrimEdge::Right);
    }

    None
}

/// Active trim state.
#[derive(Debug, Clone)]
pub struct TrimGesture {
    clip_id: ClipId,
    edge: TrimEdge,
    /// The clip as it was when the trim started.
    original: Clip,
    /// Pointer time at press.
    origin_time: f64,
    snapping: SnappingEngine,
    snap_points: Vec<SnapPoint>,
    preview: TrimPlan,
    /// Trim preview of the linked clip, if it follows.
    partner_preview: Option<(ClipId, TrimPlan)>,
    snapped_to: Option<SnapPoint>,
    independent: bool,
}

impl TrimGesture {
    pub fn begin(
        store: &TimelineStore,
        view: &TimelineView,
        clip_id: ClipId,
        edge: TrimEdge,
        pointer_x: f64,
        modifiers: Modifiers,
    ) -> Result<Self> {
        let comp = store.active();
        let clip = comp.require_clip(clip_id)?.clone();
        let preview = store.plan_trim(&clip, edge, 0.0, &[]);
        let mut exclude = vec![clip_id];
        exclude.extend(clip.linked_clip_id);
        debug!(clip = %clip_id, ?edge, "Trim started");
        Ok(Self {
            clip_id,
            edge,
            origin_time: view.x_to_time(pointer_x),
            snapping: SnappingEngine::from_config(store.config()),
            snap_points: SnappingEngine::collect_snap_points(comp, view.playhead, &exclude),
            preview,
            partner_preview: None,
            snapped_to: None,
            independent: modifiers.alt,
            original: clip,
        })
    }

    pub fn edge(&self) -> TrimEdge {
        self.edge
    }

    /// Clamped timing of the trimmed clip as currently previewed.
    pub fn preview(&self) -> &TrimPlan {
        &self.preview
    }

    pub fn partner_preview(&self) -> Option<&(ClipId, TrimPlan)> {
        self.partner_preview.as_ref()
    }

    pub fn snapped_to(&self) -> Option<SnapPoint> {
        self.snapped_to
    }

    /// How far the trim has moved from its starting position, after clamping.
    pub fn delta(&self) -> f64 {
        self.preview.applied_delta
    }

    /// Pointer moved.
    pub fn update(
        &mut self,
        store: &TimelineStore,
        view: &TimelineView,
        pointer_x: f64,
        modifiers: Modifiers,
    ) -> &TrimPlan {
        self.independent = modifiers.alt;
        let edge_time = match self.edge {
            TrimEdge::Left => self.original.start_time,
            TrimEdge::Right => self.original.end_time(),
        };
        let raw = edge_time + view.x_to_time(pointer_x) - self.origin_time;
        let (snapped, target) = self.snapping.snap_time(raw, &self.snap_points, view.zoom);
        self.snapped_to = target;

        self.preview = store.plan_trim(&self.original, self.edge, snapped - edge_time, &[]);
        self.partner_preview = if self.independent {
            None
        } else {
            self.original
                .linked_clip_id
                .and_then(|id| store.active().clip(id))
                .map(|partner| {
                    (
                        partner.id,
                        store.plan_trim(partner, self.edge, self.preview.applied_delta, &[self.clip_id]),
                    )
                })
        };
        &self.preview
    }

    /// Pointer released: one commit for the clip and its linked partner.
    pub fn finish(self, store: &mut TimelineStore) -> GestureOutcome {
        let delta = self.preview.applied_delta;
        if delta.abs() <= f64::EPSILON {
            return GestureOutcome::Unchanged;
        }
        match store.trim_edge(self.clip_id, self.edge, delta, self.independent) {
            Ok(_) => GestureOutcome::Committed,
            Err(e) => {
                warn!(clip = %self.clip_id, error = %e, "Trim reverted");
                GestureOutcome::Reverted {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn cancel(self) -> GestureOutcome {
        debug!(clip = %self.clip_id, "Trim cancelled");
        GestureOutcome::Unchanged
    }
}
