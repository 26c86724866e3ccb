//! Cut tool: hover shows where a click will split.

use glam::DVec2;
use montage_core::ClipId;
use montage_timeline::{Composition, TimelineStore};
use tracing::{debug, warn};

use crate::selection::GestureOutcome;
use crate::snapping::SnappingEngine;
use crate::view::{TimelineView, TrackLayout};

/// Active pointer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Cut,
}

/// Where a click would split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutPreview {
    pub clip_id: ClipId,
    /// The linked clip, when it spans the cut time and is split too.
    pub linked_clip_id: Option<ClipId>,
    pub time: f64,
}

/// Cut position for `clip_id` near `time`, snapped and kept far enough
/// inside the clip that both halves respect `min_duration`.
pub fn cut_preview(
    comp: &Composition,
    snapping: &SnappingEngine,
    view: &TimelineView,
    clip_id: ClipId,
    time: f64,
    min_duration: f64,
) -> Option<CutPreview> {
    let clip = comp.clip(clip_id)?;
    let lo = clip.start_time + min_duration;
    let hi = clip.end_time() - min_duration;
    if lo > hi {
        return None;
    }
    let mut exclude = vec![clip.id];
    exclude.extend(clip.linked_clip_id);
    let points = SnappingEngine::collect_snap_points(comp, view.playhead, &exclude);
    let (snapped, _) = snapping.snap_time(time, &points, view.zoom);
    let time = if (lo..=hi).contains(&snapped) {
        snapped
    } else {
        time.clamp(lo, hi)
    };
    let linked_clip_id = clip
        .linked_clip_id
        .and_then(|id| comp.clip(id))
        .filter(|partner| time > partner.start_time && time < partner.end_time())
        .map(|partner| partner.id);
    Some(CutPreview {
        clip_id: clip.id,
        linked_clip_id,
        time,
    })
}

/// Tool state: the current mode and the last hover preview.
#[derive(Debug, Clone, Default)]
pub struct CutTool {
    pub mode: ToolMode,
    hover: Option<CutPreview>,
}

impl CutTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
        if mode != ToolMode::Cut {
            self.hover = None;
        }
    }

    pub fn hover_preview(&self) -> Option<&CutPreview> {
        self.hover.as_ref()
    }

    /// Pointer moved while the cut tool is active.
    pub fn hover(
        &mut self,
        store: &TimelineStore,
        layout: &TrackLayout,
        view: &TimelineView,
        pointer: DVec2,
    ) -> Option<&CutPreview> {
        self.hover = if self.mode == ToolMode::Cut {
            let comp = store.active();
            layout.clip_at(comp, view, pointer).and_then(|clip| {
                cut_preview(
                    comp,
                    &SnappingEngine::from_config(store.config()),
                    view,
                    clip.id,
                    view.x_to_time(pointer.x),
                    store.config().min_clip_duration,
                )
            })
        } else {
            None
        };
        self.hover.as_ref()
    }

    /// Click: split at the hovered position.
    pub fn click(&mut self, store: &mut TimelineStore) -> GestureOutcome {
        let Some(preview) = self.hover.take() else {
            return GestureOutcome::Unchanged;
        };
        match store.split_clip(preview.clip_id, preview.time) {
            Ok(right) => {
                debug!(clip = %preview.clip_id, %right, time = preview.time, "Cut");
                GestureOutcome::Committed
            }
            Err(e) => {
                warn!(clip = %preview.clip_id, error = %e, "Cut rejected");
                GestureOutcome::Reverted {
                    reason: e.to_string(),
                }
            }
        }
    }
}
