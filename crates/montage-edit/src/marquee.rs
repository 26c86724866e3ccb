//! Rubber-band selection of clips and keyframes.

use glam::DVec2;
use montage_core::Rect;
use montage_timeline::Composition;

use crate::selection::{Modifiers, Selection};
use crate::view::{TimelineView, TrackLayout};

/// Clips and keyframes inside `rect`, given in (time, stack-y) space.
///
/// A clip is hit when its body intersects the rectangle; a keyframe is hit
/// when its lane row intersects the rectangle vertically and its absolute
/// time lies inside it.
pub fn hits_in_rect(comp: &Composition, layout: &TrackLayout, rect: Rect) -> Selection {
    let mut hits = Selection::new();
    for clip in &comp.clips {
        let Some(row) = layout.row(clip.track_id) else {
            continue;
        };
        if layout.clip_rect(clip).is_some_and(|r| r.overlaps(rect)) {
            hits.clips.insert(clip.id);
        }
        for track in &clip.keyframes {
            let Some(lane) = row.lane(&track.property) else {
                continue;
            };
            if lane.top >= rect.bottom() || lane.top + lane.height <= rect.top() {
                continue;
            }
            for kf in track.keyframes() {
                let time = clip.start_time + kf.time;
                if time >= rect.left() && time <= rect.right() {
                    hits.keyframes.insert((clip.id, kf.id));
                }
            }
        }
    }
    hits
}

/// An in-progress marquee.
#[derive(Debug, Clone)]
pub struct MarqueeGesture {
    /// Anchor corner in (time, stack-y) space.
    origin: DVec2,
    current: DVec2,
    initial: Selection,
    extend: bool,
    selection: Selection,
}

impl MarqueeGesture {
    /// Press on empty timeline space. Shift keeps the existing selection.
    pub fn begin(
        view: &TimelineView,
        pointer: DVec2,
        modifiers: Modifiers,
        selection: &Selection,
    ) -> Self {
        let origin = view.to_timeline(pointer);
        let initial = selection.clone();
        let selection = if modifiers.shift {
            initial.clone()
        } else {
            Selection::new()
        };
        Self {
            origin,
            current: origin,
            initial,
            extend: modifiers.shift,
            selection,
        }
    }

    /// Current rectangle in (time, stack-y) space.
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.origin, self.current)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Pointer moved: recompute the whole selection.
    pub fn update(
        &mut self,
        comp: &Composition,
        layout: &TrackLayout,
        view: &TimelineView,
        pointer: DVec2,
    ) -> &Selection {
        self.current = view.to_timeline(pointer);
        let hits = hits_in_rect(comp, layout, self.rect());
        self.selection = if self.extend {
            self.initial.union(&hits)
        } else {
            hits
        };
        &self.selection
    }

    pub fn finish(self) -> Selection {
        self.selection
    }

    /// Abandon the marquee, restoring the selection it started from.
    pub fn cancel(self) -> Selection {
        self.initial
    }
}
