//! Clip drag gesture: grab, live preview with snapping and resistance,
//! single commit on release.

use glam::DVec2;
use montage_core::{ClipId, MontageError, Result, TimeRange, TrackId, TIME_EPSILON};
use montage_timeline::{placement, Composition, TimelineStore, TrackKind};
use tracing::{debug, warn};

use crate::resistance::resolve_placement;
use crate::selection::{GestureOutcome, Modifiers, Selection};
use crate::snapping::{SnapPoint, SnappingEngine};
use crate::view::{TimelineView, TrackLayout};

/// What the drag currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPreview {
    pub start: f64,
    pub track_id: TrackId,
    pub snapped_to: Option<SnapPoint>,
    /// Preview overlaps another clip; releasing here reverts to the last
    /// valid placement.
    pub forcing_overlap: bool,
}

/// A selected clip moving with the grabbed one.
#[derive(Debug, Clone, Copy)]
struct DragMember {
    id: ClipId,
    start: f64,
    track_id: TrackId,
    duration: f64,
    kind: TrackKind,
}

impl DragMember {
    /// Track the member lands on when the grabbed clip changes rows, the
    /// same way `TimelineStore::move_clips` resolves it.
    fn track(&self, comp: &Composition, row_shift: isize) -> TrackId {
        if row_shift == 0 {
            return self.track_id;
        }
        comp.track_index(self.track_id)
            .map(|i| i as isize + row_shift)
            .filter(|i| *i >= 0)
            .and_then(|i| comp.tracks.get(i as usize))
            .filter(|t| t.kind == self.kind && !t.locked)
            .map_or(self.track_id, |t| t.id)
    }
}

/// An in-progress clip drag.
#[derive(Debug, Clone)]
pub struct DragGesture {
    clip_id: ClipId,
    kind: TrackKind,
    duration: f64,
    grab_offset: f64,
    original_start: f64,
    original_track: TrackId,
    members: Vec<DragMember>,
    earliest_start: f64,
    snapping: SnappingEngine,
    snap_points: Vec<SnapPoint>,
    preview: DragPreview,
    last_valid: (f64, TrackId),
    break_link: bool,
}

impl DragGesture {
    /// Press on a clip. Shift toggles it in the selection; a press on an
    /// unselected clip selects only that clip.
    pub fn begin(
        store: &TimelineStore,
        view: &TimelineView,
        clip_id: ClipId,
        pointer: DVec2,
        modifiers: Modifiers,
        selection: &mut Selection,
    ) -> Result<Self> {
        let comp = store.active();
        let clip = comp.require_clip(clip_id)?;
        if modifiers.shift {
            selection.toggle(clip_id);
        } else if !selection.contains(clip_id) {
            selection.select_only(clip_id);
        }

        let members: Vec<DragMember> = if selection.contains(clip_id) {
            selection
                .clips
                .iter()
                .filter(|id| **id != clip_id)
                .filter_map(|id| comp.clip(*id))
                .map(|c| DragMember {
                    id: c.id,
                    start: c.start_time,
                    track_id: c.track_id,
                    duration: c.duration,
                    kind: c.source.track_kind(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut exclude: Vec<ClipId> = vec![clip_id];
        exclude.extend(members.iter().map(|m| m.id));
        let partners: Vec<ClipId> = exclude
            .iter()
            .filter_map(|id| comp.clip(*id).and_then(|c| c.linked_clip_id))
            .collect();
        exclude.extend(partners);

        let earliest_start = members
            .iter()
            .map(|m| m.start)
            .fold(clip.start_time, f64::min);

        debug!(clip = %clip_id, members = members.len(), "Drag started");
        Ok(Self {
            clip_id,
            kind: clip.source.track_kind(),
            duration: clip.duration,
            grab_offset: view.x_to_time(pointer.x) - clip.start_time,
            original_start: clip.start_time,
            original_track: clip.track_id,
            members,
            earliest_start,
            snapping: SnappingEngine::from_config(store.config()),
            snap_points: SnappingEngine::collect_snap_points(comp, view.playhead, &exclude),
            preview: DragPreview {
                start: clip.start_time,
                track_id: clip.track_id,
                snapped_to: None,
                forcing_overlap: false,
            },
            last_valid: (clip.start_time, clip.track_id),
            break_link: modifiers.alt,
        })
    }

    pub fn clip_id(&self) -> ClipId {
        self.clip_id
    }

    pub fn preview(&self) -> &DragPreview {
        &self.preview
    }

    /// Shared time delta of the current preview.
    pub fn delta(&self) -> f64 {
        self.preview.start - self.original_start
    }

    /// Previewed starts of the other selected clips.
    pub fn member_previews(&self) -> Vec<(ClipId, f64)> {
        let delta = self.delta();
        self.members
            .iter()
            .map(|m| (m.id, m.start + delta))
            .collect()
    }

    fn moving_ids(&self) -> Vec<ClipId> {
        let mut ids = vec![self.clip_id];
        ids.extend(self.members.iter().map(|m| m.id));
        ids
    }

    /// Whether every moving clip is free of overlaps at `delta`.
    fn group_fits(&self, comp: &Composition, delta: f64, track_id: TrackId, row_shift: isize) -> bool {
        let ignore = self.moving_ids();
        let free = |track: TrackId, start: f64, duration: f64| {
            placement::find_overlap(comp, track, TimeRange::new(start, duration), &ignore).is_none()
        };
        free(track_id, self.original_start + delta, self.duration)
            && self
                .members
                .iter()
                .all(|m| free(m.track(comp, row_shift), m.start + delta, m.duration))
    }

    /// Apply resistance to every selected clip. A member pulled back to a
    /// free slot drags the shared delta with it; the result is flagged as
    /// forcing when any member is forced or the adjusted delta still
    /// collides.
    fn resist_members(
        &self,
        comp: &Composition,
        start: f64,
        track_id: TrackId,
        row_shift: isize,
        zoom: f64,
        forcing_overlap_px: f64,
    ) -> (f64, bool) {
        let ignore = self.moving_ids();
        let mut delta = start - self.original_start;
        for member in &self.members {
            let wanted = member.start + delta;
            let placed = resolve_placement(
                comp,
                member.track(comp, row_shift),
                wanted,
                member.duration,
                &ignore,
                zoom,
                forcing_overlap_px,
            );
            if placed.forcing_overlap {
                return (start, true);
            }
            delta += placed.start - wanted;
        }
        if delta < -self.earliest_start - TIME_EPSILON
            || !self.group_fits(comp, delta, track_id, row_shift)
        {
            return (start, true);
        }
        (self.original_start + delta, false)
    }

    /// Pointer moved.
    pub fn update(
        &mut self,
        store: &TimelineStore,
        view: &TimelineView,
        layout: &TrackLayout,
        pointer: DVec2,
        modifiers: Modifiers,
    ) -> &DragPreview {
        let comp = store.active();
        let config = store.config();
        self.break_link = modifiers.alt;

        let raw = view.x_to_time(pointer.x) - self.grab_offset;
        let track_id = layout
            .track_at_y(pointer.y)
            .filter(|row| row.kind == self.kind && !row.locked)
            .map(|row| row.track_id)
            .unwrap_or(self.preview.track_id);

        let snap = self
            .snapping
            .snap_range(raw, self.duration, &self.snap_points, view.zoom);
        // No member may be pushed before zero.
        let floor = self.original_start - self.earliest_start;
        let candidate = snap.start.max(floor);

        let placement = resolve_placement(
            comp,
            track_id,
            candidate,
            self.duration,
            &self.moving_ids(),
            view.zoom,
            config.forcing_overlap_px,
        );
        let (start, forcing_overlap) = if placement.forcing_overlap || self.members.is_empty() {
            (placement.start, placement.forcing_overlap)
        } else {
            let row_shift = match (comp.track_index(self.original_track), comp.track_index(track_id)) {
                (Some(from), Some(to)) => to as isize - from as isize,
                _ => 0,
            };
            self.resist_members(
                comp,
                placement.start,
                track_id,
                row_shift,
                view.zoom,
                config.forcing_overlap_px,
            )
        };

        self.preview = DragPreview {
            start,
            track_id,
            snapped_to: snap.target.filter(|_| start == candidate),
            forcing_overlap,
        };
        if !forcing_overlap {
            self.last_valid = (start, track_id);
        }
        &self.preview
    }

    fn commit(&self, store: &mut TimelineStore, start: f64, track_id: TrackId) -> Result<()> {
        if self.members.is_empty() {
            store.move_clip(self.clip_id, start, Some(track_id), self.break_link)
        } else {
            store.move_clips(
                &self.moving_ids(),
                start - self.original_start,
                Some((self.clip_id, track_id)),
                self.break_link,
            )
        }
    }

    /// Pointer released: commit the preview, or the last valid placement
    /// when the preview is invalid.
    pub fn finish(self, store: &mut TimelineStore) -> GestureOutcome {
        let original = (self.original_start, self.original_track);
        let target = if self.preview.forcing_overlap {
            self.last_valid
        } else {
            (self.preview.start, self.preview.track_id)
        };
        if target == original {
            return if self.preview.forcing_overlap {
                warn!(clip = %self.clip_id, "Drag ended overlapping; reverted");
                GestureOutcome::Reverted {
                    reason: "drag ended in a forcing-overlap state".into(),
                }
            } else {
                GestureOutcome::Unchanged
            };
        }

        let mut result = self.commit(store, target.0, target.1);
        if result.is_err() && target != self.last_valid && self.last_valid != original {
            result = self.commit(store, self.last_valid.0, self.last_valid.1);
        }
        match result {
            Ok(()) => GestureOutcome::Committed,
            Err(e) => {
                warn!(clip = %self.clip_id, error = %e, "Drag reverted");
                GestureOutcome::Reverted {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Abandon the drag without touching the model.
    pub fn cancel(self) -> GestureOutcome {
        debug!(clip = %self.clip_id, "Drag cancelled");
        GestureOutcome::Unchanged
    }
}

/// Convenience for hosts: locate the clip under the pointer and begin.
pub fn begin_at(
    store: &TimelineStore,
    view: &TimelineView,
    layout: &TrackLayout,
    pointer: DVec2,
    modifiers: Modifiers,
    selection: &mut Selection,
) -> Result<DragGesture> {
    let clip_id = layout
        .clip_at(store.active(), view, pointer)
        .map(|c| c.id)
        .ok_or_else(|| MontageError::InvalidParameter("no clip under pointer".into()))?;
    DragGesture::begin(store, view, clip_id, pointer, modifiers, selection)
}
