//! Pixel ↔ time mapping and vertical track layout.

use glam::DVec2;
use montage_core::{AnimatableProperty, Rect, TrackId};
use montage_timeline::{Clip, Composition, TrackKind};

/// Horizontal mapping of the timeline viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineView {
    /// Pixels per second.
    pub zoom: f64,
    /// Horizontal scroll in pixels.
    pub scroll_x: f64,
    /// Playhead position in seconds.
    pub playhead: f64,
}

impl Default for TimelineView {
    fn default() -> Self {
        Self {
            zoom: 100.0,
            scroll_x: 0.0,
            playhead: 0.0,
        }
    }
}

impl TimelineView {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    /// Timeline time under a viewport x coordinate.
    #[inline]
    pub fn x_to_time(&self, x: f64) -> f64 {
        if self.zoom <= 0.0 {
            return 0.0;
        }
        (x + self.scroll_x) / self.zoom
    }

    /// Viewport x coordinate of a timeline time.
    #[inline]
    pub fn time_to_x(&self, time: f64) -> f64 {
        time * self.zoom - self.scroll_x
    }

    /// Length in seconds of `px` pixels.
    #[inline]
    pub fn px_to_seconds(&self, px: f64) -> f64 {
        if self.zoom <= 0.0 {
            return 0.0;
        }
        px / self.zoom
    }

    /// Map a viewport point into (time, stack-y) space.
    pub fn to_timeline(&self, pos: DVec2) -> DVec2 {
        DVec2::new(self.x_to_time(pos.x), pos.y)
    }
}

/// One keyframe lane under an expanded track.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneRow {
    pub property: AnimatableProperty,
    pub top: f64,
    pub height: f64,
}

/// Vertical extent of one track, including its keyframe lanes.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    pub track_id: TrackId,
    pub kind: TrackKind,
    pub locked: bool,
    pub top: f64,
    /// Height of the clip body row.
    pub clip_height: f64,
    pub lanes: Vec<LaneRow>,
}

impl TrackRow {
    pub fn bottom(&self) -> f64 {
        self.top + self.clip_height + self.lanes.iter().map(|l| l.height).sum::<f64>()
    }

    pub fn lane(&self, property: &AnimatableProperty) -> Option<&LaneRow> {
        self.lanes.iter().find(|l| &l.property == property)
    }
}

/// Track rows stacked top to bottom in composition order.
#[derive(Debug, Clone, Default)]
pub struct TrackLayout {
    rows: Vec<TrackRow>,
}

impl TrackLayout {
    /// Stack the tracks of `comp`. Expanded tracks get one lane per
    /// animated property found on their clips.
    pub fn from_composition(comp: &Composition, lane_height: f64) -> Self {
        let mut rows = Vec::with_capacity(comp.tracks.len());
        let mut y = 0.0;
        for track in &comp.tracks {
            let mut lanes = Vec::new();
            if track.expanded {
                let mut properties: Vec<AnimatableProperty> = comp
                    .clips
                    .iter()
                    .filter(|c| c.track_id == track.id)
                    .flat_map(|c| c.keyframes.iter())
                    .filter(|t| !t.is_empty())
                    .map(|t| t.property.clone())
                    .collect();
                properties.sort();
                properties.dedup();
                let mut lane_top = y + track.height;
                for property in properties {
                    lanes.push(LaneRow {
                        property,
                        top: lane_top,
                        height: lane_height,
                    });
                    lane_top += lane_height;
                }
            }
            let row = TrackRow {
                track_id: track.id,
                kind: track.kind,
                locked: track.locked,
                top: y,
                clip_height: track.height,
                lanes,
            };
            y = row.bottom();
            rows.push(row);
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn row(&self, track_id: TrackId) -> Option<&TrackRow> {
        self.rows.iter().find(|r| r.track_id == track_id)
    }

    /// The track whose full row (body and lanes) contains `y`.
    pub fn track_at_y(&self, y: f64) -> Option<&TrackRow> {
        self.rows.iter().find(|r| y >= r.top && y < r.bottom())
    }

    pub fn total_height(&self) -> f64 {
        self.rows.last().map_or(0.0, TrackRow::bottom)
    }

    /// Clip body rectangle in (time, stack-y) space.
    pub fn clip_rect(&self, clip: &Clip) -> Option<Rect> {
        let row = self.row(clip.track_id)?;
        Some(Rect::new(clip.start_time, row.top, clip.duration, row.clip_height))
    }

    /// Clip body rectangle in viewport pixels.
    pub fn clip_rect_px(&self, clip: &Clip, view: &TimelineView) -> Option<Rect> {
        let row = self.row(clip.track_id)?;
        Some(Rect::new(
            view.time_to_x(clip.start_time),
            row.top,
            clip.duration * view.zoom,
            row.clip_height,
        ))
    }

    /// The clip body under a viewport point.
    pub fn clip_at<'a>(
        &self,
        comp: &'a Composition,
        view: &TimelineView,
        pos: DVec2,
    ) -> Option<&'a Clip> {
        let row = self.track_at_y(pos.y)?;
        if pos.y >= row.top + row.clip_height {
            return None;
        }
        comp.clip_at(row.track_id, view.x_to_time(pos.x))
    }
}
