//! Snapping engine for timeline interactions.

use montage_core::{ClipId, EngineConfig};
use montage_timeline::Composition;

/// A point on the timeline that can be snapped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapPoint {
    pub time: f64,
    pub kind: SnapKind,
}

/// Kind of snap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapKind {
    ClipEdge,
    Keyframe,
    Playhead,
}

/// Which edge of a moving range snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnappedEdge {
    Start,
    End,
}

/// Outcome of snapping a range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSnap {
    /// Start of the range after snapping.
    pub start: f64,
    /// The target that was hit, if any.
    pub target: Option<SnapPoint>,
    pub edge: Option<SnappedEdge>,
}

/// Engine for computing snap targets.
#[derive(Debug, Clone)]
pub struct SnappingEngine {
    pub enabled: bool,
    /// Snap distance in pixels (will be divided by zoom).
    pub snap_distance_px: f64,
}

impl SnappingEngine {
    pub fn new(enabled: bool, snap_distance_px: f64) -> Self {
        Self {
            enabled,
            snap_distance_px,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.snap_enabled, config.snap_threshold_px)
    }

    /// Snap threshold in seconds at the given zoom.
    pub fn threshold_seconds(&self, zoom: f64) -> f64 {
        if zoom <= 0.0 {
            0.0
        } else {
            self.snap_distance_px / zoom
        }
    }

    /// Collect snap points: edges of every clip not in `exclude`, absolute
    /// times of their keyframes, and the playhead.
    pub fn collect_snap_points(
        comp: &Composition,
        playhead: f64,
        exclude: &[ClipId],
    ) -> Vec<SnapPoint> {
        let mut points = vec![SnapPoint {
            time: playhead,
            kind: SnapKind::Playhead,
        }];

        for clip in comp.clips.iter().filter(|c| !exclude.contains(&c.id)) {
            points.push(SnapPoint {
                time: clip.start_time,
                kind: SnapKind::ClipEdge,
            });
            points.push(SnapPoint {
                time: clip.end_time(),
                kind: SnapKind::ClipEdge,
            });
            points.extend(clip.keyframe_times().map(|time| SnapPoint {
                time,
                kind: SnapKind::Keyframe,
            }));
        }

        points
    }

    /// Find the closest snap point within snap distance.
    pub fn find_snap(&self, time: f64, points: &[SnapPoint], zoom: f64) -> Option<SnapPoint> {
        if !self.enabled || zoom <= 0.0 {
            return None;
        }
        let threshold = self.threshold_seconds(zoom);

        let mut best: Option<(SnapPoint, f64)> = None;
        for sp in points {
            let dist = (sp.time - time).abs();
            if dist <= threshold && best.map_or(true, |(_, d)| dist < d) {
                best = Some((*sp, dist));
            }
        }
        best.map(|(sp, _)| sp)
    }

    /// Snap a range of `duration` starting at `start` by either edge.
    ///
    /// The edge closest to a target wins; on an exact tie the start edge
    /// wins.
    pub fn snap_range(
        &self,
        start: f64,
        duration: f64,
        points: &[SnapPoint],
        zoom: f64,
    ) -> RangeSnap {
        let left = self.find_snap(start, points, zoom);
        let right = self.find_snap(start + duration, points, zoom);
        let left_dist = left.map(|p| (p.time - start).abs());
        let right_dist = right.map(|p| (p.time - (start + duration)).abs());

        match (left, right) {
            (Some(l), Some(r)) => {
                if left_dist <= right_dist {
                    Self::snapped(l.time, l, SnappedEdge::Start)
                } else {
                    Self::snapped(r.time - duration, r, SnappedEdge::End)
                }
            }
            (Some(l), None) => Self::snapped(l.time, l, SnappedEdge::Start),
            (None, Some(r)) => Self::snapped(r.time - duration, r, SnappedEdge::End),
            (None, None) => RangeSnap {
                start,
                target: None,
                edge: None,
            },
        }
    }

    fn snapped(start: f64, target: SnapPoint, edge: SnappedEdge) -> RangeSnap {
        RangeSnap {
            start,
            target: Some(target),
            edge: Some(edge),
        }
    }

    /// Snap a single time (trim edges, cut positions).
    pub fn snap_time(&self, time: f64, points: &[SnapPoint], zoom: f64) -> (f64, Option<SnapPoint>) {
        match self.find_snap(time, points, zoom) {
            Some(sp) => (sp.time, Some(sp)),
            None => (time, None),
        }
    }
}

impl Default for SnappingEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
