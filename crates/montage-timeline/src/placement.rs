//! Placement math: overlap queries, nearest free slot, trim clamping.
//!
//! Pure functions over a `Composition`; the store and the edit gestures
//! both call into these so preview and commit agree.

use montage_core::{ClipId, TimeRange, TrackId, TIME_EPSILON};
use serde::{Deserialize, Serialize};

use crate::clip::Clip;
use crate::composition::Composition;

/// Which edge of a clip is being trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrimEdge {
    Left,
    Right,
}

/// First clip on `track_id` overlapping `range`, skipping `ignore`.
pub fn find_overlap(
    comp: &Composition,
    track_id: TrackId,
    range: TimeRange,
    ignore: &[ClipId],
) -> Option<ClipId> {
    comp.clips
        .iter()
        .filter(|c| c.track_id == track_id && !ignore.contains(&c.id))
        .find(|c| c.range().overlaps(range))
        .map(|c| c.id)
}

/// Closest start to `desired` at which a clip of `duration` fits on
/// `track_id` without overlapping anything (other than `ignore`), never
/// before zero.
pub fn nearest_free_start(
    comp: &Composition,
    track_id: TrackId,
    desired: f64,
    duration: f64,
    ignore: &[ClipId],
) -> f64 {
    let desired = desired.max(0.0);
    let fits = |start: f64| {
        start >= -TIME_EPSILON
            && find_overlap(comp, track_id, TimeRange::new(start, duration), ignore).is_none()
    };
    if fits(desired) {
        return desired;
    }

    let mut best: Option<f64> = None;
    for other in comp
        .clips
        .iter()
        .filter(|c| c.track_id == track_id && !ignore.contains(&c.id))
    {
        for candidate in [other.start_time - duration, other.end_time()] {
            if !fits(candidate) {
                continue;
            }
            let closer = best.map_or(true, |b| {
                (candidate - desired).abs() < (b - desired).abs()
            });
            if closer {
                best = Some(candidate);
            }
        }
    }
    // After the last clip there is always room.
    best.unwrap_or_else(|| {
        comp.clips
            .iter()
            .filter(|c| c.track_id == track_id && !ignore.contains(&c.id))
            .map(Clip::end_time)
            .fold(desired, f64::max)
    })
}

/// End of the previous clip and start of the next clip around `clip` on
/// its track, ignoring `ignore`.
pub fn neighbour_bounds(comp: &Composition, clip: &Clip, ignore: &[ClipId]) -> (f64, Option<f64>) {
    let mut prev_end = 0.0_f64;
    let mut next_start: Option<f64> = None;
    for other in comp
        .clips
        .iter()
        .filter(|c| c.track_id == clip.track_id && c.id != clip.id && !ignore.contains(&c.id))
    {
        if other.end_time() <= clip.start_time + TIME_EPSILON {
            prev_end = prev_end.max(other.end_time());
        } else if other.start_time >= clip.end_time() - TIME_EPSILON {
            next_start = Some(next_start.map_or(other.start_time, |n| n.min(other.start_time)));
        }
    }
    (prev_end, next_start)
}

/// Limits a trim is clamped against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimLimits {
    pub natural_duration: f64,
    pub min_duration: f64,
    pub prev_end: f64,
    pub next_start: Option<f64>,
}

/// Result of clamping a trim: the clip's new timing fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimPlan {
    pub start_time: f64,
    pub duration: f64,
    pub in_point: f64,
    pub out_point: f64,
    /// Timeline delta actually applied after clamping.
    pub applied_delta: f64,
}

impl TrimPlan {
    pub fn apply(&self, clip: &mut Clip) {
        clip.start_time = self.start_time;
        clip.duration = self.duration;
        clip.in_point = self.in_point;
        clip.out_point = self.out_point;
    }
}

/// Clamp a trim of `edge` by `delta` timeline seconds.
///
/// A positive delta moves the edge right. The left edge moves the start and
/// the leading source point together; the right edge moves the duration
/// and the trailing source point. Source deltas are scaled by `|speed|`.
/// For reversed playback the leading source point is `out_point`.
/// When the minimum duration is what limits the trim, the resulting
/// duration is exactly `min_duration`.
pub fn clamp_trim(clip: &Clip, edge: TrimEdge, delta: f64, limits: TrimLimits) -> TrimPlan {
    let rate = clip.speed.abs();
    let backwards = clip.plays_backwards();
    // Source slack before in_point and after out_point, in timeline seconds.
    let (head_room, tail_room) = if rate > TIME_EPSILON {
        (
            clip.in_point.max(0.0) / rate,
            (limits.natural_duration - clip.out_point).max(0.0) / rate,
        )
    } else {
        (f64::INFINITY, f64::INFINITY)
    };

    match edge {
        TrimEdge::Left => {
            // Extending to the left consumes the leading source slack.
            let leading_room = if backwards { tail_room } else { head_room };
            let lower = (-clip.start_time)
                .max(limits.prev_end - clip.start_time)
                .max(-leading_room)
                .min(0.0);
            let upper = (clip.duration - limits.min_duration).max(0.0);
            let applied = delta.clamp(lower, upper);
            let end = clip.end_time();
            let (start_time, duration) = if applied >= upper {
                (end - limits.min_duration, limits.min_duration)
            } else {
                (clip.start_time + applied, clip.duration - applied)
            };
            let source_delta = (clip.duration - duration) * rate;
            let (in_point, out_point) = if backwards {
                (clip.in_point, clip.out_point - source_delta)
            } else {
                (clip.in_point + source_delta, clip.out_point)
            };
            TrimPlan {
                start_time,
                duration,
                in_point,
                out_point,
                applied_delta: start_time - clip.start_time,
            }
        }
        TrimEdge::Right => {
            let trailing_room = if backwards { head_room } else { tail_room };
            let lower = (limits.min_duration - clip.duration).min(0.0);
            let mut upper = trailing_room;
            if let Some(next) = limits.next_start {
                upper = upper.min(next - clip.end_time());
            }
            let upper = upper.max(0.0);
            let applied = delta.clamp(lower, upper);
            let duration = if applied <= lower {
                limits.min_duration
            } else {
                clip.duration + applied
            };
            let source_delta = (duration - clip.duration) * rate;
            let (in_point, out_point) = if backwards {
                (clip.in_point - source_delta, clip.out_point)
            } else {
                (clip.in_point, clip.out_point + source_delta)
            };
            TrimPlan {
                start_time: clip.start_time,
                duration,
                in_point,
                out_point,
                applied_delta: duration - clip.duration,
            }
        }
    }
}
