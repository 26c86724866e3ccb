//! Keyframe animation system with Bézier easing.
//!
//! Supports easing via cubic Bézier curves with Newton-Raphson evaluation
//! for converting parameter t along the curve to the correct time mapping.
//! Keyframe times are clip-local seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ids::{EffectId, KeyframeId};
use crate::time::{TimeRange, TIME_EPSILON};

// ── Easing curves ───────────────────────────────────────────────

/// Cubic Bézier control points for easing (x1, y1, x2, y2).
/// The curve goes from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample_x(&self, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        3.0 * mt2 * t * self.x1 + 3.0 * mt * t2 * self.x2 + t3
    }

    fn sample_y(&self, t: f64) -> f64 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        3.0 * mt2 * t * self.y1 + 3.0 * mt * t2 * self.y2 + t3
    }

    fn sample_dx(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.x1 + 6.0 * mt * t * (self.x2 - self.x1) + 3.0 * t * t * (1.0 - self.x2)
    }

    /// Solve for the parameter t given an x value using Newton-Raphson.
    /// Returns the y value at that x.
    pub fn evaluate(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }

        let mut t = x;
        for _ in 0..8 {
            let x_est = self.sample_x(t) - x;
            let dx = self.sample_dx(t);
            if dx.abs() < 1e-12 {
                break;
            }
            t -= x_est / dx;
            t = t.clamp(0.0, 1.0);
            if x_est.abs() < 1e-10 {
                break;
            }
        }

        self.sample_y(t)
    }

    pub const LINEAR: Self = Self::new(0.0, 0.0, 1.0, 1.0);
    pub const EASE_IN: Self = Self::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: Self = Self::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: Self = Self::new(0.42, 0.0, 0.58, 1.0);
}

/// How to interpolate from a keyframe to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Keep the value until the next keyframe.
    Hold,
}

impl Easing {
    /// Map normalized progress `t` in `[0, 1]` through the easing curve.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => CubicBezier::EASE_IN.evaluate(t),
            Self::EaseOut => CubicBezier::EASE_OUT.evaluate(t),
            Self::EaseInOut => CubicBezier::EASE_IN_OUT.evaluate(t),
            Self::Hold => 0.0,
        }
    }
}

// ── Properties ──────────────────────────────────────────────────

/// A clip property that can carry keyframes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimatableProperty {
    PositionX,
    PositionY,
    ScaleX,
    ScaleY,
    Rotation,
    Opacity,
    Speed,
    EffectParam { effect_id: EffectId, param: String },
}

impl fmt::Display for AnimatableProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionX => write!(f, "position.x"),
            Self::PositionY => write!(f, "position.y"),
            Self::ScaleX => write!(f, "scale.x"),
            Self::ScaleY => write!(f, "scale.y"),
            Self::Rotation => write!(f, "rotation"),
            Self::Opacity => write!(f, "opacity"),
            Self::Speed => write!(f, "speed"),
            Self::EffectParam { effect_id, param } => write!(f, "effect.{effect_id}.{param}"),
        }
    }
}

// ── Keyframe ────────────────────────────────────────────────────

/// A single keyframe at a point in clip-local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub id: KeyframeId,
    /// Time of this keyframe relative to the clip start.
    pub time: f64,
    pub value: f64,
    /// Easing used when interpolating TO the next keyframe.
    pub easing: Easing,
}

impl Keyframe {
    pub fn new(time: f64, value: f64, easing: Easing) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            value,
            easing,
        }
    }
}

// ── Keyframe track ──────────────────────────────────────────────

/// All keyframes of one property of one clip.
///
/// Keyframes are kept sorted by time. Interpolation between keyframes
/// uses the easing of the earlier keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeTrack {
    pub property: AnimatableProperty,
    keyframes: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Create a new empty keyframe track.
    pub fn new(property: AnimatableProperty) -> Self {
        Self {
            property,
            keyframes: Vec::new(),
        }
    }

    /// Insert or update a keyframe. Maintains sorted order and returns the
    /// id of the keyframe that now holds the value.
    pub fn set(&mut self, time: f64, value: f64, easing: Easing) -> KeyframeId {
        if let Some(kf) = self
            .keyframes
            .iter_mut()
            .find(|kf| (kf.time - time).abs() < TIME_EPSILON)
        {
            kf.value = value;
            kf.easing = easing;
            return kf.id;
        }
        let kf = Keyframe::new(time, value, easing);
        let id = kf.id;
        self.insert(kf);
        id
    }

    /// Insert a fully formed keyframe, keeping sort order.
    pub fn insert(&mut self, keyframe: Keyframe) {
        let pos = self.keyframes.partition_point(|kf| kf.time <= keyframe.time);
        self.keyframes.insert(pos, keyframe);
    }

    /// Remove the keyframe with the given id.
    pub fn remove(&mut self, id: KeyframeId) -> bool {
        if let Some(pos) = self.keyframes.iter().position(|kf| kf.id == id) {
            self.keyframes.remove(pos);
            true
        } else {
            false
        }
    }

    /// Move a keyframe to a new time, re-sorting the track.
    pub fn retime(&mut self, id: KeyframeId, time: f64) -> bool {
        let Some(pos) = self.keyframes.iter().position(|kf| kf.id == id) else {
            return false;
        };
        let mut kf = self.keyframes.remove(pos);
        kf.time = time;
        self.insert(kf);
        true
    }

    /// Evaluate the track at a clip-local time. `None` when there are no keyframes.
    pub fn evaluate(&self, time: f64) -> Option<f64> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if self.keyframes.len() == 1 || time <= first.time {
            return Some(first.value);
        }
        if time >= last.time {
            return Some(last.value);
        }
        let idx = self
            .keyframes
            .partition_point(|kf| kf.time <= time)
            .saturating_sub(1);
        let a = &self.keyframes[idx];
        let b = &self.keyframes[idx + 1];
        Some(Self::interpolate(a, b, time))
    }

    /// Evaluate, falling back to `default` for an empty track.
    pub fn value_or(&self, time: f64, default: f64) -> f64 {
        self.evaluate(time).unwrap_or(default)
    }

    fn interpolate(a: &Keyframe, b: &Keyframe, time: f64) -> f64 {
        let span = b.time - a.time;
        if span <= 0.0 {
            return a.value;
        }
        let t = ((time - a.time) / span).clamp(0.0, 1.0);
        a.value + (b.value - a.value) * a.easing.apply(t)
    }

    /// Integrate the animated value over `[from, to]`.
    ///
    /// Used for speed ramps: the integral of the speed curve over clip-local
    /// time is the distance travelled in source time. An empty track
    /// integrates `default` as a constant. Reversed bounds give a negated
    /// result.
    pub fn integrate(&self, from: f64, to: f64, default: f64) -> f64 {
        if to < from {
            return -self.integrate(to, from, default);
        }
        if self.keyframes.is_empty() {
            return default * (to - from);
        }

        let mut total = 0.0;
        let mut cursor = from;
        let first = &self.keyframes[0];
        let last = &self.keyframes[self.keyframes.len() - 1];

        if cursor < first.time {
            let end = to.min(first.time);
            total += first.value * (end - cursor);
            cursor = end;
        }
        for pair in self.keyframes.windows(2) {
            if cursor >= to {
                break;
            }
            let (a, b) = (&pair[0], &pair[1]);
            if b.time <= cursor {
                continue;
            }
            let seg_start = cursor.max(a.time);
            let seg_end = to.min(b.time);
            if seg_end > seg_start {
                total += Self::integrate_segment(a, b, seg_start, seg_end);
            }
            cursor = seg_end;
        }
        if cursor < to {
            total += last.value * (to - cursor.max(last.time));
        }
        total
    }

    /// Composite Simpson's rule inside one keyframe interval.
    fn integrate_segment(a: &Keyframe, b: &Keyframe, from: f64, to: f64) -> f64 {
        const STEPS: usize = 16;
        if a.easing == Easing::Hold {
            return a.value * (to - from);
        }
        let h = (to - from) / STEPS as f64;
        let mut sum = Self::interpolate(a, b, from) + Self::interpolate(a, b, to);
        for i in 1..STEPS {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * Self::interpolate(a, b, from + h * i as f64);
        }
        sum * h / 3.0
    }

    /// Split the track at a clip-local time.
    ///
    /// The left part keeps keyframes before `at`, the right part keyframes at
    /// or after `at`, re-based so that `at` becomes time zero. Both halves
    /// receive a keyframe at the cut carrying the value there, so playback
    /// is continuous across the seam.
    pub fn split_at(&self, at: f64) -> (Self, Self) {
        let mut left = Self::new(self.property.clone());
        let mut right = Self::new(self.property.clone());

        for kf in &self.keyframes {
            if kf.time < at - TIME_EPSILON {
                left.keyframes.push(kf.clone());
            } else {
                let mut moved = kf.clone();
                moved.time -= at;
                right.keyframes.push(moved);
            }
        }

        if let Some(value) = self.evaluate(at) {
            let easing = self
                .keyframes
                .iter()
                .rev()
                .find(|kf| kf.time <= at)
                .map(|kf| kf.easing)
                .unwrap_or_default();
            left.set(at, value, easing);
            if right.keyframes.first().map_or(true, |kf| kf.time > TIME_EPSILON) {
                right.set(0.0, value, easing);
            }
        }
        (left, right)
    }

    /// Drop keyframes that fall outside `[0, duration]`.
    pub fn retain_within(&mut self, duration: f64) {
        self.keyframes
            .retain(|kf| kf.time >= -TIME_EPSILON && kf.time <= duration + TIME_EPSILON);
    }

    /// Shift every keyframe by `delta` seconds.
    pub fn shift(&mut self, delta: f64) {
        for kf in &mut self.keyframes {
            kf.time += delta;
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn find(&self, id: KeyframeId) -> Option<&Keyframe> {
        self.keyframes.iter().find(|kf| kf.id == id)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Whether this track is animated (has more than one keyframe).
    pub fn is_animated(&self) -> bool {
        self.keyframes.len() > 1
    }

    /// Get the time range spanned by keyframes.
    pub fn time_range(&self) -> Option<TimeRange> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        Some(TimeRange::from_start_end(first.time, last.time))
    }
}

impl fmt::Display for KeyframeTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyframeTrack({}, {} keyframes)",
            self.property,
            self.keyframes.len()
        )
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn track(points: &[(f64, f64)], easing: Easing) -> KeyframeTrack {
        let mut t = KeyframeTrack::new(AnimatableProperty::Opacity);
        for &(time, value) in points {
            t.set(time, value, easing);
        }
        t
    }

    #[test]
    fn test_linear_interpolation() {
        let t = track(&[(0.0, 0.0), (1.0, 1.0)], Easing::Linear);
        assert!((t.evaluate(0.0).unwrap() - 0.0).abs() < 0.001);
        assert!((t.evaluate(0.5).unwrap() - 0.5).abs() < 0.001);
        assert!((t.evaluate(1.0).unwrap() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_hold_interpolation() {
        let t = track(&[(0.0, 0.0), (1.0, 1.0)], Easing::Hold);
        assert!((t.evaluate(0.5).unwrap() - 0.0).abs() < 0.001);
        assert!((t.evaluate(1.0).unwrap() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let t = track(&[(0.0, 0.0), (1.0, 100.0)], Easing::EaseInOut);
        let mid = t.evaluate(0.5).unwrap();
        assert!((mid - 50.0).abs() < 5.0);
        assert!(t.evaluate(0.1).unwrap() < 10.0);
    }

    #[test]
    fn test_ease_in_starts_slow_ease_out_starts_fast() {
        let ease_in = track(&[(0.0, 0.0), (1.0, 1.0)], Easing::EaseIn);
        let ease_out = track(&[(0.0, 0.0), (1.0, 1.0)], Easing::EaseOut);
        assert!(ease_in.evaluate(0.25).unwrap() < 0.25);
        assert!(ease_out.evaluate(0.25).unwrap() > 0.25);
    }

    #[test]
    fn test_cubic_bezier_linear() {
        let bezier = CubicBezier::LINEAR;
        for i in 0..=10 {
            let x = i as f64 / 10.0;
            let y = bezier.evaluate(x);
            assert!((y - x).abs() < 0.001, "linear bezier at x={}: got y={}", x, y);
        }
    }

    #[test]
    fn test_keyframe_track_clamp_edges() {
        let t = track(&[(1.0, 10.0), (3.0, 30.0)], Easing::Linear);
        assert!((t.evaluate(0.0).unwrap() - 10.0).abs() < 0.001);
        assert!((t.evaluate(5.0).unwrap() - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_insert_out_of_order_stays_sorted() {
        let t = track(&[(2.0, 2.0), (0.0, 0.0), (1.0, 1.0)], Easing::Linear);
        let times: Vec<f64> = t.keyframes().iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_keyframe_overwrite_keeps_id() {
        let mut t = KeyframeTrack::new(AnimatableProperty::Rotation);
        let a = t.set(0.0, 0.0, Easing::Linear);
        let b = t.set(0.0, 5.0, Easing::Hold);
        assert_eq!(a, b);
        assert_eq!(t.len(), 1);
        assert!((t.evaluate(0.0).unwrap() - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_remove_and_retime() {
        let mut t = KeyframeTrack::new(AnimatableProperty::Opacity);
        let a = t.set(0.0, 0.0, Easing::Linear);
        let b = t.set(1.0, 1.0, Easing::Linear);
        assert!(t.retime(a, 2.0));
        assert_eq!(t.keyframes()[0].id, b);
        assert!(t.remove(b));
        assert!(!t.remove(b));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_empty_track() {
        let t = KeyframeTrack::new(AnimatableProperty::ScaleX);
        assert!(t.evaluate(1.0).is_none());
        assert_eq!(t.value_or(1.0, 1.0), 1.0);
        assert!((t.integrate(0.0, 2.0, 1.5) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_integrate_linear_ramp() {
        // Speed ramps from 1 to 3 over two seconds: area = 4.
        let t = track(&[(0.0, 1.0), (2.0, 3.0)], Easing::Linear);
        assert!((t.integrate(0.0, 2.0, 1.0) - 4.0).abs() < 1e-6);
        // Past the last keyframe the value is held.
        assert!((t.integrate(0.0, 3.0, 1.0) - 7.0).abs() < 1e-6);
        assert!((t.integrate(3.0, 0.0, 1.0) + 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_split_inserts_boundary_keys() {
        let t = track(&[(0.0, 0.0), (4.0, 4.0)], Easing::Linear);
        let (left, right) = t.split_at(1.0);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
        assert!((left.evaluate(1.0).unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(right.keyframes()[0].time, 0.0);
        assert!((right.evaluate(0.0).unwrap() - 1.0).abs() < 1e-9);
        assert!((right.evaluate(3.0).unwrap() - 4.0).abs() < 1e-9);
    }
}
