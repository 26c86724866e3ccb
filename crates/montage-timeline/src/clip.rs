//! Clip types for the timeline.

use std::collections::BTreeMap;

use montage_core::{
    AnimatableProperty, ClipId, CompositionId, Easing, EffectId, GroupId, KeyframeId,
    KeyframeTrack, MediaId, TimeRange, TrackId, Transform, TIME_EPSILON,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::track::TrackKind;

/// What a clip plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClipSource {
    Video {
        media_id: MediaId,
        natural_duration: f64,
        has_audio: bool,
    },
    Audio {
        media_id: MediaId,
        natural_duration: f64,
    },
    Image {
        media_id: MediaId,
    },
    Text {
        text: String,
    },
    Solid {
        color: [f32; 4],
    },
    Composition {
        composition_id: CompositionId,
    },
}

impl ClipSource {
    /// Natural duration of the source.
    ///
    /// Unbounded sources report `unbounded`; nested compositions report
    /// `None` because their length lives in another composition.
    pub fn natural_duration(&self, unbounded: f64) -> Option<f64> {
        match self {
            Self::Video {
                natural_duration, ..
            }
            | Self::Audio {
                natural_duration, ..
            } => Some(*natural_duration),
            Self::Image { .. } | Self::Text { .. } | Self::Solid { .. } => Some(unbounded),
            Self::Composition { .. } => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Text { .. } | Self::Solid { .. })
    }

    pub fn media_id(&self) -> Option<MediaId> {
        match self {
            Self::Video { media_id, .. } | Self::Audio { media_id, .. } | Self::Image { media_id } => {
                Some(*media_id)
            }
            _ => None,
        }
    }

    /// Whether the source carries an audio stream.
    pub fn has_audio(&self) -> bool {
        match self {
            Self::Video { has_audio, .. } => *has_audio,
            Self::Audio { .. } => true,
            _ => false,
        }
    }

    pub fn nested_composition(&self) -> Option<CompositionId> {
        match self {
            Self::Composition { composition_id } => Some(*composition_id),
            _ => None,
        }
    }

    /// The kind of track this source may be placed on.
    pub fn track_kind(&self) -> TrackKind {
        match self {
            Self::Audio { .. } => TrackKind::Audio,
            _ => TrackKind::Video,
        }
    }
}

/// An effect applied to a clip. Parameters may be animated through
/// `AnimatableProperty::EffectParam` keyframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub kind: String,
    pub enabled: bool,
    pub params: BTreeMap<String, f64>,
}

impl Effect {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            enabled: true,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}

/// Outgoing transition into the adjacent clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRef {
    pub kind: String,
    pub to_clip_id: ClipId,
    /// Timeline time where the two clips meet.
    pub junction: f64,
    pub duration: f64,
}

/// A clip on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub name: String,
    pub track_id: TrackId,
    /// Timeline position of the first frame, in seconds.
    pub start_time: f64,
    /// Timeline duration, always positive.
    pub duration: f64,
    /// Source-space trim bounds.
    pub in_point: f64,
    pub out_point: f64,
    pub source: ClipSource,
    pub transform: Transform,
    pub keyframes: Vec<KeyframeTrack>,
    pub effects: Vec<Effect>,
    pub reversed: bool,
    pub speed: f64,
    pub linked_clip_id: Option<ClipId>,
    pub linked_group_id: Option<GroupId>,
    pub parent_clip_id: Option<ClipId>,
    pub transition_out: Option<TransitionRef>,
}

impl Clip {
    /// Create a clip that plays its source from zero at normal speed.
    pub fn new(
        name: impl Into<String>,
        track_id: TrackId,
        source: ClipSource,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            track_id,
            start_time,
            duration,
            in_point: 0.0,
            out_point: duration,
            source,
            transform: Transform::default(),
            keyframes: Vec::new(),
            effects: Vec::new(),
            reversed: false,
            speed: 1.0,
            linked_clip_id: None,
            linked_group_id: None,
            parent_clip_id: None,
            transition_out: None,
        }
    }

    /// Timeline end time (exclusive).
    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    #[inline]
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.duration)
    }

    /// Whether the clip is on screen at timeline time `time` (half-open).
    #[inline]
    pub fn contains_time(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    /// Direction of playback through the source: `1.0` or `-1.0`.
    pub fn direction(&self) -> f64 {
        if self.reversed {
            -1.0
        } else {
            1.0
        }
    }

    /// Effective playback rate at the clip start, sign included.
    pub fn effective_speed(&self) -> f64 {
        self.speed * self.direction()
    }

    /// Whether source time runs backwards from the out point.
    pub fn plays_backwards(&self) -> bool {
        self.effective_speed() < 0.0
    }

    /// Source point shown at clip-local time zero.
    pub fn start_point(&self) -> f64 {
        if self.plays_backwards() {
            self.out_point
        } else {
            self.in_point
        }
    }

    /// Source distance travelled after `local` seconds of timeline time,
    /// sign included. Speed keyframes are integrated.
    pub fn source_offset(&self, local: f64) -> f64 {
        let travelled = match self.keyframe_track(&AnimatableProperty::Speed) {
            Some(track) if !track.is_empty() => track.integrate(0.0, local, self.speed),
            _ => self.speed * local,
        };
        travelled * self.direction()
    }

    /// Map clip-local time to source time, clamped to `[0, natural]`.
    pub fn source_time(&self, local: f64, natural: f64) -> f64 {
        (self.start_point() + self.source_offset(local)).clamp(0.0, natural.max(0.0))
    }

    /// Convert a timeline time into clip-local time.
    #[inline]
    pub fn local_time(&self, timeline_time: f64) -> f64 {
        timeline_time - self.start_time
    }

    // ── Keyframes ───────────────────────────────────────────────

    pub fn keyframe_track(&self, property: &AnimatableProperty) -> Option<&KeyframeTrack> {
        self.keyframes.iter().find(|t| &t.property == property)
    }

    /// Get the track for `property`, creating an empty one if needed.
    pub fn keyframe_track_mut(&mut self, property: &AnimatableProperty) -> &mut KeyframeTrack {
        let idx = match self.keyframes.iter().position(|t| &t.property == property) {
            Some(idx) => idx,
            None => {
                self.keyframes.push(KeyframeTrack::new(property.clone()));
                self.keyframes.len() - 1
            }
        };
        &mut self.keyframes[idx]
    }

    pub fn set_keyframe(
        &mut self,
        property: &AnimatableProperty,
        time: f64,
        value: f64,
        easing: Easing,
    ) -> KeyframeId {
        self.keyframe_track_mut(property).set(time, value, easing)
    }

    /// Remove a keyframe by id from whichever track holds it.
    pub fn remove_keyframe(&mut self, id: KeyframeId) -> bool {
        let removed = self.keyframes.iter_mut().any(|t| t.remove(id));
        self.keyframes.retain(|t| !t.is_empty());
        removed
    }

    /// Value of `property` at clip-local time, or `default` if not animated.
    pub fn property_value(&self, property: &AnimatableProperty, local: f64, default: f64) -> f64 {
        self.keyframe_track(property)
            .map_or(default, |t| t.value_or(local, default))
    }

    /// Absolute (timeline) times of every keyframe on this clip.
    pub fn keyframe_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.keyframes
            .iter()
            .flat_map(|t| t.keyframes().iter())
            .map(move |kf| self.start_time + kf.time)
    }

    /// Transform at clip-local time with keyframed properties applied.
    pub fn evaluate_transform(&self, local: f64) -> Transform {
        let base = self.transform;
        Transform {
            position: [
                self.property_value(&AnimatableProperty::PositionX, local, base.position[0]),
                self.property_value(&AnimatableProperty::PositionY, local, base.position[1]),
            ],
            scale: [
                self.property_value(&AnimatableProperty::ScaleX, local, base.scale[0]),
                self.property_value(&AnimatableProperty::ScaleY, local, base.scale[1]),
            ],
            rotation: self.property_value(&AnimatableProperty::Rotation, local, base.rotation),
            opacity: self
                .property_value(&AnimatableProperty::Opacity, local, base.opacity)
                .clamp(0.0, 1.0),
            blend_mode: base.blend_mode,
        }
    }

    /// Enabled effects with animated parameters resolved at clip-local time.
    pub fn evaluate_effects(&self, local: f64) -> Vec<Effect> {
        self.effects
            .iter()
            .filter(|e| e.enabled)
            .map(|effect| {
                let mut resolved = effect.clone();
                for (name, value) in resolved.params.iter_mut() {
                    let property = AnimatableProperty::EffectParam {
                        effect_id: effect.id,
                        param: name.clone(),
                    };
                    *value = self.property_value(&property, local, *value);
                }
                resolved
            })
            .collect()
    }

    /// Check the source-space trim bounds against a natural duration.
    pub fn source_bounds_valid(&self, natural: f64) -> bool {
        self.in_point >= -TIME_EPSILON
            && self.in_point < self.out_point
            && self.out_point <= natural + TIME_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_clip(start: f64, duration: f64) -> Clip {
        Clip::new(
            "clip",
            Uuid::new_v4(),
            ClipSource::Video {
                media_id: Uuid::new_v4(),
                natural_duration: 60.0,
                has_audio: true,
            },
            start,
            duration,
        )
    }

    #[test]
    fn test_half_open_contains() {
        let clip = video_clip(0.0, 5.0);
        assert!(clip.contains_time(4.999));
        assert!(!clip.contains_time(5.0));
    }

    #[test]
    fn test_source_time_forward_and_speed() {
        let mut clip = video_clip(10.0, 4.0);
        clip.in_point = 2.0;
        clip.out_point = 10.0;
        clip.speed = 2.0;
        assert!((clip.source_time(1.5, 60.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_time_reversed_walks_back_from_out() {
        let mut clip = video_clip(0.0, 4.0);
        clip.in_point = 1.0;
        clip.out_point = 5.0;
        clip.reversed = true;
        assert!((clip.source_time(0.0, 60.0) - 5.0).abs() < 1e-9);
        assert!((clip.source_time(3.0, 60.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_source_time_clamped_to_natural() {
        let mut clip = video_clip(0.0, 4.0);
        clip.in_point = 58.0;
        clip.out_point = 60.0;
        assert_eq!(clip.source_time(3.5, 60.0), 60.0);
    }

    #[test]
    fn test_speed_keyframes_are_integrated() {
        let mut clip = video_clip(0.0, 4.0);
        clip.set_keyframe(&AnimatableProperty::Speed, 0.0, 0.0, Easing::Linear);
        clip.set_keyframe(&AnimatableProperty::Speed, 4.0, 2.0, Easing::Linear);
        // Area under a 0→2 ramp over 4 s is 4.
        assert!((clip.source_time(4.0, 60.0) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_keyframed_transform() {
        let mut clip = video_clip(0.0, 4.0);
        clip.set_keyframe(&AnimatableProperty::Opacity, 0.0, 0.0, Easing::Linear);
        clip.set_keyframe(&AnimatableProperty::Opacity, 2.0, 1.0, Easing::Linear);
        let t = clip.evaluate_transform(1.0);
        assert!((t.opacity - 0.5).abs() < 1e-9);
        assert_eq!(t.scale, [1.0, 1.0]);
    }

    #[test]
    fn test_effect_param_animation() {
        let mut clip = video_clip(0.0, 4.0);
        let effect = Effect::new("blur").with_param("radius", 3.0);
        let property = AnimatableProperty::EffectParam {
            effect_id: effect.id,
            param: "radius".into(),
        };
        clip.effects.push(effect);
        clip.set_keyframe(&property, 0.0, 0.0, Easing::Linear);
        clip.set_keyframe(&property, 4.0, 8.0, Easing::Linear);
        let effects = clip.evaluate_effects(2.0);
        assert_eq!(effects[0].params["radius"], 4.0);
    }

    #[test]
    fn test_remove_keyframe_drops_empty_track() {
        let mut clip = video_clip(0.0, 4.0);
        let id = clip.set_keyframe(&AnimatableProperty::Rotation, 1.0, 45.0, Easing::Hold);
        assert!(clip.remove_keyframe(id));
        assert!(clip.keyframes.is_empty());
        assert!(!clip.remove_keyframe(id));
    }

    #[test]
    fn test_source_track_kind() {
        let audio = ClipSource::Audio {
            media_id: Uuid::new_v4(),
            natural_duration: 3.0,
        };
        assert_eq!(audio.track_kind(), TrackKind::Audio);
        assert!(audio.has_audio());
        let text = ClipSource::Text { text: "hi".into() };
        assert_eq!(text.track_kind(), TrackKind::Video);
        assert_eq!(text.natural_duration(86_400.0), Some(86_400.0));
    }
}
