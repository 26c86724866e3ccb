//! Fade handles. A fade is a pair of opacity keyframes at either end of a
//! clip, not a separate attribute.

use glam::DVec2;
use montage_core::{AnimatableProperty, ClipId, Easing, Rect, Result, TIME_EPSILON};
use montage_timeline::{Clip, TimelineStore};
use tracing::{debug, warn};

use crate::selection::GestureOutcome;
use crate::view::TimelineView;

/// Which corner handle is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeHandle {
    In,
    Out,
}

/// Length of the fade-in: the second key of a `(0, 0) → (t, level)` pair.
pub fn fade_in_duration(clip: &Clip) -> f64 {
    let Some(track) = clip.keyframe_track(&AnimatableProperty::Opacity) else {
        return 0.0;
    };
    match track.keyframes() {
        [first, second, ..] if first.time.abs() < TIME_EPSILON && first.value.abs() < TIME_EPSILON => {
            second.time
        }
        _ => 0.0,
    }
}

/// Length of the fade-out: the key before a final `(duration, 0)` key.
pub fn fade_out_duration(clip: &Clip) -> f64 {
    let Some(track) = clip.keyframe_track(&AnimatableProperty::Opacity) else {
        return 0.0;
    };
    match track.keyframes() {
        [.., before, last]
            if (last.time - clip.duration).abs() < TIME_EPSILON
                && last.value.abs() < TIME_EPSILON =>
        {
            clip.duration - before.time
        }
        _ => 0.0,
    }
}

pub fn current_fade(clip: &Clip, handle: FadeHandle) -> f64 {
    match handle {
        FadeHandle::In => fade_in_duration(clip),
        FadeHandle::Out => fade_out_duration(clip),
    }
}

fn remove_opacity_keys_at(clip: &mut Clip, times: &[f64]) {
    let ids: Vec<_> = clip
        .keyframe_track(&AnimatableProperty::Opacity)
        .map(|track| {
            track
                .keyframes()
                .iter()
                .filter(|kf| times.iter().any(|t| (kf.time - t).abs() < TIME_EPSILON))
                .map(|kf| kf.id)
                .collect()
        })
        .unwrap_or_default();
    for id in ids {
        clip.remove_keyframe(id);
    }
}

/// Rewrite the keyframe pair of one fade. `length` is clamped so the fades
/// never cross; zero removes the fade.
pub fn apply_fade(clip: &mut Clip, handle: FadeHandle, length: f64) -> f64 {
    let level = clip.transform.opacity;
    let (own, other) = match handle {
        FadeHandle::In => (fade_in_duration(clip), fade_out_duration(clip)),
        FadeHandle::Out => (fade_out_duration(clip), fade_in_duration(clip)),
    };
    let length = length.clamp(0.0, (clip.duration - other).max(0.0));

    if own > 0.0 {
        let (old, kept) = match handle {
            FadeHandle::In => ([0.0, own], clip.duration - other),
            FadeHandle::Out => ([clip.duration - own, clip.duration], other),
        };
        // A key shared with the opposite fade stays.
        let old: Vec<f64> = old
            .into_iter()
            .filter(|t| other <= 0.0 || (t - kept).abs() >= TIME_EPSILON)
            .collect();
        remove_opacity_keys_at(clip, &old);
    }
    if length <= TIME_EPSILON {
        return 0.0;
    }

    let opacity = AnimatableProperty::Opacity;
    match handle {
        FadeHandle::In => {
            clip.set_keyframe(&opacity, 0.0, 0.0, Easing::Linear);
            clip.set_keyframe(&opacity, length, level, Easing::Linear);
        }
        FadeHandle::Out => {
            let duration = clip.duration;
            clip.set_keyframe(&opacity, duration - length, level, Easing::Linear);
            clip.set_keyframe(&opacity, duration, 0.0, Easing::Linear);
        }
    }
    length
}

/// Opacity curve sampled across the clip for drawing, as
/// `(clip-local time, opacity)` pairs.
pub fn fade_curve(clip: &Clip, samples: usize) -> Vec<(f64, f64)> {
    let samples = samples.max(2);
    let step = clip.duration / (samples - 1) as f64;
    (0..samples)
        .map(|i| {
            let t = step * i as f64;
            let opacity =
                clip.property_value(&AnimatableProperty::Opacity, t, clip.transform.opacity);
            (t, opacity.clamp(0.0, 1.0))
        })
        .collect()
}

/// Pixel position of a fade handle on the top edge of `clip_rect`.
pub fn fade_handle_position(clip: &Clip, clip_rect: Rect, zoom: f64, handle: FadeHandle) -> DVec2 {
    match handle {
        FadeHandle::In => DVec2::new(clip_rect.left() + fade_in_duration(clip) * zoom, clip_rect.top()),
        FadeHandle::Out => {
            DVec2::new(clip_rect.right() - fade_out_duration(clip) * zoom, clip_rect.top())
        }
    }
}

/// The fade handle within `radius` pixels of `pos`, if any. The fade-in
/// handle wins when both are in reach.
pub fn hit_test_fade_handle(
    clip: &Clip,
    clip_rect: Rect,
    zoom: f64,
    pos: DVec2,
    radius: f64,
) -> Option<FadeHandle> {
    [FadeHandle::In, FadeHandle::Out]
        .into_iter()
        .find(|&h| fade_handle_position(clip, clip_rect, zoom, h).distance(pos) <= radius)
}

/// An in-progress fade handle drag.
#[derive(Debug, Clone)]
pub struct FadeGesture {
    clip_id: ClipId,
    handle: FadeHandle,
    original_length: f64,
    origin_time: f64,
    preview: Clip,
    length: f64,
}

impl FadeGesture {
    pub fn begin(
        store: &TimelineStore,
        view: &TimelineView,
        clip_id: ClipId,
        handle: FadeHandle,
        pointer_x: f64,
    ) -> Result<Self> {
        let clip = store.active().require_clip(clip_id)?.clone();
        let length = current_fade(&clip, handle);
        debug!(clip = %clip_id, ?handle, length, "Fade drag started");
        Ok(Self {
            clip_id,
            handle,
            original_length: length,
            origin_time: view.x_to_time(pointer_x),
            preview: clip,
            length,
        })
    }

    pub fn handle(&self) -> FadeHandle {
        self.handle
    }

    /// Current fade length in seconds.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The clip with the previewed fade applied.
    pub fn preview(&self) -> &Clip {
        &self.preview
    }

    pub fn update(&mut self, view: &TimelineView, pointer_x: f64) -> f64 {
        let delta = view.x_to_time(pointer_x) - self.origin_time;
        let requested = match self.handle {
            FadeHandle::In => self.original_length + delta,
            FadeHandle::Out => self.original_length - delta,
        };
        self.length = apply_fade(&mut self.preview, self.handle, requested);
        self.length
    }

    pub fn finish(self, store: &mut TimelineStore) -> GestureOutcome {
        if (self.length - self.original_length).abs() <= TIME_EPSILON {
            return GestureOutcome::Unchanged;
        }
        match store.update_clip(self.preview) {
            Ok(()) => GestureOutcome::Committed,
            Err(e) => {
                warn!(clip = %self.clip_id, error = %e, "Fade reverted");
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
