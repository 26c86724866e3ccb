//! Core evaluation: `(composition, time)` to an ordered list of layers.
//!
//! The evaluation process:
//! 1. Resolve the composition (active or stored) by id.
//! 2. Walk the visible video tracks from the bottom of the stack to the top.
//! 3. Pick the clip covering `time` on each track (half-open ranges).
//! 4. Recurse into nested compositions, producing one synthetic layer.
//! 5. Map to source time and pick a proxy frame or the live media element.
//! 6. Evaluate keyframed transform and effects, composed with the parent chain.
//!
//! A failure while evaluating one clip is logged and that layer is left out;
//! it never aborts the rest of the frame.

use std::collections::HashMap;

use montage_core::{frame_index, ClipId, CompositionId, EngineConfig, MediaId, TrackId, Transform};
use montage_timeline::{Clip, ClipSource, Composition, TimelineStore};
use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::error::{EvalError, Result};
use crate::layer::{Layer, LayerSource};
use crate::nested::{evaluate_nested, EvalContext};
use crate::source::{MediaSource, ProxyCache};

/// Looks up compositions by id, whether live or frozen.
pub trait CompositionResolver {
    fn resolve_composition(&self, id: CompositionId) -> Option<&Composition>;
}

impl CompositionResolver for TimelineStore {
    fn resolve_composition(&self, id: CompositionId) -> Option<&Composition> {
        self.composition(id)
    }
}

impl CompositionResolver for Composition {
    fn resolve_composition(&self, id: CompositionId) -> Option<&Composition> {
        (self.id == id).then_some(self)
    }
}

impl CompositionResolver for Vec<Composition> {
    fn resolve_composition(&self, id: CompositionId) -> Option<&Composition> {
        self.iter().find(|c| c.id == id)
    }
}

impl CompositionResolver for HashMap<CompositionId, Composition> {
    fn resolve_composition(&self, id: CompositionId) -> Option<&Composition> {
        self.get(&id)
    }
}

/// Read-only view over everything evaluation needs. Holds no scratch
/// state, so one evaluator can serve playback ticks and on-demand calls.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    compositions: &'a dyn CompositionResolver,
    media: &'a dyn MediaSource,
    proxies: &'a dyn ProxyCache,
    config: &'a EngineConfig,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        compositions: &'a dyn CompositionResolver,
        media: &'a dyn MediaSource,
        proxies: &'a dyn ProxyCache,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            compositions,
            media,
            proxies,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub(crate) fn resolve(&self, id: CompositionId) -> Option<&'a Composition> {
        self.compositions.resolve_composition(id)
    }

    /// Evaluate a composition at `time`, bottom layer first.
    ///
    /// Only an unknown composition is an error; an empty list means there
    /// is nothing to draw.
    pub fn evaluate_at_time(&self, composition_id: CompositionId, time: f64) -> Result<Vec<Layer>> {
        let comp = self
            .resolve(composition_id)
            .ok_or(EvalError::CompositionNotFound(composition_id))?;
        let layers = self.evaluate_composition(comp, time, &EvalContext::root(composition_id));
        trace!(composition = %composition_id, time, layers = layers.len(), "Evaluated");
        Ok(layers)
    }

    pub(crate) fn evaluate_composition(
        &self,
        comp: &Composition,
        time: f64,
        ctx: &EvalContext,
    ) -> Vec<Layer> {
        let mut layers = Vec::with_capacity(comp.tracks.len());
        // The first track is the top of the stack.
        for track in comp.tracks.iter().rev() {
            if !track.is_video() || comp.is_track_hidden(track) {
                continue;
            }
            let Some(clip) = comp.clip_at(track.id, time) else {
                continue;
            };
            match self.evaluate_clip(comp, clip, time, ctx) {
                Ok(layer) => layers.push(layer),
                Err(e) => warn!(clip = %clip.id, time, error = %e, "Skipping layer"),
            }
        }
        layers
    }

    fn evaluate_clip(
        &self,
        comp: &Composition,
        clip: &Clip,
        time: f64,
        ctx: &EvalContext,
    ) -> Result<Layer> {
        let local = clip.local_time(time);
        let source = match &clip.source {
            ClipSource::Composition { composition_id } => {
                evaluate_nested(self, clip, *composition_id, local, ctx)?
            }
            ClipSource::Video {
                media_id,
                natural_duration,
                ..
            } => self.resolve_video(*media_id, clip.source_time(local, *natural_duration))?,
            ClipSource::Image { media_id } => {
                self.media.resolve(*media_id).ok_or_else(|| EvalError::Media {
                    media_id: *media_id,
                    reason: "not loaded".into(),
                })?;
                LayerSource::Image {
                    media_id: *media_id,
                }
            }
            ClipSource::Text { text } => LayerSource::Text { text: text.clone() },
            ClipSource::Solid { color } => LayerSource::Solid { color: *color },
            ClipSource::Audio { media_id, .. } => {
                return Err(EvalError::Media {
                    media_id: *media_id,
                    reason: "audio source has no picture".into(),
                })
            }
        };

        let transform = effective_transform(comp, clip, time);
        Ok(Layer {
            id: ctx.layer_id(clip.id),
            clip_id: clip.id,
            track_id: clip.track_id,
            source,
            effects: clip.evaluate_effects(local),
            position: transform.position,
            scale: transform.scale,
            rotation: transform.rotation,
            opacity: transform.opacity,
            blend_mode: transform.blend_mode,
        })
    }

    /// Prefer a proxy frame; otherwise position the live element, seeking
    /// only when it has drifted past `seek_epsilon`.
    fn resolve_video(&self, media_id: MediaId, source_time: f64) -> Result<LayerSource> {
        if self.config.proxy_enabled {
            let index = frame_index(source_time, self.config.proxy_fps);
            if let Some(frame) = self.proxies.cached_frame(media_id, index) {
                return Ok(LayerSource::Proxy {
                    media_id,
                    frame_index: index,
                    frame: Some(frame),
                });
            }
            if self
                .proxies
                .generated_up_to(media_id)
                .is_some_and(|generated| generated >= index)
            {
                self.proxies.request_warm_up(media_id, index);
                return Ok(LayerSource::Proxy {
                    media_id,
                    frame_index: index,
                    frame: None,
                });
            }
        }

        let current = self
            .media
            .current_time(media_id)
            .ok_or_else(|| EvalError::Media {
                media_id,
                reason: "not loaded".into(),
            })?;
        if (current - source_time).abs() > self.config.seek_epsilon {
            self.media.seek(media_id, source_time)?;
        }
        Ok(LayerSource::Media {
            media_id,
            source_time,
        })
    }
}

/// The clip's keyframed transform composed with every ancestor's, each
/// evaluated at its own local time. Nothing is modified.
///
/// Parent clips apply first, then the clip playing at `time` on each
/// ancestor of the clip's track. A parent track with nothing under the
/// playhead contributes nothing.
pub fn effective_transform(comp: &Composition, clip: &Clip, time: f64) -> Transform {
    let mut transform = clip.evaluate_transform(clip.local_time(time));
    let mut seen: SmallVec<[ClipId; 8]> = SmallVec::new();
    seen.push(clip.id);
    let mut cursor = clip.parent_clip_id;
    while let Some(parent_id) = cursor {
        if seen.contains(&parent_id) {
            break;
        }
        let Some(parent) = comp.clip(parent_id) else {
            break;
        };
        transform = parent
            .evaluate_transform(parent.local_time(time))
            .parent_of(&transform);
        seen.push(parent_id);
        cursor = parent.parent_clip_id;
    }

    let mut seen_tracks: SmallVec<[TrackId; 8]> = SmallVec::new();
    seen_tracks.push(clip.track_id);
    let mut track_cursor = comp.track(clip.track_id).and_then(|t| t.parent_track_id);
    while let Some(track_id) = track_cursor {
        if seen_tracks.contains(&track_id) {
            break;
        }
        let Some(track) = comp.track(track_id) else {
            break;
        };
        if let Some(holder) = comp.clip_at(track_id, time) {
            transform = holder
                .evaluate_transform(holder.local_time(time))
                .parent_of(&transform);
        }
        seen_tracks.push(track_id);
        track_cursor = track.parent_track_id;
    }
    transform
}
