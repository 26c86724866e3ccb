//! Layer records produced by evaluation and consumed by the compositor.

use std::sync::Arc;

use montage_core::{BlendMode, ClipId, CompositionId, MediaId, Transform, TrackId};
use montage_timeline::Effect;
use serde::Serialize;

/// A decoded proxy frame held by the proxy cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameHandle {
    pub media_id: MediaId,
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels.
    #[serde(skip)]
    pub data: Arc<[u8]>,
}

/// Where a layer's pixels come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSource {
    /// Live media element, positioned at `source_time`.
    Media { media_id: MediaId, source_time: f64 },
    /// Proxy frame. `frame` is `None` when the frame has been generated
    /// but is not resident yet.
    Proxy {
        media_id: MediaId,
        frame_index: u64,
        frame: Option<FrameHandle>,
    },
    Image { media_id: MediaId },
    Text { text: String },
    Solid { color: [f32; 4] },
    /// A nested composition, to be rendered offscreen and composited as
    /// one image.
    Nested {
        composition_id: CompositionId,
        layers: Vec<Layer>,
        width: u32,
        height: u32,
    },
}

/// One renderable layer. Lists are ordered bottom first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    /// Path of clip ids from the root composition down to this clip.
    pub id: String,
    pub clip_id: ClipId,
    pub track_id: TrackId,
    pub source: LayerSource,
    pub effects: Vec<Effect>,
    pub position: [f64; 2],
    pub scale: [f64; 2],
    pub rotation: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
}

impl Layer {
    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            scale: self.scale,
            rotation: self.rotation,
            opacity: self.opacity,
            blend_mode: self.blend_mode,
        }
    }

    /// Nested layers, if this layer is a nested composition.
    pub fn nested_layers(&self) -> Option<&[Layer]> {
        match &self.source {
            LayerSource::Nested { layers, .. } => Some(layers),
            _ => None,
        }
    }
}
