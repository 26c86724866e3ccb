//! Engine configuration.
//!
//! Every threshold the editing, evaluation and sync engines use lives here
//! so hosts can tune them. All fields have defaults; a partial JSON document
//! is enough to override a subset.

use serde::{Deserialize, Serialize};

use crate::error::{MontageError, Result};

/// Tunables shared by the edit, evaluation and sync engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether drags and trims snap to nearby targets.
    pub snap_enabled: bool,
    /// Snap distance in pixels (divided by zoom to get seconds).
    pub snap_threshold_px: f64,
    /// How far, in pixels, a drag must push into another clip before the
    /// overlap preview is allowed.
    pub forcing_overlap_px: f64,
    /// Shortest duration a trim may produce, in seconds.
    pub min_clip_duration: f64,
    /// Natural duration assumed for unbounded sources (image, text, solid).
    pub unbounded_duration: f64,
    /// Substitute cached proxy frames for live media when available.
    pub proxy_enabled: bool,
    /// Frame rate proxies were generated at.
    pub proxy_fps: f64,
    /// Media elements are only sought when they drift further than this.
    pub seek_epsilon: f64,
    /// Recursion limit for nested compositions.
    pub max_nesting_depth: usize,
    /// Height of one keyframe lane under an expanded track, in pixels.
    pub keyframe_lane_height: f64,
    /// Width of the trim handle at each clip edge, in pixels.
    pub trim_handle_px: f64,
    pub sync: SyncConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_threshold_px: 10.0,
            forcing_overlap_px: 100.0,
            min_clip_duration: 0.1,
            unbounded_duration: 86_400.0,
            proxy_enabled: false,
            proxy_fps: 30.0,
            seek_epsilon: 0.04,
            max_nesting_depth: 16,
            keyframe_lane_height: 18.0,
            trim_handle_px: 6.0,
            sync: SyncConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)
            .map_err(|e| MontageError::Serialization(format!("Invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_clip_duration > 0.0) {
            return Err(MontageError::InvalidParameter(
                "min_clip_duration must be positive".into(),
            ));
        }
        if !(self.proxy_fps > 0.0) {
            return Err(MontageError::InvalidParameter(
                "proxy_fps must be positive".into(),
            ));
        }
        if self.snap_threshold_px < 0.0 || self.forcing_overlap_px < 0.0 {
            return Err(MontageError::InvalidParameter(
                "pixel thresholds must not be negative".into(),
            ));
        }
        if !(self.sync.analysis_rate_hz > 0.0) {
            return Err(MontageError::InvalidParameter(
                "sync.analysis_rate_hz must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Multicam synchronization tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Envelope rate used for cross-correlation.
    pub analysis_rate_hz: f64,
    /// Shortest overlap, in seconds, a correlation lag must have to count.
    pub min_overlap_secs: f64,
    /// Largest offset searched in either direction; `None` searches all lags.
    pub max_offset_secs: Option<f64>,
    /// Offsets below this confidence are applied with a warning.
    pub low_confidence_threshold: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            analysis_rate_hz: 100.0,
            min_overlap_secs: 1.0,
            max_offset_secs: None,
            low_confidence_threshold: 0.3,
        }
    }
}
