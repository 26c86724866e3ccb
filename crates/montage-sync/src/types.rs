//! Inputs and outputs shared by both sync strategies.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use montage_core::{ClipId, MediaId};
use montage_timeline::{Clip, Composition};
use serde::{Deserialize, Serialize};

/// What sync needs to know about a clip, captured when sync starts so the
/// analysis never reads the live composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncClip {
    pub clip_id: ClipId,
    pub media_id: Option<MediaId>,
    pub start_time: f64,
    pub in_point: f64,
    pub duration: f64,
    pub speed: f64,
    pub has_audio: bool,
}

impl SyncClip {
    pub fn from_clip(clip: &Clip) -> Self {
        Self {
            clip_id: clip.id,
            media_id: clip.source.media_id(),
            start_time: clip.start_time,
            in_point: clip.in_point,
            duration: clip.duration,
            speed: clip.speed,
            has_audio: clip.source.has_audio(),
        }
    }

    /// Capture clips from a composition, skipping unknown ids.
    pub fn capture(comp: &Composition, ids: &[ClipId]) -> Vec<Self> {
        ids.iter()
            .filter_map(|id| comp.clip(*id))
            .map(Self::from_clip)
            .collect()
    }

    /// Source seconds played per timeline second.
    pub fn playback_rate(&self) -> f64 {
        if self.speed.abs() > 0.0 {
            self.speed.abs()
        } else {
            1.0
        }
    }

    /// The part of the source the clip plays, `[in, in + duration × |speed|)`.
    pub fn source_window(&self) -> (f64, f64) {
        (self.in_point, self.in_point + self.duration * self.playback_rate())
    }

    /// Clip-local timeline seconds at which `source_time` plays.
    pub fn local_time(&self, source_time: f64) -> f64 {
        (source_time - self.in_point) / self.playback_rate()
    }

    /// Offset this clip currently has from `master` on the timeline.
    pub fn current_offset_ms(&self, master: &SyncClip) -> f64 {
        (self.start_time - master.start_time) * 1000.0
    }
}

/// Where a clip lands relative to the master.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncOffset {
    /// Master-local time, in ms, at which the clip's first frame plays.
    pub offset_ms: f64,
    /// `[0, 1]`; 0 for clips that kept their current offset.
    pub confidence: f64,
    /// False for "link without sync" entries, whose offset is only the one
    /// the clip had when sync started and is re-read when combining.
    pub synced: bool,
}

impl SyncOffset {
    pub fn measured(offset_ms: f64, confidence: f64) -> Self {
        Self {
            offset_ms,
            confidence,
            synced: true,
        }
    }
}

/// Non-fatal problems; the sync still produces offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncWarning {
    LowConfidence { clip_id: ClipId, confidence: f64 },
    /// The clip kept its current offset ("link without sync").
    MissingData { clip_id: ClipId, reason: String },
}

/// Offsets for the master (always 0) and every target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub master_clip_id: ClipId,
    pub offsets: BTreeMap<ClipId, SyncOffset>,
    pub warnings: Vec<SyncWarning>,
}

impl SyncOutcome {
    pub(crate) fn new(master_clip_id: ClipId) -> Self {
        let mut offsets = BTreeMap::new();
        offsets.insert(
            master_clip_id,
            SyncOffset::measured(0.0, 1.0),
        );
        Self {
            master_clip_id,
            offsets,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn keep_current(&mut self, target: &SyncClip, master: &SyncClip, reason: &str) {
        self.offsets.insert(
            target.clip_id,
            SyncOffset {
                offset_ms: target.current_offset_ms(master),
                confidence: 0.0,
                synced: false,
            },
        );
        self.warnings.push(SyncWarning::MissingData {
            clip_id: target.clip_id,
            reason: reason.to_string(),
        });
    }

    pub fn offset_ms(&self, clip_id: ClipId) -> Option<f64> {
        self.offsets.get(&clip_id).map(|o| o.offset_ms)
    }

    /// Offsets in the form `TimelineStore::create_linked_group` takes.
    pub fn offsets_ms(&self) -> BTreeMap<ClipId, f64> {
        self.offsets
            .iter()
            .map(|(id, o)| (*id, o.offset_ms))
            .collect()
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
