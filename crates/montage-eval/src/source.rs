//! Media and proxy providers.
//!
//! Evaluation only performs synchronous lookups through these traits. The
//! asynchronous fetch-and-cache path lives on `MemoryProxyCache::get_frame`
//! and is driven by the host, never by evaluation itself.

use std::collections::HashMap;
use std::sync::Arc;

use montage_core::{frame_index, MediaId};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{EvalError, Result};
use crate::layer::FrameHandle;

/// Live media elements that can be positioned.
pub trait MediaSource: Send + Sync {
    /// Natural duration of loaded media, `None` when it is not loaded.
    fn resolve(&self, media_id: MediaId) -> Option<f64>;

    /// Current playback position of the element.
    fn current_time(&self, media_id: MediaId) -> Option<f64>;

    /// Move the element to `time`. Repeating a seek is harmless.
    fn seek(&self, media_id: MediaId, time: f64) -> Result<()>;
}

/// Cache of pre-rendered proxy frames.
pub trait ProxyCache: Send + Sync {
    fn cached_frame(&self, media_id: MediaId, frame_index: u64) -> Option<FrameHandle>;

    /// Highest frame index generated for `media_id`, resident or not.
    fn generated_up_to(&self, media_id: MediaId) -> Option<u64>;

    /// Ask for a generated frame to be brought back into memory.
    fn request_warm_up(&self, media_id: MediaId, frame_index: u64);
}

#[derive(Debug, Clone)]
struct MediaEntry {
    natural_duration: f64,
    position: f64,
    seeks: u64,
    broken: bool,
}

/// In-memory media library.
#[derive(Debug, Default)]
pub struct MemoryMediaLibrary {
    entries: RwLock<HashMap<MediaId, MediaEntry>>,
}

impl MemoryMediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register loaded media, positioned at zero.
    pub fn insert(&self, media_id: MediaId, natural_duration: f64) {
        self.entries.write().insert(
            media_id,
            MediaEntry {
                natural_duration,
                position: 0.0,
                seeks: 0,
                broken: false,
            },
        );
    }

    pub fn remove(&self, media_id: MediaId) {
        self.entries.write().remove(&media_id);
    }

    /// Make every further seek on `media_id` fail.
    pub fn mark_broken(&self, media_id: MediaId) {
        if let Some(entry) = self.entries.write().get_mut(&media_id) {
            entry.broken = true;
        }
    }

    /// Number of seeks performed on `media_id`.
    pub fn seek_count(&self, media_id: MediaId) -> u64 {
        self.entries.read().get(&media_id).map_or(0, |e| e.seeks)
    }
}

impl MediaSource for MemoryMediaLibrary {
    fn resolve(&self, media_id: MediaId) -> Option<f64> {
        self.entries.read().get(&media_id).map(|e| e.natural_duration)
    }

    fn current_time(&self, media_id: MediaId) -> Option<f64> {
        self.entries.read().get(&media_id).map(|e| e.position)
    }

    fn seek(&self, media_id: MediaId, time: f64) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&media_id).ok_or_else(|| EvalError::Media {
            media_id,
            reason: "not loaded".into(),
        })?;
        if entry.broken {
            return Err(EvalError::Media {
                media_id,
                reason: "seek failed".into(),
            });
        }
        entry.position = time.clamp(0.0, entry.natural_duration);
        entry.seeks += 1;
        Ok(())
    }
}

/// Produces a proxy frame on demand.
pub type FrameLoader = Arc<dyn Fn(MediaId, u64) -> Option<FrameHandle> + Send + Sync>;

/// In-memory proxy cache with an optional loader for misses.
#[derive(Default)]
pub struct MemoryProxyCache {
    frames: RwLock<HashMap<(MediaId, u64), FrameHandle>>,
    generated: RwLock<HashMap<MediaId, u64>>,
    warm_requests: Mutex<Vec<(MediaId, u64)>>,
    loader: Option<FrameLoader>,
}

impl std::fmt::Debug for MemoryProxyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProxyCache")
            .field("frames", &self.frames.read().len())
            .field("has_loader", &self.loader.is_some())
            .finish()
    }
}

impl MemoryProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: FrameLoader) -> Self {
        Self {
            loader: Some(loader),
            ..Self::default()
        }
    }

    /// Store a resident frame.
    pub fn insert_frame(&self, frame: FrameHandle) {
        self.mark_generated(frame.media_id, frame.frame_index);
        self.frames
            .write()
            .insert((frame.media_id, frame.frame_index), frame);
    }

    /// Record that frames up to `frame_index` exist for `media_id`.
    pub fn mark_generated(&self, media_id: MediaId, frame_index: u64) {
        let mut generated = self.generated.write();
        let entry = generated.entry(media_id).or_insert(frame_index);
        *entry = (*entry).max(frame_index);
    }

    /// Drop resident frames, keeping the generated-up-to bookkeeping.
    pub fn evict(&self, media_id: MediaId) {
        self.frames.write().retain(|(id, _), _| *id != media_id);
    }

    /// Drain the warm-up requests made since the last call.
    pub fn take_warm_requests(&self) -> Vec<(MediaId, u64)> {
        std::mem::take(&mut *self.warm_requests.lock())
    }

    /// Fetch the frame at `time`, running the loader off the async runtime
    /// on a miss and caching its result.
    pub async fn get_frame(&self, media_id: MediaId, time: f64, fps: f64) -> Option<FrameHandle> {
        let index = frame_index(time, fps);
        if let Some(frame) = self.cached_frame(media_id, index) {
            return Some(frame);
        }
        let loader = self.loader.clone()?;
        let loaded = tokio::task::spawn_blocking(move || loader(media_id, index)).await;
        match loaded {
            Ok(Some(frame)) => {
                debug!(%media_id, index, "Proxy frame loaded");
                self.insert_frame(frame.clone());
                Some(frame)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%media_id, index, error = %e, "Proxy loader task failed");
                None
            }
        }
    }
}

impl ProxyCache for MemoryProxyCache {
    fn cached_frame(&self, media_id: MediaId, frame_index: u64) -> Option<FrameHandle> {
        self.frames.read().get(&(media_id, frame_index)).cloned()
    }

    fn generated_up_to(&self, media_id: MediaId) -> Option<u64> {
        self.generated.read().get(&media_id).copied()
    }

    fn request_warm_up(&self, media_id: MediaId, frame_index: u64) {
        let mut requests = self.warm_requests.lock();
        if !requests.contains(&(media_id, frame_index)) {
            requests.push((media_id, frame_index));
        }
    }
}
