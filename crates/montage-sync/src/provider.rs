//! Waveform and transcript providers, keyed by media id.

use std::collections::HashMap;
use std::sync::Arc;

use montage_core::MediaId;
use parking_lot::RwLock;

use crate::transcript::Transcript;
use crate::waveform::Waveform;

pub trait WaveformProvider: Send + Sync {
    fn waveform(&self, media_id: MediaId) -> Option<Arc<Waveform>>;
}

pub trait TranscriptProvider: Send + Sync {
    fn transcript(&self, media_id: MediaId) -> Option<Arc<Transcript>>;
}

/// In-memory store for both kinds of analysis data.
#[derive(Debug, Default)]
pub struct MemoryAnalysisStore {
    waveforms: RwLock<HashMap<MediaId, Arc<Waveform>>>,
    transcripts: RwLock<HashMap<MediaId, Arc<Transcript>>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_waveform(&self, media_id: MediaId, waveform: Waveform) {
        self.waveforms.write().insert(media_id, Arc::new(waveform));
    }

    pub fn insert_transcript(&self, media_id: MediaId, transcript: Transcript) {
        self.transcripts.write().insert(media_id, Arc::new(transcript));
    }
}

impl WaveformProvider for MemoryAnalysisStore {
    fn waveform(&self, media_id: MediaId) -> Option<Arc<Waveform>> {
        self.waveforms.read().get(&media_id).cloned()
    }
}

impl TranscriptProvider for MemoryAnalysisStore {
    fn transcript(&self, media_id: MediaId) -> Option<Arc<Transcript>> {
        self.transcripts.read().get(&media_id).cloned()
    }
}
