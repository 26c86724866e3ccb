//! Multicam synchronization.
//!
//! Two strategies compute per-clip offsets relative to a master clip:
//! audio envelope cross-correlation and transcript word alignment. The
//! outcome is plain data; `combine_multicam` applies it to the timeline.

pub mod audio;
pub mod combine;
pub mod error;
pub mod provider;
pub mod task;
pub mod transcript;
pub mod types;
pub mod waveform;

pub use audio::{cross_correlate, sync_clips_by_audio, Correlation};
pub use combine::combine_multicam;
pub use error::{Result, SyncError};
pub use provider::{MemoryAnalysisStore, TranscriptProvider, WaveformProvider};
pub use task::SyncTask;
pub use transcript::{sync_clips_by_transcript, Transcript, TranscriptTarget, TranscriptWord};
pub use types::{CancelToken, SyncClip, SyncOffset, SyncOutcome, SyncWarning};
pub use waveform::{Waveform, WaveformSample};
