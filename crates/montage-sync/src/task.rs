//! Audio sync running off the UI thread.

use std::sync::Arc;

use montage_core::SyncConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::audio::sync_clips_by_audio;
use crate::error::{Result, SyncError};
use crate::provider::WaveformProvider;
use crate::types::{CancelToken, SyncClip, SyncOutcome};

/// Handle to an audio sync running on the blocking pool.
///
/// The outcome is only offsets; applying it to the timeline is left to the
/// caller (`combine_multicam`) against whatever the composition is by then.
pub struct SyncTask {
    progress: watch::Receiver<u8>,
    cancel: CancelToken,
    handle: JoinHandle<Result<SyncOutcome>>,
}

impl SyncTask {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        master: SyncClip,
        targets: Vec<SyncClip>,
        waveforms: Arc<dyn WaveformProvider>,
        config: SyncConfig,
    ) -> Self {
        let (tx, progress) = watch::channel(0u8);
        let cancel = CancelToken::new();
        let token = cancel.clone();
        debug!(master = %master.clip_id, targets = targets.len(), "Spawning audio sync");
        let handle = tokio::task::spawn_blocking(move || {
            sync_clips_by_audio(
                &master,
                &targets,
                waveforms.as_ref(),
                &config,
                |p| {
                    let _ = tx.send(p);
                },
                &token,
            )
        });
        Self {
            progress,
            cancel,
            handle,
        }
    }

    /// Latest reported progress, 0-100.
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Receiver for awaiting progress changes.
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.progress.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<SyncOutcome> {
        self.handle
            .await
            .map_err(|e| SyncError::TaskFailed(e.to_string()))?
    }
}
