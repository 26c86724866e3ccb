//! Audio sync: cross-correlation of amplitude envelopes.

use montage_core::SyncConfig;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::provider::WaveformProvider;
use crate::types::{CancelToken, SyncClip, SyncOffset, SyncOutcome, SyncWarning};
use crate::waveform::normalize;

/// Best alignment of a target envelope against the master's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    /// Master-local seconds at which the target's first sample plays.
    pub lag_secs: f64,
    /// Pearson coefficient at the peak.
    pub coefficient: f64,
}

/// Pearson correlation of `master[j + lag]` against `target[j]` over
/// their overlap, or `None` when the overlap is shorter than `min_overlap`.
fn pearson_at(master: &[f32], target: &[f32], lag: i64, min_overlap: usize) -> Option<f64> {
    let j0 = (-lag).max(0) as usize;
    let j1 = (target.len() as i64).min(master.len() as i64 - lag);
    if j1 <= j0 as i64 {
        return None;
    }
    let j1 = j1 as usize;
    let n = j1 - j0;
    if n < min_overlap.max(2) {
        return None;
    }

    let (mut sm, mut st, mut smm, mut stt, mut smt) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for j in j0..j1 {
        let m = master[(j as i64 + lag) as usize] as f64;
        let t = target[j] as f64;
        sm += m;
        st += t;
        smm += m * m;
        stt += t * t;
        smt += m * t;
    }
    let n = n as f64;
    let cov = smt - sm * st / n;
    let vm = smm - sm * sm / n;
    let vt = stt - st * st / n;
    if vm <= 1e-12 || vt <= 1e-12 {
        return Some(0.0);
    }
    Some(cov / (vm * vt).sqrt())
}

/// Correlate over every admissible lag in parallel and refine the peak by
/// parabolic interpolation.
pub fn cross_correlate(
    master: &[f32],
    target: &[f32],
    rate_hz: f64,
    min_overlap_secs: f64,
    max_offset_secs: Option<f64>,
    cancel: &CancelToken,
) -> Option<Correlation> {
    if master.is_empty() || target.is_empty() || rate_hz <= 0.0 {
        return None;
    }
    let min_overlap = (min_overlap_secs * rate_hz).ceil().max(1.0) as usize;
    let mut lo = -(target.len() as i64) + 1;
    let mut hi = master.len() as i64 - 1;
    if let Some(max) = max_offset_secs {
        let bound = (max * rate_hz).ceil() as i64;
        lo = lo.max(-bound);
        hi = hi.min(bound);
    }
    if lo > hi {
        return None;
    }

    let scores: Vec<Option<f64>> = (lo..=hi)
        .into_par_iter()
        .map(|lag| {
            if cancel.is_cancelled() {
                None
            } else {
                pearson_at(master, target, lag, min_overlap)
            }
        })
        .collect();

    let (best_idx, best) = scores
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.map(|s| (i, s)))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let neighbour = |i: Option<usize>| i.and_then(|i| scores.get(i).copied().flatten());
    let refinement = match (neighbour(best_idx.checked_sub(1)), neighbour(Some(best_idx + 1))) {
        (Some(a), Some(c)) => {
            let denom = a - 2.0 * best + c;
            if denom.abs() > 1e-12 {
                (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    let lag = (lo + best_idx as i64) as f64 + refinement;
    Some(Correlation {
        lag_secs: lag / rate_hz,
        coefficient: best,
    })
}

/// Align `targets` to `master` by audio.
///
/// Targets without audio or without a waveform keep their current offset
/// with a `MissingData` warning. A weak correlation is still applied but
/// reported as `LowConfidence`.
pub fn sync_clips_by_audio(
    master: &SyncClip,
    targets: &[SyncClip],
    waveforms: &dyn WaveformProvider,
    config: &SyncConfig,
    mut on_progress: impl FnMut(u8),
    cancel: &CancelToken,
) -> Result<SyncOutcome> {
    on_progress(0);
    let master_waveform = master
        .media_id
        .filter(|_| master.has_audio)
        .and_then(|id| waveforms.waveform(id))
        .ok_or_else(|| SyncError::MissingMasterData {
            clip_id: master.clip_id,
            what: "audio waveform".into(),
        })?;

    let with_audio: Vec<_> = targets
        .iter()
        .filter(|t| t.clip_id != master.clip_id)
        .map(|t| {
            let waveform = t
                .media_id
                .filter(|_| t.has_audio)
                .and_then(|id| waveforms.waveform(id));
            (t, waveform)
        })
        .collect();
    let eligible = 1 + with_audio.iter().filter(|(_, w)| w.is_some()).count();
    if eligible < 2 {
        return Err(SyncError::InsufficientInput(eligible));
    }

    let (m0, m1) = master.source_window();
    // Envelopes are sampled per timeline second, so a clip played at another
    // speed is compared at the pace it is heard.
    let mut master_env =
        master_waveform.envelope(m0, m1, config.analysis_rate_hz / master.playback_rate());
    normalize(&mut master_env);
    on_progress(10);

    let mut outcome = SyncOutcome::new(master.clip_id);
    let total = with_audio.len();
    for (done, (target, waveform)) in with_audio.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        match waveform {
            None => {
                let reason = if target.has_audio {
                    "no waveform available"
                } else {
                    "clip has no audio"
                };
                outcome.keep_current(target, master, reason);
            }
            Some(waveform) => {
                let (t0, t1) = target.source_window();
                let mut target_env =
                    waveform.envelope(t0, t1, config.analysis_rate_hz / target.playback_rate());
                normalize(&mut target_env);
                let found = cross_correlate(
                    &master_env,
                    &target_env,
                    config.analysis_rate_hz,
                    config.min_overlap_secs,
                    config.max_offset_secs,
                    cancel,
                );
                if cancel.is_cancelled() {
                    return Err(SyncError::Cancelled);
                }
                match found {
                    Some(found) => {
                        let confidence = found.coefficient.clamp(0.0, 1.0);
                        debug!(
                            clip = %target.clip_id,
                            lag = found.lag_secs,
                            confidence,
                            "Correlated"
                        );
                        outcome.offsets.insert(
                            target.clip_id,
                            SyncOffset::measured(found.lag_secs * 1000.0, confidence),
                        );
                        if confidence < config.low_confidence_threshold {
                            warn!(clip = %target.clip_id, confidence, "Low sync confidence");
                            outcome.warnings.push(SyncWarning::LowConfidence {
                                clip_id: target.clip_id,
                                confidence,
                            });
                        }
                    }
                    None => outcome.keep_current(target, master, "audio too short to correlate"),
                }
            }
        }
        on_progress((10 + 90 * (done + 1) / total.max(1)) as u8);
    }

    info!(
        master = %master.clip_id,
        clips = outcome.offsets.len(),
        warnings = outcome.warnings.len(),
        "Audio sync complete"
    );
    on_progress(100);
    Ok(outcome)
}
