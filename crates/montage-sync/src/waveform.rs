//! Waveform peaks and the analysis envelopes derived from them.
//!
//! Providers hand out min/max pairs per waveform bin, the same data drawn
//! under audio clips. Sync reduces a window of it to a fixed-rate envelope.

use serde::{Deserialize, Serialize};

/// A min/max pair representing the amplitude range of one bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformSample {
    pub min: f32,
    pub max: f32,
}

impl WaveformSample {
    #[inline]
    pub fn peak(self) -> f32 {
        self.max.abs().max(self.min.abs())
    }
}

/// Pre-computed waveform data for one media item (mono).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waveform {
    /// Source samples per waveform bin (the reduction ratio).
    pub samples_per_bin: usize,
    /// Min/max pairs, one per bin.
    pub data: Vec<WaveformSample>,
    /// Source sample rate.
    pub sample_rate: u32,
}

impl Waveform {
    /// Compute a waveform from raw audio samples.
    ///
    /// `samples`: mono audio data (f32).
    /// `samples_per_bin`: how many source samples per output bin.
    pub fn compute(samples: &[f32], samples_per_bin: usize, sample_rate: u32) -> Self {
        if samples_per_bin == 0 || samples.is_empty() {
            return Self {
                samples_per_bin: samples_per_bin.max(1),
                data: Vec::new(),
                sample_rate,
            };
        }

        let data = samples
            .chunks(samples_per_bin)
            .map(|chunk| {
                chunk.iter().fold(
                    WaveformSample {
                        min: f32::MAX,
                        max: f32::MIN,
                    },
                    |acc, &s| WaveformSample {
                        min: acc.min.min(s),
                        max: acc.max.max(s),
                    },
                )
            })
            .collect();

        Self {
            samples_per_bin,
            data,
            sample_rate,
        }
    }

    /// Bins per second of source audio.
    pub fn bins_per_second(&self) -> f64 {
        if self.samples_per_bin == 0 {
            return 0.0;
        }
        self.sample_rate as f64 / self.samples_per_bin as f64
    }

    /// Get the RMS of bin peaks for a range of bins.
    pub fn rms_range(&self, start_bin: usize, end_bin: usize) -> f32 {
        let start = start_bin.min(self.data.len());
        let end = end_bin.min(self.data.len());
        if start >= end {
            return 0.0;
        }

        let sum: f64 = self.data[start..end]
            .iter()
            .map(|s| {
                let peak = s.peak() as f64;
                peak * peak
            })
            .sum();
        (sum / (end - start) as f64).sqrt() as f32
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.data.len() * self.samples_per_bin) as f64 / self.sample_rate as f64
    }

    /// Amplitude envelope of source window `[start, end)` seconds, sampled
    /// at `rate_hz`. Each envelope value is the RMS of the bin peaks it
    /// covers; when bins are coarser than the envelope the nearest bin is
    /// used.
    pub fn envelope(&self, start: f64, end: f64, rate_hz: f64) -> Vec<f32> {
        let bps = self.bins_per_second();
        let end = end.min(self.duration_seconds());
        if rate_hz <= 0.0 || bps <= 0.0 || end <= start {
            return Vec::new();
        }
        let count = ((end - start) * rate_hz).floor() as usize;
        (0..count)
            .map(|k| {
                let t0 = start + k as f64 / rate_hz;
                let t1 = t0 + 1.0 / rate_hz;
                // Nudge so 0.29 * 100 lands in bin 29, not 28.
                let b0 = (t0 * bps + 1e-6).floor().max(0.0) as usize;
                let b1 = ((t1 * bps + 1e-6).floor() as usize).max(b0 + 1);
                self.rms_range(b0, b1)
            })
            .collect()
    }
}

/// Shift to zero mean and scale to unit variance. A flat envelope comes
/// back all zeros.
pub fn normalize(envelope: &mut [f32]) {
    if envelope.is_empty() {
        return;
    }
    let n = envelope.len() as f64;
    let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = envelope
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    for v in envelope.iter_mut() {
        *v = if std > 1e-12 {
            ((*v as f64 - mean) / std) as f32
        } else {
            0.0
        };
    }
}
