//! Transcript sync: align clips by the words they share.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::provider::TranscriptProvider;
use crate::types::{CancelToken, SyncClip, SyncOffset, SyncOutcome, SyncWarning};

/// Matched anchors further than this from the median offset count against
/// consistency.
const CONSISTENCY_TOLERANCE_SECS: f64 = 0.5;

/// Full transcript of one media item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    /// Individual words with timestamps in source seconds.
    pub words: Vec<TranscriptWord>,
    /// Detected language code.
    pub language: String,
    /// Duration of the transcribed audio.
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptWord {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f32,
}

impl TranscriptWord {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
            confidence: 1.0,
        }
    }
}

impl Transcript {
    pub fn from_words(words: Vec<TranscriptWord>) -> Self {
        let duration_secs = words.iter().map(|w| w.end_time).fold(0.0, f64::max);
        Self {
            words,
            language: String::new(),
            duration_secs,
        }
    }

    /// Normalized tokens inside the clip's source window, with clip-local
    /// timeline start times.
    pub fn tokens_for(&self, clip: &SyncClip) -> Vec<Token> {
        let (start, end) = clip.source_window();
        self.words
            .iter()
            .filter(|w| w.start_time >= start && w.start_time < end)
            .filter_map(|w| {
                let text = normalize_word(&w.text);
                (!text.is_empty()).then(|| Token {
                    text,
                    local_time: clip.local_time(w.start_time),
                })
            })
            .collect()
    }
}

/// A normalized word and when it is spoken, in timeline seconds from the
/// clip's start.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub local_time: f64,
}

/// Lowercase and strip everything but letters and digits.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Index pairs of a longest common subsequence of `a` and `b`.
pub fn lcs_pairs(a: &[Token], b: &[Token]) -> Vec<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i].text == b[j].text {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(table[0] as usize);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i].text == b[j].text {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Offset and confidence from matched tokens, or `None` without matches.
pub fn align_tokens(master: &[Token], target: &[Token]) -> Option<SyncOffset> {
    let pairs = lcs_pairs(master, target);
    if pairs.is_empty() {
        return None;
    }
    let mut deltas: Vec<f64> = pairs
        .iter()
        .map(|&(i, j)| master[i].local_time - target[j].local_time)
        .collect();
    let offset = median(&mut deltas);

    let coverage = pairs.len() as f64 / master.len().min(target.len()) as f64;
    let consistent = deltas
        .iter()
        .filter(|d| (**d - offset).abs() <= CONSISTENCY_TOLERANCE_SECS)
        .count();
    let consistency = consistent as f64 / deltas.len() as f64;

    Some(SyncOffset::measured(
        offset * 1000.0,
        (coverage * consistency).clamp(0.0, 1.0),
    ))
}

/// A target clip and its transcript, if one exists.
#[derive(Debug, Clone)]
pub struct TranscriptTarget {
    pub clip: SyncClip,
    pub transcript: Option<Arc<Transcript>>,
}

impl TranscriptTarget {
    /// Pair each clip with its media's transcript from `provider`.
    pub fn resolve(clips: Vec<SyncClip>, provider: &dyn TranscriptProvider) -> Vec<Self> {
        clips
            .into_iter()
            .map(|clip| {
                let transcript = clip.media_id.and_then(|id| provider.transcript(id));
                Self { clip, transcript }
            })
            .collect()
    }
}

/// Align `targets` to `master` by transcript.
///
/// At least one target must have words in its trimmed range, otherwise
/// the call fails with `InsufficientInput`. Other targets without words,
/// or sharing none with the master, keep their current offset with a
/// `MissingData` warning.
pub fn sync_clips_by_transcript(
    master: &SyncClip,
    master_transcript: &Transcript,
    targets: &[TranscriptTarget],
    low_confidence_threshold: f64,
    mut on_progress: impl FnMut(u8),
    cancel: &CancelToken,
) -> Result<SyncOutcome> {
    on_progress(0);
    let master_tokens = master_transcript.tokens_for(master);
    if master_tokens.is_empty() {
        return Err(SyncError::MissingMasterData {
            clip_id: master.clip_id,
            what: "transcript words in the trimmed range".into(),
        });
    }

    let targets: Vec<_> = targets
        .iter()
        .filter(|t| t.clip.clip_id != master.clip_id)
        .map(|t| {
            let tokens = t
                .transcript
                .as_ref()
                .map(|transcript| transcript.tokens_for(&t.clip))
                .filter(|tokens| !tokens.is_empty());
            (t, tokens)
        })
        .collect();
    let eligible = 1 + targets.iter().filter(|(_, tokens)| tokens.is_some()).count();
    if eligible < 2 {
        return Err(SyncError::InsufficientInput(eligible));
    }

    let mut outcome = SyncOutcome::new(master.clip_id);
    let total = targets.len();
    for (done, (target, tokens)) in targets.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let aligned = tokens.map(|tokens| align_tokens(&master_tokens, &tokens));
        match aligned {
            None => outcome.keep_current(&target.clip, master, "no transcript words available"),
            Some(None) => outcome.keep_current(&target.clip, master, "no matching words"),
            Some(Some(offset)) => {
                debug!(
                    clip = %target.clip.clip_id,
                    offset_ms = offset.offset_ms,
                    confidence = offset.confidence,
                    "Aligned transcript"
                );
                outcome.offsets.insert(target.clip.clip_id, offset);
                if offset.confidence < low_confidence_threshold {
                    warn!(
                        clip = %target.clip.clip_id,
                        confidence = offset.confidence,
                        "Low sync confidence"
                    );
                    outcome.warnings.push(SyncWarning::LowConfidence {
                        clip_id: target.clip.clip_id,
                        confidence: offset.confidence,
                    });
                }
            }
        }
        on_progress((100 * (done + 1) / total) as u8);
    }

    info!(
        master = %master.clip_id,
        clips = outcome.offsets.len(),
        warnings = outcome.warnings.len(),
        "Transcript sync complete"
    );
    Ok(outcome)
}
