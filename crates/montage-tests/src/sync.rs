//! Integration tests for multicam sync, from captured clips to the linked
//! group on the timeline.

use std::sync::Arc;

use montage_core::{ClipId, MediaId, SyncConfig, TrackId};
use montage_sync::{
    combine_multicam, sync_clips_by_audio, sync_clips_by_transcript, CancelToken,
    MemoryAnalysisStore, SyncClip, SyncError, SyncTask, SyncWarning, Transcript,
    TranscriptTarget, TranscriptWord, Waveform,
};
use montage_timeline::{Clip, ClipSource, TimelineStore, Track};
use uuid::Uuid;

// ── Synthetic recordings ───────────────────────────────────────

const SAMPLE_RATE: u32 = 8000;
/// 100 waveform bins per second.
const SAMPLES_PER_BIN: usize = 80;
/// Loudness changes every 50 ms.
const SEGMENT: u64 = 400;

fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// The shared scene, sample `i` from its beginning.
fn scene(i: u64) -> f32 {
    let loudness = 0.05 + 0.95 * (splitmix(i / SEGMENT) >> 40) as f32 / (1u64 << 24) as f32;
    if i % 2 == 0 {
        loudness
    } else {
        -loudness
    }
}

/// A recording of the scene that started `late_by` seconds after it.
fn recording(late_by: f64, seconds: f64) -> Waveform {
    let skip = (late_by * SAMPLE_RATE as f64) as u64;
    let samples: Vec<f32> = (0..(seconds * SAMPLE_RATE as f64) as u64)
        .map(|i| scene(i + skip))
        .collect();
    Waveform::compute(&samples, SAMPLES_PER_BIN, SAMPLE_RATE)
}

// ── Timeline fixture ───────────────────────────────────────────

struct Shoot {
    store: TimelineStore,
    analysis: MemoryAnalysisStore,
    a: ClipId,
    b: ClipId,
    c: ClipId,
}

fn camera(media_id: MediaId, has_audio: bool) -> ClipSource {
    ClipSource::Video {
        media_id,
        natural_duration: 30.0,
        has_audio,
    }
}

fn add(store: &mut TimelineStore, track: TrackId, source: ClipSource, start: f64, dur: f64) -> ClipId {
    store
        .add_clip(Clip::new("cam", track, source, start, dur))
        .unwrap()
}

/// Camera A (master) at 1 s, camera B started 2 s after A but placed at
/// 10 s, camera C without audio at 4 s.
fn shoot() -> Shoot {
    let mut store = TimelineStore::default();
    store.add_track(Track::new_video("V2")).unwrap();
    store.add_track(Track::new_video("V3")).unwrap();
    let tracks: Vec<TrackId> = store.active().tracks.iter().map(|t| t.id).collect();
    let (ma, mb, mc) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let analysis = MemoryAnalysisStore::new();
    analysis.insert_waveform(ma, recording(0.0, 30.0));
    analysis.insert_waveform(mb, recording(2.0, 25.0));

    let a = add(&mut store, tracks[0], camera(ma, true), 1.0, 28.0);
    let b = add(&mut store, tracks[2], camera(mb, true), 10.0, 20.0);
    let c = add(&mut store, tracks[3], camera(mc, false), 4.0, 20.0);
    Shoot {
        store,
        analysis,
        a,
        b,
        c,
    }
}

fn capture(shoot: &Shoot) -> (SyncClip, Vec<SyncClip>) {
    let mut clips = SyncClip::capture(shoot.store.active(), &[shoot.a, shoot.b, shoot.c]);
    let master = clips.remove(0);
    (master, clips)
}

// ── Audio sync ─────────────────────────────────────────────────

#[test]
fn audio_sync_round_trip() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let a1 = store.active().tracks[1].id;
    let (ma, mb) = (Uuid::new_v4(), Uuid::new_v4());
    let master = add(&mut store, v1, camera(ma, true), 0.0, 30.0);
    let target = add(
        &mut store,
        a1,
        ClipSource::Audio {
            media_id: mb,
            natural_duration: 20.0,
        },
        0.0,
        20.0,
    );
    let analysis = MemoryAnalysisStore::new();
    analysis.insert_waveform(ma, recording(0.0, 30.0));
    analysis.insert_waveform(mb, recording(1.5, 20.0));

    let clips = SyncClip::capture(store.active(), &[master, target]);
    let mut progress = Vec::new();
    let outcome = sync_clips_by_audio(
        &clips[0],
        &clips[1..],
        &analysis,
        &SyncConfig::default(),
        |p| progress.push(p),
        &CancelToken::new(),
    )
    .unwrap();

    let offset = outcome.offsets[&target];
    assert!((offset.offset_ms - 1500.0).abs() <= 50.0, "{}", offset.offset_ms);
    assert!(offset.confidence > 0.3);
    assert_eq!(outcome.offset_ms(master), Some(0.0));
    assert!(outcome.warnings.is_empty());
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn master_without_audio_is_rejected() {
    let shoot = shoot();
    let clips = SyncClip::capture(shoot.store.active(), &[shoot.c, shoot.a]);
    let result = sync_clips_by_audio(
        &clips[0],
        &clips[1..],
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(SyncError::MissingMasterData { .. })));
}

#[test]
fn lone_master_is_insufficient() {
    let shoot = shoot();
    let clips = SyncClip::capture(shoot.store.active(), &[shoot.a, shoot.c]);
    let result = sync_clips_by_audio(
        &clips[0],
        &clips[1..],
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(SyncError::InsufficientInput(1))));
}

#[test]
fn cancelled_sync_writes_nothing() {
    let shoot = shoot();
    let (master, targets) = capture(&shoot);
    let cancel = CancelToken::new();
    cancel.cancel();
    let revision = shoot.store.revision();
    let result = sync_clips_by_audio(
        &master,
        &targets,
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &cancel,
    );
    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(shoot.store.revision(), revision);
}

// ── End to end ─────────────────────────────────────────────────

#[test]
fn multicam_scenario() {
    let mut shoot = shoot();
    let (master, targets) = capture(&shoot);
    let outcome = sync_clips_by_audio(
        &master,
        &targets,
        &shoot.analysis,
        &shoot.store.config().sync,
        |_| {},
        &CancelToken::new(),
    )
    .unwrap();

    let b_offset = outcome.offset_ms(shoot.b).unwrap();
    assert!((b_offset - 2000.0).abs() <= 50.0, "{b_offset}");
    assert!((outcome.offset_ms(shoot.c).unwrap() - 3000.0).abs() < 1e-9);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| matches!(w, SyncWarning::MissingData { clip_id, .. } if *clip_id == shoot.c)));

    let revision = shoot.store.revision();
    let group = combine_multicam(&mut shoot.store, &outcome).unwrap();
    assert_eq!(shoot.store.revision(), revision + 1);

    let comp = shoot.store.active();
    let (a, b, c) = (
        comp.clip(shoot.a).unwrap(),
        comp.clip(shoot.b).unwrap(),
        comp.clip(shoot.c).unwrap(),
    );
    assert!((a.start_time - 1.0).abs() < 1e-9);
    assert!((b.start_time - (1.0 + b_offset / 1000.0)).abs() < 1e-9);
    assert!((c.start_time - 4.0).abs() < 1e-9);
    for clip in [a, b, c] {
        assert_eq!(clip.linked_group_id, Some(group));
    }
    let linked = comp.linked_group(group).unwrap();
    assert_eq!(linked.master_clip_id, shoot.a);
    assert_eq!(linked.len(), 3);
}

#[test]
fn unsynced_clip_keeps_place_when_master_moves_before_combine() {
    let mut shoot = shoot();
    let (master, targets) = capture(&shoot);
    let outcome = sync_clips_by_audio(
        &master,
        &targets,
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &CancelToken::new(),
    )
    .unwrap();
    let b_offset = outcome.offset_ms(shoot.b).unwrap();

    // The master is nudged while sync runs in the background.
    shoot.store.move_clip(shoot.a, 2.0, None, false).unwrap();
    combine_multicam(&mut shoot.store, &outcome).unwrap();

    let comp = shoot.store.active();
    assert!((comp.clip(shoot.a).unwrap().start_time - 2.0).abs() < 1e-9);
    assert!((comp.clip(shoot.b).unwrap().start_time - (2.0 + b_offset / 1000.0)).abs() < 1e-9);
    assert!((comp.clip(shoot.c).unwrap().start_time - 4.0).abs() < 1e-9);
    let group = comp.clip(shoot.a).unwrap().linked_group_id.unwrap();
    let linked = comp.linked_group(group).unwrap();
    assert!((linked.offset_ms(shoot.c).unwrap() - 2000.0).abs() < 1e-9);
}

#[test]
fn combine_drops_deleted_targets() {
    let mut shoot = shoot();
    let (master, targets) = capture(&shoot);
    let outcome = sync_clips_by_audio(
        &master,
        &targets,
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &CancelToken::new(),
    )
    .unwrap();

    shoot.store.remove_clip(shoot.c).unwrap();
    let group = combine_multicam(&mut shoot.store, &outcome).unwrap();
    let linked = shoot.store.active().linked_group(group).unwrap();
    assert_eq!(linked.len(), 2);
    assert!(!linked.contains(shoot.c));
}

#[test]
fn combine_rejects_deleted_master() {
    let mut shoot = shoot();
    let (master, targets) = capture(&shoot);
    let outcome = sync_clips_by_audio(
        &master,
        &targets,
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &CancelToken::new(),
    )
    .unwrap();

    shoot.store.remove_clip(shoot.a).unwrap();
    let before = shoot.store.snapshot();
    let result = combine_multicam(&mut shoot.store, &outcome);
    assert!(matches!(result, Err(SyncError::MissingMasterData { .. })));
    assert_eq!(shoot.store.active(), &before);
}

#[test]
fn combine_rejects_overlap_with_foreign_clip() {
    let mut shoot = shoot();
    let (master, targets) = capture(&shoot);
    let outcome = sync_clips_by_audio(
        &master,
        &targets,
        &shoot.analysis,
        &SyncConfig::default(),
        |_| {},
        &CancelToken::new(),
    )
    .unwrap();

    // B will land at ~3 s on V2; put something there first.
    let v2 = shoot.store.active().tracks[2].id;
    add(&mut shoot.store, v2, ClipSource::Solid { color: [1.0; 4] }, 0.0, 5.0);
    let before = shoot.store.snapshot();
    let result = combine_multicam(&mut shoot.store, &outcome);
    assert!(matches!(result, Err(SyncError::Timeline(_))));
    assert_eq!(shoot.store.active(), &before);
}

// ── Transcript sync ────────────────────────────────────────────

fn said(words: &str, start: f64) -> Transcript {
    Transcript::from_words(
        words
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| {
                let t = start + i as f64 * 0.4;
                TranscriptWord::new(w, t, t + 0.3)
            })
            .collect(),
    )
}

#[test]
fn transcript_sync_then_combine() {
    let mut shoot = shoot();
    let (master, targets) = capture(&shoot);
    let line = "Okay, rolling. Scene four, take two. Action! Where were you last night?";
    let master_transcript = said(line, 3.0);
    let b_media = targets[0].media_id.unwrap();
    shoot.analysis.insert_transcript(b_media, said(line, 1.0));

    let inputs = TranscriptTarget::resolve(targets, &shoot.analysis);
    assert!(inputs[0].transcript.is_some());
    assert!(inputs[1].transcript.is_none());
    let outcome = sync_clips_by_transcript(
        &master,
        &master_transcript,
        &inputs,
        0.3,
        |_| {},
        &CancelToken::new(),
    )
    .unwrap();
    assert!((outcome.offset_ms(shoot.b).unwrap() - 2000.0).abs() < 1e-6);
    assert!((outcome.offset_ms(shoot.c).unwrap() - 3000.0).abs() < 1e-9);

    let group = combine_multicam(&mut shoot.store, &outcome).unwrap();
    let b = shoot.store.active().clip(shoot.b).unwrap();
    assert!((b.start_time - 3.0).abs() < 1e-9);
    assert_eq!(b.linked_group_id, Some(group));
}

// ── Background task ────────────────────────────────────────────

#[tokio::test]
async fn sync_task_reports_progress_and_result() {
    let shoot = shoot();
    let (master, targets) = capture(&shoot);
    let Shoot { analysis, b, .. } = shoot;

    let task = SyncTask::spawn(master, targets, Arc::new(analysis), SyncConfig::default());
    let mut progress = task.subscribe();
    let outcome = task.wait().await.unwrap();

    assert_eq!(*progress.borrow_and_update(), 100);
    assert!((outcome.offset_ms(b).unwrap() - 2000.0).abs() <= 50.0);
}
