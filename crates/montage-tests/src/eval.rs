//! Integration tests for temporal evaluation against a live store.

use std::sync::Arc;

use montage_core::{ClipId, MediaId, TrackId};
use montage_eval::{
    Evaluator, FrameHandle, Layer, LayerSource, MemoryMediaLibrary, MemoryProxyCache,
};
use montage_timeline::{Clip, ClipSource, Composition, TimelineStore, Track};
use uuid::Uuid;

// ── Helpers ────────────────────────────────────────────────────

fn add_video(store: &mut TimelineStore, track: TrackId, media_id: MediaId, start: f64, dur: f64) -> ClipId {
    let source = ClipSource::Video {
        media_id,
        natural_duration: 100.0,
        has_audio: false,
    };
    store
        .add_clip(Clip::new("video", track, source, start, dur))
        .unwrap()
}

fn eval(store: &TimelineStore, media: &MemoryMediaLibrary, proxies: &MemoryProxyCache, time: f64) -> Vec<Layer> {
    Evaluator::new(store, media, proxies, store.config())
        .evaluate_at_time(store.active_id(), time)
        .unwrap()
}

// ── Evaluation after edits ─────────────────────────────────────

#[test]
fn split_clip_evaluates_on_both_sides_of_the_cut() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let media_id = Uuid::new_v4();
    let left = add_video(&mut store, v1, media_id, 2.0, 10.0);
    let right = store.split_clip(left, 6.0).unwrap();

    let media = MemoryMediaLibrary::new();
    media.insert(media_id, 100.0);
    let proxies = MemoryProxyCache::new();

    let before = eval(&store, &media, &proxies, 5.999);
    assert_eq!(before[0].clip_id, left);
    let after = eval(&store, &media, &proxies, 6.0);
    assert_eq!(after[0].clip_id, right);
    match &after[0].source {
        LayerSource::Media { source_time, .. } => assert!((source_time - 4.0).abs() < 1e-9),
        other => panic!("expected live media, got {other:?}"),
    }
    assert!(eval(&store, &media, &proxies, 12.0).is_empty());
}

#[test]
fn evaluation_is_deterministic_across_evaluators() {
    let mut store = TimelineStore::default();
    store.add_track(Track::new_video("V2")).unwrap();
    let (v1, v2) = (store.active().tracks[0].id, store.active().tracks[2].id);
    let media_id = Uuid::new_v4();
    add_video(&mut store, v1, media_id, 0.0, 10.0);
    store
        .add_clip(Clip::new("bg", v2, ClipSource::Solid { color: [0.0, 0.0, 0.0, 1.0] }, 0.0, 10.0))
        .unwrap();

    let media = MemoryMediaLibrary::new();
    media.insert(media_id, 100.0);
    let proxies = MemoryProxyCache::new();

    let first = eval(&store, &media, &proxies, 3.25);
    let second = eval(&store, &media, &proxies, 3.25);
    assert_eq!(first, second);
    // Bottom track first: V2 is below V1.
    assert!(matches!(first[0].source, LayerSource::Solid { .. }));
    assert!(matches!(first[1].source, LayerSource::Media { .. }));
    // A repeated evaluation at the same time needs no further seeking.
    assert_eq!(media.seek_count(media_id), 1);
}

#[test]
fn nested_composition_through_store() {
    let mut inner = Composition::default();
    let inner_track = inner.tracks[0].id;
    let inner_clip = Clip::new(
        "title",
        inner_track,
        ClipSource::Text {
            text: "Hello".into(),
        },
        0.0,
        30.0,
    );
    let inner_clip_id = inner_clip.id;
    inner.clips.push(inner_clip);
    let inner_id = inner.id;

    let mut store = TimelineStore::default();
    store.add_composition(inner).unwrap();
    let v1 = store.active().tracks[0].id;
    let host = store
        .add_clip(Clip::new("nest", v1, ClipSource::Solid { color: [1.0; 4] }, 5.0, 10.0))
        .unwrap();
    store.set_clip_source_composition(host, inner_id).unwrap();

    let media = MemoryMediaLibrary::new();
    let proxies = MemoryProxyCache::new();
    let layers = eval(&store, &media, &proxies, 7.0);
    assert_eq!(layers.len(), 1);
    let nested = layers[0].nested_layers().unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0].clip_id, inner_clip_id);
    assert_eq!(nested[0].id, format!("{host}/{inner_clip_id}"));
}

#[test]
fn store_rejects_self_nesting() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let clip = store
        .add_clip(Clip::new("loop", v1, ClipSource::Solid { color: [1.0; 4] }, 0.0, 5.0))
        .unwrap();
    let own_id = store.active_id();
    assert!(store.set_clip_source_composition(clip, own_id).is_err());
}

// ── Proxies ────────────────────────────────────────────────────

#[tokio::test]
async fn proxy_frame_replaces_live_media_once_loaded() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let media_id = Uuid::new_v4();
    add_video(&mut store, v1, media_id, 0.0, 10.0);
    let mut config = store.config().clone();
    config.proxy_enabled = true;
    config.proxy_fps = 10.0;
    store.set_config(config);

    let media = MemoryMediaLibrary::new();
    media.insert(media_id, 100.0);
    let proxies = MemoryProxyCache::with_loader(Arc::new(|media_id, frame_index| {
        Some(FrameHandle {
            media_id,
            frame_index,
            width: 1,
            height: 1,
            data: Arc::from(vec![0u8; 4]),
        })
    }));

    let cold = eval(&store, &media, &proxies, 2.0);
    assert!(matches!(cold[0].source, LayerSource::Media { .. }));

    let frame = proxies.get_frame(media_id, 2.0, 10.0).await.unwrap();
    assert_eq!(frame.frame_index, 20);

    let warm = eval(&store, &media, &proxies, 2.0);
    match &warm[0].source {
        LayerSource::Proxy {
            frame_index, frame, ..
        } => {
            assert_eq!(*frame_index, 20);
            assert!(frame.is_some());
        }
        other => panic!("expected proxy, got {other:?}"),
    }
}
