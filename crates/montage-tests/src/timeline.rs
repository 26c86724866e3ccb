//! Integration tests for the timeline store.
//!
//! Exercises montage-core validation through montage-timeline commits,
//! gestures from montage-edit and project persistence.

use glam::DVec2;
use montage_core::{ClipId, MontageError, TrackId};
use montage_edit::{DragGesture, Modifiers, Selection, TimelineView, TrackLayout, TrimEdge};
use montage_timeline::{Clip, ClipSource, Composition, ProjectFile, TimelineStore, Track};
use proptest::prelude::*;
use uuid::Uuid;

// ── Helpers ────────────────────────────────────────────────────

fn video(natural: f64) -> ClipSource {
    ClipSource::Video {
        media_id: Uuid::new_v4(),
        natural_duration: natural,
        has_audio: true,
    }
}

fn audio(natural: f64) -> ClipSource {
    ClipSource::Audio {
        media_id: Uuid::new_v4(),
        natural_duration: natural,
    }
}

fn v1(store: &TimelineStore) -> TrackId {
    store.active().tracks[0].id
}

fn a1(store: &TimelineStore) -> TrackId {
    store.active().tracks[1].id
}

fn add(store: &mut TimelineStore, track: TrackId, source: ClipSource, start: f64, dur: f64) -> ClipId {
    store
        .add_clip(Clip::new("clip", track, source, start, dur))
        .unwrap()
}

fn assert_no_overlap(comp: &Composition) {
    for a in &comp.clips {
        for b in &comp.clips {
            if a.id != b.id && a.track_id == b.track_id {
                assert!(
                    a.end_time() <= b.start_time + 1e-9 || b.end_time() <= a.start_time + 1e-9,
                    "clips {} and {} overlap",
                    a.id,
                    b.id
                );
            }
        }
    }
}

// ── No overlap ─────────────────────────────────────────────────

#[test]
fn overlapping_add_is_rejected() {
    let mut store = TimelineStore::default();
    let track = v1(&store);
    add(&mut store, track, video(100.0), 0.0, 5.0);
    let result = store.add_clip(Clip::new("late", track, video(100.0), 4.0, 5.0));
    assert!(matches!(result, Err(MontageError::Overlap { .. })));
    assert_eq!(store.active().clips.len(), 1);
}

#[test]
fn touching_clips_are_allowed() {
    let mut store = TimelineStore::default();
    let track = v1(&store);
    add(&mut store, track, video(100.0), 0.0, 5.0);
    add(&mut store, track, video(100.0), 5.0, 5.0);
    assert!(store.validate_active().is_ok());
}

#[test]
fn rejected_group_move_leaves_every_member_in_place() {
    let mut store = TimelineStore::default();
    let track = v1(&store);
    let a = add(&mut store, track, video(100.0), 0.0, 5.0);
    let b = add(&mut store, track, video(100.0), 6.0, 2.0);
    let blocker = add(&mut store, track, video(100.0), 12.0, 5.0);
    let before = store.snapshot();

    let result = store.move_clips(&[a, b], 5.0, None, false);
    assert!(result.is_err());
    assert_eq!(store.active(), &before);
    assert!(store.active().clip(blocker).is_some());
}

proptest! {
    #[test]
    fn random_drags_never_overlap(
        ops in prop::collection::vec((0usize..4, 0.0f64..40.0, 0usize..3), 1..24)
    ) {
        let mut store = TimelineStore::default();
        store.add_track(Track::new_video("V2")).unwrap();
        let track = v1(&store);
        let ids: Vec<ClipId> = (0..4)
            .map(|i| add(&mut store, track, video(100.0), i as f64 * 8.0, 5.0))
            .collect();
        let view = TimelineView::new(100.0);

        for (which, to, row) in ops {
            let layout = TrackLayout::from_composition(store.active(), 18.0);
            let clip = store.active().clip(ids[which]).unwrap().clone();
            let grab = DVec2::new(view.time_to_x(clip.start_time + 1.0), 1.0);
            let mut selection = Selection::new();
            let mut drag =
                DragGesture::begin(&store, &view, clip.id, grab, Modifiers::NONE, &mut selection)
                    .unwrap();
            let target_row = &layout.rows()[row];
            let pointer = DVec2::new(view.time_to_x(to + 1.0), target_row.top + 1.0);
            drag.update(&store, &view, &layout, pointer, Modifiers::NONE);
            drag.finish(&mut store);

            prop_assert!(store.validate_active().is_ok());
            assert_no_overlap(store.active());
        }
    }
}

// ── Trimming ───────────────────────────────────────────────────

#[test]
fn trim_clamps_to_minimum_duration() {
    let mut store = TimelineStore::default();
    let track = v1(&store);
    let id = add(&mut store, track, video(100.0), 0.0, 5.0);

    let applied = store.trim_edge(id, TrimEdge::Left, 10.0, false).unwrap();
    let clip = store.active().clip(id).unwrap();
    assert!((applied - 4.9).abs() < 1e-9);
    assert!((clip.duration - 0.1).abs() < 1e-9);
    assert!((clip.start_time - 4.9).abs() < 1e-9);
}

#[test]
fn trim_right_stops_at_source_end() {
    let mut store = TimelineStore::default();
    let track = v1(&store);
    let id = add(&mut store, track, video(8.0), 0.0, 5.0);

    store.trim_edge(id, TrimEdge::Right, 10.0, false).unwrap();
    let clip = store.active().clip(id).unwrap();
    assert!((clip.duration - 8.0).abs() < 1e-9);
    assert!((clip.out_point - 8.0).abs() < 1e-9);
}

// ── Links and groups ───────────────────────────────────────────

#[test]
fn link_is_symmetric() {
    let mut store = TimelineStore::default();
    let (tv, ta) = (v1(&store), a1(&store));
    let v = add(&mut store, tv, video(100.0), 0.0, 5.0);
    let a = add(&mut store, ta, audio(100.0), 0.0, 5.0);

    store.link_clips(v, a).unwrap();
    assert_eq!(store.active().clip(v).unwrap().linked_clip_id, Some(a));
    assert_eq!(store.active().clip(a).unwrap().linked_clip_id, Some(v));

    store.unlink_clips(a).unwrap();
    assert_eq!(store.active().clip(v).unwrap().linked_clip_id, None);
    assert_eq!(store.active().clip(a).unwrap().linked_clip_id, None);
}

#[test]
fn relinking_clears_old_partner() {
    let mut store = TimelineStore::default();
    let (tv, ta) = (v1(&store), a1(&store));
    let v = add(&mut store, tv, video(100.0), 0.0, 5.0);
    let a = add(&mut store, ta, audio(100.0), 0.0, 5.0);
    let b = add(&mut store, ta, audio(100.0), 6.0, 5.0);

    store.link_clips(v, a).unwrap();
    store.link_clips(v, b).unwrap();
    assert_eq!(store.active().clip(a).unwrap().linked_clip_id, None);
    assert_eq!(store.active().clip(b).unwrap().linked_clip_id, Some(v));
}

#[test]
fn group_members_move_together_and_undo_restores() {
    let mut store = TimelineStore::default();
    let (tv, ta) = (v1(&store), a1(&store));
    let v = add(&mut store, tv, video(100.0), 2.0, 5.0);
    let a = add(&mut store, ta, audio(100.0), 3.0, 5.0);
    let group = store.group_clips(&[v, a]).unwrap();
    assert_eq!(store.active().clip(a).unwrap().linked_group_id, Some(group));

    store.move_clip(v, 10.0, None, false).unwrap();
    assert!((store.active().clip(a).unwrap().start_time - 11.0).abs() < 1e-9);

    assert!(store.undo());
    assert!((store.active().clip(v).unwrap().start_time - 2.0).abs() < 1e-9);
    assert!((store.active().clip(a).unwrap().start_time - 3.0).abs() < 1e-9);
}

#[test]
fn linked_group_with_negative_offset_shifts_right() {
    let mut store = TimelineStore::default();
    let (tv, ta) = (v1(&store), a1(&store));
    let master = add(&mut store, tv, video(100.0), 1.0, 5.0);
    let other = add(&mut store, ta, audio(100.0), 20.0, 5.0);

    let offsets = [(master, 0.0), (other, -3000.0)].into_iter().collect();
    store.create_linked_group(master, offsets).unwrap();
    let comp = store.active();
    assert!((comp.clip(other).unwrap().start_time - 0.0).abs() < 1e-9);
    assert!((comp.clip(master).unwrap().start_time - 3.0).abs() < 1e-9);
}

// ── Persistence ────────────────────────────────────────────────

#[test]
fn project_round_trip_through_store() {
    let mut store = TimelineStore::default();
    let (tv, ta) = (v1(&store), a1(&store));
    let v = add(&mut store, tv, video(100.0), 0.0, 5.0);
    let a = add(&mut store, ta, audio(100.0), 0.0, 5.0);
    store.link_clips(v, a).unwrap();

    let nested = Composition::default();
    let nested_id = nested.id;
    store.add_composition(nested).unwrap();
    let n = add(&mut store, tv, ClipSource::Solid { color: [1.0; 4] }, 6.0, 2.0);
    store.set_clip_source_composition(n, nested_id).unwrap();

    let json = ProjectFile::new(store.to_project("Round trip")).to_json().unwrap();
    let file = ProjectFile::from_json(&json).unwrap();
    assert_eq!(file.project.name, "Round trip");
    let restored = TimelineStore::from_project(file.project).unwrap();
    assert_eq!(restored.active(), store.active());
    assert!(restored.composition(nested_id).is_some());
}
