//! Integration tests for interactive gestures.
//!
//! Each test drives a gesture from pointer events through to the store
//! commit, then checks the timeline (and, for fades, what evaluation sees).

use glam::DVec2;
use montage_core::{ClipId, TrackId};
use montage_edit::{
    CutTool, DragGesture, FadeGesture, FadeHandle, GestureOutcome, MarqueeGesture, Modifiers,
    PickWhipGesture, PickWhipSource, Selection, SnapKind, SnapPoint, SnappingEngine, TimelineView,
    ToolMode, TrackLayout, TrimEdge, TrimGesture, WhipTarget,
};
use montage_eval::{Evaluator, MemoryMediaLibrary, MemoryProxyCache};
use montage_timeline::{Clip, ClipSource, TimelineStore, Track};
use uuid::Uuid;

// ── Helpers ────────────────────────────────────────────────────

fn solid() -> ClipSource {
    ClipSource::Solid { color: [1.0; 4] }
}

fn video() -> ClipSource {
    ClipSource::Video {
        media_id: Uuid::new_v4(),
        natural_duration: 100.0,
        has_audio: true,
    }
}

fn audio() -> ClipSource {
    ClipSource::Audio {
        media_id: Uuid::new_v4(),
        natural_duration: 100.0,
    }
}

fn add(store: &mut TimelineStore, track: TrackId, source: ClipSource, start: f64, dur: f64) -> ClipId {
    store
        .add_clip(Clip::new("clip", track, source, start, dur))
        .unwrap()
}

fn layout(store: &TimelineStore) -> TrackLayout {
    TrackLayout::from_composition(store.active(), store.config().keyframe_lane_height)
}

fn start_of(store: &TimelineStore, id: ClipId) -> f64 {
    store.active().clip(id).unwrap().start_time
}

// ── Snapping ───────────────────────────────────────────────────

#[test]
fn snap_within_threshold_only() {
    // 20 px at 100 px/s is 0.2 s.
    let engine = SnappingEngine::new(true, 20.0);
    let points = [2.0, 5.0].map(|time| SnapPoint {
        time,
        kind: SnapKind::ClipEdge,
    });

    let (snapped, target) = engine.snap_time(5.05, &points, 100.0);
    assert_eq!(snapped, 5.0);
    assert_eq!(target.map(|p| p.time), Some(5.0));

    let (unsnapped, target) = engine.snap_time(3.5, &points, 100.0);
    assert_eq!(unsnapped, 3.5);
    assert!(target.is_none());
}

#[test]
fn drag_snaps_to_neighbour_edge() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    add(&mut store, v1, video(), 0.0, 5.0);
    let b = add(&mut store, v1, video(), 10.0, 2.0);
    let view = TimelineView::new(100.0);
    let layout = layout(&store);

    let mut selection = Selection::new();
    let mut drag = DragGesture::begin(
        &store,
        &view,
        b,
        DVec2::new(1050.0, 10.0),
        Modifiers::NONE,
        &mut selection,
    )
    .unwrap();
    let preview = *drag.update(&store, &view, &layout, DVec2::new(555.0, 10.0), Modifiers::NONE);
    assert_eq!(preview.start, 5.0);
    assert!(preview.snapped_to.is_some());
    assert!(!preview.forcing_overlap);

    assert_eq!(drag.finish(&mut store), GestureOutcome::Committed);
    assert_eq!(start_of(&store, b), 5.0);
    assert_eq!(store.history().undo_count(), 3);
}

#[test]
fn cancelled_drag_makes_no_commit() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let a = add(&mut store, v1, video(), 0.0, 5.0);
    let view = TimelineView::new(100.0);
    let layout = layout(&store);
    let revision = store.revision();

    let mut selection = Selection::new();
    let mut drag =
        DragGesture::begin(&store, &view, a, DVec2::new(100.0, 10.0), Modifiers::NONE, &mut selection)
            .unwrap();
    drag.update(&store, &view, &layout, DVec2::new(900.0, 10.0), Modifiers::NONE);
    assert_eq!(drag.cancel(), GestureOutcome::Unchanged);
    assert_eq!(store.revision(), revision);
    assert_eq!(start_of(&store, a), 0.0);
}

// ── Marquee and multi-clip drag ────────────────────────────────

#[test]
fn marquee_selection_drags_as_one() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let a = add(&mut store, v1, solid(), 0.0, 2.0);
    let b = add(&mut store, v1, solid(), 4.0, 2.0);
    let view = TimelineView::new(100.0);
    let layout = layout(&store);

    let mut marquee =
        MarqueeGesture::begin(&view, DVec2::new(50.0, 5.0), Modifiers::NONE, &Selection::new());
    marquee.update(store.active(), &layout, &view, DVec2::new(550.0, 50.0));
    let mut selection = marquee.finish();
    assert!(selection.contains(a) && selection.contains(b));

    let mut drag = DragGesture::begin(
        &store,
        &view,
        a,
        DVec2::new(100.0, 10.0),
        Modifiers::NONE,
        &mut selection,
    )
    .unwrap();
    drag.update(&store, &view, &layout, DVec2::new(600.0, 10.0), Modifiers::NONE);
    assert_eq!(drag.finish(&mut store), GestureOutcome::Committed);
    assert_eq!(start_of(&store, a), 5.0);
    assert_eq!(start_of(&store, b), 9.0);
}

#[test]
fn selected_companion_is_resisted_by_its_neighbour() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let a = add(&mut store, v1, solid(), 0.0, 1.0);
    let b = add(&mut store, v1, solid(), 2.0, 1.0);
    add(&mut store, v1, solid(), 5.0, 1.0);
    let view = TimelineView::new(100.0);
    let layout = layout(&store);

    let mut selection = Selection::new();
    selection.select_only(a);
    selection.toggle(b);
    let mut drag =
        DragGesture::begin(&store, &view, a, DVec2::new(50.0, 10.0), Modifiers::NONE, &mut selection)
            .unwrap();
    // +2.5 s would put the companion half a second into the blocker, so the
    // whole selection stops where the companion touches it.
    let preview = *drag.update(&store, &view, &layout, DVec2::new(300.0, 10.0), Modifiers::NONE);
    assert!(!preview.forcing_overlap);
    assert!((preview.start - 2.0).abs() < 1e-9);
    assert_eq!(drag.member_previews(), vec![(b, preview.start + 2.0)]);

    assert_eq!(drag.finish(&mut store), GestureOutcome::Committed);
    assert!((start_of(&store, a) - 2.0).abs() < 1e-9);
    assert!((start_of(&store, b) - 4.0).abs() < 1e-9);
}

// ── Trim and cut ───────────────────────────────────────────────

#[test]
fn trim_gesture_moves_linked_partner() {
    let mut store = TimelineStore::default();
    let (v1, a1) = (store.active().tracks[0].id, store.active().tracks[1].id);
    let v = add(&mut store, v1, video(), 0.0, 10.0);
    let a = add(&mut store, a1, audio(), 0.0, 10.0);
    store.link_clips(v, a).unwrap();
    let view = TimelineView::new(100.0);

    let mut trim =
        TrimGesture::begin(&store, &view, v, TrimEdge::Right, 1000.0, Modifiers::NONE).unwrap();
    trim.update(&store, &view, 750.0, Modifiers::NONE);
    assert!((trim.delta() + 2.5).abs() < 1e-9);
    assert_eq!(trim.finish(&mut store), GestureOutcome::Committed);

    let comp = store.active();
    assert!((comp.clip(v).unwrap().duration - 7.5).abs() < 1e-9);
    assert!((comp.clip(a).unwrap().duration - 7.5).abs() < 1e-9);
}

#[test]
fn cut_tool_splits_linked_pair() {
    let mut store = TimelineStore::default();
    let (v1, a1) = (store.active().tracks[0].id, store.active().tracks[1].id);
    let v = add(&mut store, v1, video(), 0.0, 10.0);
    let a = add(&mut store, a1, audio(), 0.0, 10.0);
    store.link_clips(v, a).unwrap();
    let view = TimelineView::new(100.0);
    let layout = layout(&store);

    let mut tool = CutTool::new();
    tool.set_mode(ToolMode::Cut);
    let preview = tool
        .hover(&store, &layout, &view, DVec2::new(400.0, 10.0))
        .cloned()
        .unwrap();
    assert_eq!(preview.time, 4.0);
    assert_eq!(preview.linked_clip_id, Some(a));
    assert_eq!(tool.click(&mut store), GestureOutcome::Committed);

    let comp = store.active();
    assert_eq!(comp.clips.len(), 4);
    let right_v = comp.clip_at(v1, 5.0).unwrap();
    let right_a = comp.clip_at(a1, 5.0).unwrap();
    assert_eq!(right_v.linked_clip_id, Some(right_a.id));
    assert_eq!(right_a.linked_clip_id, Some(right_v.id));
    assert!((comp.clip(v).unwrap().duration - 4.0).abs() < 1e-9);
    assert!((right_v.in_point - 4.0).abs() < 1e-9);
}

// ── Fades ──────────────────────────────────────────────────────

#[test]
fn fade_handle_drives_evaluated_opacity() {
    let mut store = TimelineStore::default();
    let v1 = store.active().tracks[0].id;
    let id = add(&mut store, v1, solid(), 0.0, 10.0);
    let view = TimelineView::new(100.0);

    let mut fade = FadeGesture::begin(&store, &view, id, FadeHandle::In, 0.0).unwrap();
    assert!((fade.update(&view, 200.0) - 2.0).abs() < 1e-9);
    assert_eq!(fade.finish(&mut store), GestureOutcome::Committed);

    let media = MemoryMediaLibrary::new();
    let proxies = MemoryProxyCache::new();
    let config = store.config().clone();
    let evaluator = Evaluator::new(&store, &media, &proxies, &config);
    let at = |t: f64| evaluator.evaluate_at_time(store.active_id(), t).unwrap()[0].opacity;
    assert!(at(0.0).abs() < 1e-9);
    assert!((at(1.0) - 0.5).abs() < 1e-9);
    assert!((at(5.0) - 1.0).abs() < 1e-9);
}

// ── Pick-whip ──────────────────────────────────────────────────

#[test]
fn pick_whip_parents_and_rejects_cycles() {
    let mut store = TimelineStore::default();
    store.add_track(Track::new_video("V2")).unwrap();
    let (v1, v2) = (store.active().tracks[0].id, store.active().tracks[2].id);
    let child = add(&mut store, v1, solid(), 0.0, 5.0);
    let parent = add(&mut store, v2, solid(), 0.0, 5.0);
    let view = TimelineView::new(100.0);
    let layout = layout(&store);
    let parent_row = layout.row(v2).unwrap().top + 10.0;
    let child_row = layout.row(v1).unwrap().top + 10.0;

    let mut whip = PickWhipGesture::begin(PickWhipSource::Clip(child));
    let target = whip.update(store.active(), &layout, &view, DVec2::new(100.0, parent_row));
    assert_eq!(target, WhipTarget::Valid(parent));
    assert_eq!(whip.finish(&mut store), GestureOutcome::Committed);
    assert_eq!(store.active().clip(child).unwrap().parent_clip_id, Some(parent));

    let revision = store.revision();
    let mut back = PickWhipGesture::begin(PickWhipSource::Clip(parent));
    let target = back.update(store.active(), &layout, &view, DVec2::new(100.0, child_row));
    assert_eq!(target, WhipTarget::Invalid(child));
    assert!(matches!(back.finish(&mut store), GestureOutcome::Reverted { .. }));
    assert_eq!(store.revision(), revision);
}
