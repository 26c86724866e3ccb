//! The timeline state container.
//!
//! `TimelineStore` owns the active composition and the stored (frozen)
//! compositions that can be nested or activated. All mutation goes through
//! [`TimelineStore::commit`], which applies a change to a draft copy,
//! validates every invariant and only then swaps the draft in. A failed
//! commit leaves the store exactly as it was.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use montage_core::{
    AnimatableProperty, ClipId, CompositionId, Easing, EngineConfig, GroupId, KeyframeId,
    MontageError, Result, TrackId, TIME_EPSILON,
};
use smallvec::SmallVec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clip::{Clip, ClipSource};
use crate::composition::Composition;
use crate::history::History;
use crate::linked::LinkedGroup;
use crate::placement::{self, TrimEdge, TrimLimits, TrimPlan};
use crate::track::Track;

type ClipIds = SmallVec<[ClipId; 8]>;

/// Injectable timeline state: active composition, stored compositions,
/// history and a revision counter bumped on every change.
#[derive(Debug)]
pub struct TimelineStore {
    config: EngineConfig,
    active: Composition,
    stored: HashMap<CompositionId, Arc<Composition>>,
    history: History,
    revision: u64,
}

impl TimelineStore {
    pub fn new(active: Composition, config: EngineConfig) -> Self {
        Self {
            config,
            active,
            stored: HashMap::new(),
            history: History::default(),
            revision: 0,
        }
    }

    // ── Read access ─────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// The live, editable composition.
    pub fn active(&self) -> &Composition {
        &self.active
    }

    pub fn active_id(&self) -> CompositionId {
        self.active.id
    }

    /// Incremented by every commit, undo and redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Resolve a composition, active or stored.
    pub fn composition(&self, id: CompositionId) -> Option<&Composition> {
        if id == self.active.id {
            Some(&self.active)
        } else {
            self.stored.get(&id).map(Arc::as_ref)
        }
    }

    /// Shared handle to a stored composition.
    pub fn stored(&self, id: CompositionId) -> Option<Arc<Composition>> {
        self.stored.get(&id).cloned()
    }

    pub fn composition_ids(&self) -> Vec<CompositionId> {
        let mut ids = vec![self.active.id];
        ids.extend(self.stored.keys().copied());
        ids
    }

    /// A copy of the active composition.
    pub fn snapshot(&self) -> Composition {
        self.active.clone()
    }

    /// Natural duration of a clip's source.
    pub fn natural_duration(&self, clip: &Clip) -> f64 {
        match clip.source.natural_duration(self.config.unbounded_duration) {
            Some(natural) => natural,
            None => clip
                .source
                .nested_composition()
                .and_then(|id| self.composition(id))
                .map_or(self.config.unbounded_duration, |c| c.duration),
        }
    }

    // ── Commit machinery ────────────────────────────────────────

    /// Apply `mutation` atomically.
    ///
    /// The mutation runs on a copy of the active composition. If it fails
    /// or leaves any invariant broken, the error is returned and nothing
    /// changes.
    pub fn commit<T, F>(&mut self, label: &str, mutation: F) -> Result<T>
    where
        F: FnOnce(&mut Composition) -> Result<T>,
    {
        let mut draft = self.active.clone();
        let outcome = mutation(&mut draft).and_then(|out| {
            self.validate_draft(&draft)?;
            Ok(out)
        });
        match outcome {
            Ok(out) => {
                let previous = std::mem::replace(&mut self.active, draft);
                self.history.push(label, previous);
                self.revision += 1;
                info!(label, revision = self.revision, "Committed edit");
                Ok(out)
            }
            Err(e) => {
                debug!(label, error = %e, "Edit rejected");
                Err(e)
            }
        }
    }

    fn lookup<'a>(&'a self, draft: &'a Composition, id: CompositionId) -> Option<&'a Composition> {
        if id == draft.id {
            Some(draft)
        } else {
            self.composition(id)
        }
    }

    /// Whether `from` contains `target`, directly or through nesting.
    fn nests(&self, draft: &Composition, from: CompositionId, target: CompositionId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(comp) = self.lookup(draft, id) {
                stack.extend(comp.nested_composition_ids());
            }
        }
        false
    }

    fn validate_draft(&self, draft: &Composition) -> Result<()> {
        for nested in draft.nested_composition_ids() {
            if self.nests(draft, nested, draft.id) {
                return Err(MontageError::NestingCycle {
                    host: draft.id,
                    nested,
                });
            }
        }
        draft.validate(&self.config, &|id| {
            self.lookup(draft, id).map(|c| c.duration)
        })
    }

    /// Re-check every invariant of the active composition.
    pub fn validate_active(&self) -> Result<()> {
        self.validate_draft(&self.active)
    }

    // ── Compositions ────────────────────────────────────────────

    /// Add a composition to the stored set.
    pub fn add_composition(&mut self, composition: Composition) -> Result<()> {
        if self.composition(composition.id).is_some() {
            return Err(MontageError::InvalidParameter(format!(
                "composition {} already exists",
                composition.id
            )));
        }
        self.validate_draft(&composition)?;
        info!(id = %composition.id, name = %composition.name, "Added composition");
        self.stored.insert(composition.id, Arc::new(composition));
        Ok(())
    }

    /// Make a stored composition the active one. The previously active
    /// composition is frozen into the stored set and history is cleared.
    pub fn activate(&mut self, id: CompositionId) -> Result<()> {
        if id == self.active.id {
            return Ok(());
        }
        let next = self
            .stored
            .remove(&id)
            .ok_or(MontageError::CompositionNotFound(id))?;
        let next = Arc::try_unwrap(next).unwrap_or_else(|shared| (*shared).clone());
        let previous = std::mem::replace(&mut self.active, next);
        self.stored.insert(previous.id, Arc::new(previous));
        self.history.clear();
        self.revision += 1;
        info!(%id, "Activated composition");
        Ok(())
    }

    // ── History ─────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let current = self.active.clone();
        match self.history.undo(current) {
            Some(previous) => {
                self.active = previous;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.active.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.active = next;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    // ── Tracks and clips ────────────────────────────────────────

    pub fn add_track(&mut self, track: Track) -> Result<TrackId> {
        let id = track.id;
        self.commit("Add track", move |comp| {
            if comp.track(id).is_some() {
                return Err(MontageError::InvalidParameter(format!(
                    "track {id} already exists"
                )));
            }
            comp.tracks.push(track);
            Ok(id)
        })
    }

    pub fn add_clip(&mut self, clip: Clip) -> Result<ClipId> {
        let id = clip.id;
        self.commit("Add clip", move |comp| {
            if comp.clip(id).is_some() {
                return Err(MontageError::InvalidParameter(format!(
                    "clip {id} already exists"
                )));
            }
            ensure_unlocked(comp, clip.track_id)?;
            comp.clips.push(clip);
            Ok(id)
        })
    }

    /// Remove a clip, dissolving any relation that pointed at it.
    pub fn remove_clip(&mut self, id: ClipId) -> Result<Clip> {
        self.commit("Remove clip", |comp| {
            let idx = comp
                .clips
                .iter()
                .position(|c| c.id == id)
                .ok_or(MontageError::ClipNotFound(id))?;
            ensure_unlocked(comp, comp.clips[idx].track_id)?;
            detach_from_group(comp, id);
            let clip = comp.clips.remove(idx);
            for other in &mut comp.clips {
                if other.linked_clip_id == Some(id) {
                    other.linked_clip_id = None;
                }
                if other.parent_clip_id == Some(id) {
                    other.parent_clip_id = None;
                }
                if other
                    .transition_out
                    .as_ref()
                    .is_some_and(|t| t.to_clip_id == id)
                {
                    other.transition_out = None;
                }
            }
            Ok(clip)
        })
    }

    /// Replace a clip record wholesale.
    pub fn update_clip(&mut self, clip: Clip) -> Result<()> {
        self.commit("Update clip", move |comp| {
            let slot = comp.require_clip_mut(clip.id)?;
            *slot = clip;
            Ok(())
        })
    }

    // ── Moving ──────────────────────────────────────────────────

    /// Move one clip to `new_start` on `new_track` (or its current track).
    ///
    /// Unless `break_link` is set, group members follow with the same delta
    /// and a linked partner follows with its own overlap resistance.
    pub fn move_clip(
        &mut self,
        id: ClipId,
        new_start: f64,
        new_track: Option<TrackId>,
        break_link: bool,
    ) -> Result<()> {
        self.commit("Move clip", |comp| {
            let clip = comp.require_clip(id)?;
            let delta = new_start - clip.start_time;
            let target_track = new_track.unwrap_or(clip.track_id);
            ensure_unlocked(comp, clip.track_id)?;
            ensure_unlocked(comp, target_track)?;
            if new_start < -TIME_EPSILON {
                return Err(MontageError::InvalidRange(format!(
                    "clip {id} cannot start at {new_start}"
                )));
            }
            let clip = comp.require_clip_mut(id)?;
            clip.start_time = new_start.max(0.0);
            clip.track_id = target_track;
            if !break_link {
                propagate_move(comp, &[id], delta)?;
            }
            Ok(())
        })
    }

    /// Move several clips by a shared delta.
    ///
    /// `primary` optionally moves one of them to another track; the others
    /// shift by the same number of rows where a compatible track exists and
    /// stay on their track otherwise.
    pub fn move_clips(
        &mut self,
        ids: &[ClipId],
        delta: f64,
        primary: Option<(ClipId, TrackId)>,
        break_link: bool,
    ) -> Result<()> {
        self.commit("Move clips", |comp| {
            let row_shift = match primary {
                Some((clip_id, track_id)) => {
                    let from = comp.require_clip(clip_id)?.track_id;
                    let from_idx = comp
                        .track_index(from)
                        .ok_or(MontageError::TrackNotFound(from))?;
                    let to_idx = comp
                        .track_index(track_id)
                        .ok_or(MontageError::TrackNotFound(track_id))?;
                    to_idx as isize - from_idx as isize
                }
                None => 0,
            };
            for id in ids {
                let clip = comp.require_clip(*id)?;
                ensure_unlocked(comp, clip.track_id)?;
                let new_start = clip.start_time + delta;
                if new_start < -TIME_EPSILON {
                    return Err(MontageError::InvalidRange(format!(
                        "clip {id} cannot start at {new_start}"
                    )));
                }
                let mut track_id = clip.track_id;
                if row_shift != 0 {
                    let shifted = comp
                        .track_index(clip.track_id)
                        .map(|i| i as isize + row_shift)
                        .filter(|i| *i >= 0)
                        .and_then(|i| comp.tracks.get(i as usize))
                        .filter(|t| t.kind == clip.source.track_kind() && !t.locked)
                        .map(|t| t.id);
                    match shifted {
                        Some(target) => track_id = target,
                        None if primary.is_some_and(|(p, _)| p == *id) => {
                            return Err(MontageError::TrackKindMismatch {
                                clip_id: *id,
                                track_id: primary.map(|(_, t)| t).unwrap_or(track_id),
                                reason: "target track cannot hold this clip".into(),
                            });
                        }
                        None => {}
                    }
                }
                let clip = comp.require_clip_mut(*id)?;
                clip.start_time = new_start.max(0.0);
                clip.track_id = track_id;
            }
            if !break_link {
                propagate_move(comp, ids, delta)?;
            }
            Ok(())
        })
    }

    // ── Trimming ────────────────────────────────────────────────

    /// Clamped trim plan for one clip against the active composition.
    pub fn plan_trim(&self, clip: &Clip, edge: TrimEdge, delta: f64, ignore: &[ClipId]) -> TrimPlan {
        let (prev_end, next_start) = placement::neighbour_bounds(&self.active, clip, ignore);
        placement::clamp_trim(
            clip,
            edge,
            delta,
            TrimLimits {
                natural_duration: self.natural_duration(clip),
                min_duration: self.config.min_clip_duration,
                prev_end,
                next_start,
            },
        )
    }

    /// Trim one edge of a clip by `delta` seconds with clamping.
    ///
    /// The linked partner receives the same delta with its own clamping
    /// unless `independent` is set. Returns the delta applied to `id`.
    pub fn trim_edge(
        &mut self,
        id: ClipId,
        edge: TrimEdge,
        delta: f64,
        independent: bool,
    ) -> Result<f64> {
        let clip = self.active.require_clip(id)?;
        ensure_unlocked(&self.active, clip.track_id)?;
        let plan = self.plan_trim(clip, edge, delta, &[]);
        let partner_plan = match clip.linked_clip_id {
            Some(partner_id) if !independent => self
                .active
                .clip(partner_id)
                .filter(|p| !self.active.track(p.track_id).is_some_and(|t| t.locked))
                .map(|p| (partner_id, self.plan_trim(p, edge, plan.applied_delta, &[id]))),
            _ => None,
        };
        self.commit("Trim clip", |comp| {
            plan.apply(comp.require_clip_mut(id)?);
            if let Some((partner_id, partner_plan)) = partner_plan {
                partner_plan.apply(comp.require_clip_mut(partner_id)?);
            }
            Ok(plan.applied_delta)
        })
    }

    /// Set new source bounds; the timeline duration follows `|speed|`.
    pub fn trim_clip(&mut self, id: ClipId, new_in: f64, new_out: f64) -> Result<()> {
        let min = self.config.min_clip_duration;
        let clip = self.active.require_clip(id)?;
        let natural = self.natural_duration(clip);
        if new_in < 0.0 || new_out <= new_in || new_out > natural + TIME_EPSILON {
            return Err(MontageError::InvalidRange(format!(
                "source range [{new_in}, {new_out}) outside [0, {natural}]"
            )));
        }
        let rate = clip.speed.abs();
        if rate <= TIME_EPSILON {
            return Err(MontageError::InvalidParameter(
                "cannot trim a clip with zero speed".into(),
            ));
        }
        let duration = (new_out - new_in) / rate;
        if duration < min - TIME_EPSILON {
            return Err(MontageError::InvalidRange(format!(
                "duration {duration} is shorter than {min}"
            )));
        }
        self.commit("Trim clip", |comp| {
            let clip = comp.require_clip(id)?;
            ensure_unlocked(comp, clip.track_id)?;
            let clip = comp.require_clip_mut(id)?;
            clip.in_point = new_in;
            clip.out_point = new_out;
            clip.duration = duration;
            Ok(())
        })
    }

    // ── Splitting ───────────────────────────────────────────────

    /// Split a clip (and its linked partner, when the partner spans the
    /// same instant) at timeline time `at`. Returns the id of the new
    /// right-hand clip.
    pub fn split_clip(&mut self, id: ClipId, at: f64) -> Result<ClipId> {
        self.commit("Split clip", |comp| {
            let clip = comp.require_clip(id)?.clone();
            ensure_unlocked(comp, clip.track_id)?;
            let right_id = split_one(comp, &clip, at)?;
            let partner = clip
                .linked_clip_id
                .and_then(|pid| comp.clip(pid))
                .filter(|p| p.start_time + TIME_EPSILON < at && at < p.end_time() - TIME_EPSILON)
                .cloned();
            if let Some(partner) = partner {
                let partner_right = split_one(comp, &partner, at)?;
                comp.require_clip_mut(right_id)?.linked_clip_id = Some(partner_right);
                comp.require_clip_mut(partner_right)?.linked_clip_id = Some(right_id);
            }
            Ok(right_id)
        })
    }

    // ── Links and groups ────────────────────────────────────────

    /// Create a linked group and place members at
    /// `master.start + offset / 1000`. If that would put any member before
    /// zero, the whole group shifts right.
    pub fn create_linked_group(
        &mut self,
        master: ClipId,
        offsets_ms: BTreeMap<ClipId, f64>,
    ) -> Result<GroupId> {
        self.commit("Create linked group", |comp| {
            apply_linked_group(comp, master, offsets_ms)
        })
    }

    /// Group clips at their current relative positions; the first id is
    /// the master.
    pub fn group_clips(&mut self, ids: &[ClipId]) -> Result<GroupId> {
        let Some(&master) = ids.first() else {
            return Err(MontageError::GroupTooSmall(0));
        };
        let master_start = self.active.require_clip(master)?.start_time;
        let mut offsets = BTreeMap::new();
        for id in ids {
            let clip = self.active.require_clip(*id)?;
            offsets.insert(*id, (clip.start_time - master_start) * 1000.0);
        }
        self.create_linked_group(master, offsets)
    }

    /// Dissolve the group `clip_id` belongs to. Positions are unchanged.
    pub fn unlink_group(&mut self, clip_id: ClipId) -> Result<Option<GroupId>> {
        let Some(group_id) = self.active.require_clip(clip_id)?.linked_group_id else {
            return Ok(None);
        };
        self.commit("Unlink group", |comp| {
            comp.linked_groups.retain(|g| g.id != group_id);
            for clip in &mut comp.clips {
                if clip.linked_group_id == Some(group_id) {
                    clip.linked_group_id = None;
                }
            }
            Ok(Some(group_id))
        })
    }

    /// Pair two clips so moves and trims of one apply to the other.
    pub fn link_clips(&mut self, a: ClipId, b: ClipId) -> Result<()> {
        if a == b {
            return Err(MontageError::InvalidParameter(
                "a clip cannot be linked to itself".into(),
            ));
        }
        self.commit("Link clips", |comp| {
            for id in [a, b] {
                if let Some(old) = comp.require_clip(id)?.linked_clip_id {
                    if let Some(old_partner) = comp.clip_mut(old) {
                        old_partner.linked_clip_id = None;
                    }
                }
            }
            comp.require_clip_mut(a)?.linked_clip_id = Some(b);
            comp.require_clip_mut(b)?.linked_clip_id = Some(a);
            Ok(())
        })
    }

    pub fn unlink_clips(&mut self, a: ClipId) -> Result<()> {
        self.commit("Unlink clips", |comp| {
            let clip = comp.require_clip_mut(a)?;
            if let Some(partner) = clip.linked_clip_id.take() {
                if let Some(partner) = comp.clip_mut(partner) {
                    partner.linked_clip_id = None;
                }
            }
            Ok(())
        })
    }

    // ── Nesting and parenting ───────────────────────────────────

    /// Make a clip play another composition. Rejects direct and transitive
    /// self-nesting.
    pub fn set_clip_source_composition(
        &mut self,
        clip_id: ClipId,
        composition_id: CompositionId,
    ) -> Result<()> {
        let nested_duration = self
            .composition(composition_id)
            .ok_or(MontageError::CompositionNotFound(composition_id))?
            .duration;
        if self.nests(&self.active, composition_id, self.active.id) {
            return Err(MontageError::NestingCycle {
                host: self.active.id,
                nested: composition_id,
            });
        }
        self.commit("Nest composition", |comp| {
            let clip = comp.require_clip_mut(clip_id)?;
            let rate = if clip.speed.abs() > TIME_EPSILON {
                clip.speed.abs()
            } else {
                1.0
            };
            clip.source = ClipSource::Composition { composition_id };
            clip.in_point = 0.0;
            clip.out_point = (clip.duration * rate).min(nested_duration);
            clip.duration = clip.out_point / rate;
            Ok(())
        })
    }

    /// Set or clear a clip's transform parent.
    pub fn set_parent_clip(&mut self, child: ClipId, parent: Option<ClipId>) -> Result<()> {
        self.commit("Set parent clip", |comp| {
            if let Some(parent) = parent {
                comp.require_clip(parent)?;
                if comp.clip_parent_chain_reaches(parent, child) {
                    return Err(MontageError::ParentCycle { child, parent });
                }
            }
            comp.require_clip_mut(child)?.parent_clip_id = parent;
            Ok(())
        })
    }

    /// Set or clear a track's transform parent.
    pub fn set_parent_track(&mut self, child: TrackId, parent: Option<TrackId>) -> Result<()> {
        self.commit("Set parent track", |comp| {
            if let Some(parent) = parent {
                comp.require_track(parent)?;
                if comp.track_parent_chain_reaches(parent, child) {
                    return Err(MontageError::ParentCycle { child, parent });
                }
            }
            comp.track_mut(child)
                .ok_or(MontageError::TrackNotFound(child))?
                .parent_track_id = parent;
            Ok(())
        })
    }

    // ── Keyframes ───────────────────────────────────────────────

    /// Insert or update a keyframe at clip-local `time`.
    pub fn set_keyframe(
        &mut self,
        clip_id: ClipId,
        property: AnimatableProperty,
        time: f64,
        value: f64,
        easing: Easing,
    ) -> Result<KeyframeId> {
        self.commit("Set keyframe", |comp| {
            let clip = comp.require_clip_mut(clip_id)?;
            if time < -TIME_EPSILON || time > clip.duration + TIME_EPSILON {
                return Err(MontageError::InvalidRange(format!(
                    "keyframe time {time} outside clip of {}s",
                    clip.duration
                )));
            }
            Ok(clip.set_keyframe(&property, time.clamp(0.0, clip.duration), value, easing))
        })
    }

    pub fn remove_keyframe(&mut self, clip_id: ClipId, keyframe_id: KeyframeId) -> Result<()> {
        self.commit("Remove keyframe", |comp| {
            if comp.require_clip_mut(clip_id)?.remove_keyframe(keyframe_id) {
                Ok(())
            } else {
                Err(MontageError::KeyframeNotFound(keyframe_id))
            }
        })
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(Composition::default(), EngineConfig::default())
    }
}

// ── Mutation helpers (operate on a draft) ───────────────────────

fn ensure_unlocked(comp: &Composition, track_id: TrackId) -> Result<()> {
    match comp.track(track_id) {
        Some(track) if track.locked => Err(MontageError::TrackLocked(track_id)),
        Some(_) => Ok(()),
        None => Err(MontageError::TrackNotFound(track_id)),
    }
}

/// Move everything linked to `moved` by `delta`.
///
/// Group members keep their exact offsets; a linked partner is moved with
/// resistance against its own track.
fn propagate_move(comp: &mut Composition, moved: &[ClipId], delta: f64) -> Result<()> {
    let mut done: ClipIds = moved.iter().copied().collect();

    let groups: HashSet<GroupId> = moved
        .iter()
        .filter_map(|id| comp.clip(*id).and_then(|c| c.linked_group_id))
        .collect();
    let members: ClipIds = comp
        .linked_groups
        .iter()
        .filter(|g| groups.contains(&g.id))
        .flat_map(|g| g.member_clip_ids.iter().copied())
        .filter(|id| !done.contains(id))
        .collect();
    for member in members {
        let clip = comp.require_clip_mut(member)?;
        clip.start_time += delta;
        if clip.start_time < -TIME_EPSILON {
            return Err(MontageError::InvalidRange(format!(
                "group member {member} would start before zero"
            )));
        }
        clip.start_time = clip.start_time.max(0.0);
        done.push(member);
    }

    let partners: ClipIds = done
        .iter()
        .filter_map(|id| comp.clip(*id).and_then(|c| c.linked_clip_id))
        .filter(|id| !done.contains(id))
        .collect();
    for partner_id in partners {
        let Some(partner) = comp.clip(partner_id) else {
            continue;
        };
        if comp.track(partner.track_id).is_some_and(|t| t.locked) {
            continue;
        }
        let start = placement::nearest_free_start(
            comp,
            partner.track_id,
            partner.start_time + delta,
            partner.duration,
            &[partner_id],
        );
        comp.require_clip_mut(partner_id)?.start_time = start;
    }
    Ok(())
}

/// Remove a clip from its group, dissolving the group when it stops being
/// viable.
fn detach_from_group(comp: &mut Composition, clip_id: ClipId) {
    let Some(group_id) = comp.clip(clip_id).and_then(|c| c.linked_group_id) else {
        return;
    };
    let viable = comp
        .linked_group_mut(group_id)
        .is_some_and(|g| g.remove_member(clip_id));
    if let Some(clip) = comp.clip_mut(clip_id) {
        clip.linked_group_id = None;
    }
    if !viable {
        comp.linked_groups.retain(|g| g.id != group_id);
        for clip in &mut comp.clips {
            if clip.linked_group_id == Some(group_id) {
                clip.linked_group_id = None;
            }
        }
    }
}

/// Build a group on a draft and position its members.
pub(crate) fn apply_linked_group(
    comp: &mut Composition,
    master: ClipId,
    offsets_ms: BTreeMap<ClipId, f64>,
) -> Result<GroupId> {
    let group = LinkedGroup::new(master, offsets_ms)?;
    let master_start = comp.require_clip(master)?.start_time;
    for id in &group.member_clip_ids {
        let clip = comp.require_clip(*id)?;
        ensure_unlocked(comp, clip.track_id)?;
    }

    let earliest = group
        .offsets_ms
        .values()
        .map(|ms| master_start + ms / 1000.0)
        .fold(f64::INFINITY, f64::min);
    let shift = if earliest < 0.0 { -earliest } else { 0.0 };

    for id in group.member_clip_ids.clone() {
        detach_from_group(comp, id);
        let offset = group.offset_ms(id).unwrap_or(0.0);
        let clip = comp.require_clip_mut(id)?;
        clip.start_time = master_start + offset / 1000.0 + shift;
        clip.linked_group_id = Some(group.id);
    }
    let id = group.id;
    comp.linked_groups.push(group);
    Ok(id)
}

/// Split one clip on a draft; returns the new right-hand clip id.
fn split_one(comp: &mut Composition, clip: &Clip, at: f64) -> Result<ClipId> {
    let local = at - clip.start_time;
    if local <= TIME_EPSILON || local >= clip.duration - TIME_EPSILON {
        return Err(MontageError::InvalidRange(format!(
            "split point {at} is not inside clip {}",
            clip.id
        )));
    }
    let cut_source = clip.start_point() + clip.source_offset(local);

    let mut left = clip.clone();
    let mut right = clip.clone();
    right.id = Uuid::new_v4();
    right.name = format!("{} (2)", clip.name);
    left.duration = local;
    right.start_time = at;
    right.duration = clip.duration - local;

    if clip.plays_backwards() {
        left.in_point = cut_source;
        right.out_point = cut_source;
    } else {
        left.out_point = cut_source;
        right.in_point = cut_source;
    }

    left.keyframes.clear();
    right.keyframes.clear();
    for track in &clip.keyframes {
        let (l, r) = track.split_at(local);
        if !l.is_empty() {
            left.keyframes.push(l);
        }
        if !r.is_empty() {
            right.keyframes.push(r);
        }
    }

    left.transition_out = None;
    right.linked_clip_id = None;

    if let Some(group_id) = clip.linked_group_id {
        if let Some(group) = comp.linked_group_mut(group_id) {
            let offset = group.offset_ms(clip.id).unwrap_or(0.0) + local * 1000.0;
            group.insert_member(right.id, offset);
        }
    }

    let right_id = right.id;
    *comp.require_clip_mut(clip.id)? = left;
    comp.clips.push(right);
    debug!(clip = %clip.id, right = %right_id, at, "Split clip");
    Ok(right_id)
}
