//! Compositions: the unit of timeline state.

use std::collections::{HashMap, HashSet};

use montage_core::{
    ClipId, CompositionId, EngineConfig, FrameRate, GroupId, MontageError, Result, TrackId,
    TIME_EPSILON,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::Clip;
use crate::linked::LinkedGroup;
use crate::track::{Track, TrackKind};

/// A complete timeline: tracks, the clips placed on them, and the linked
/// groups between those clips. Owns everything it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub id: CompositionId,
    pub name: String,
    pub duration: f64,
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
    /// First track is topmost in the video stack.
    pub tracks: Vec<Track>,
    pub clips: Vec<Clip>,
    pub linked_groups: Vec<LinkedGroup>,
}

impl Composition {
    /// Create a composition with one video and one audio track.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        frame_rate: FrameRate,
        duration: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            duration,
            frame_rate,
            width,
            height,
            tracks: vec![Track::new_video("V1"), Track::new_audio("A1")],
            clips: Vec::new(),
            linked_groups: Vec::new(),
        }
    }

    /// A composition without any tracks.
    pub fn empty(name: impl Into<String>, width: u32, height: u32, duration: f64) -> Self {
        Self {
            tracks: Vec::new(),
            ..Self::new(name, width, height, FrameRate::default(), duration)
        }
    }

    // ── Lookup ──────────────────────────────────────────────────

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    pub fn require_clip(&self, id: ClipId) -> Result<&Clip> {
        self.clip(id).ok_or(MontageError::ClipNotFound(id))
    }

    pub fn require_clip_mut(&mut self, id: ClipId) -> Result<&mut Clip> {
        self.clip_mut(id).ok_or(MontageError::ClipNotFound(id))
    }

    pub fn require_track(&self, id: TrackId) -> Result<&Track> {
        self.track(id).ok_or(MontageError::TrackNotFound(id))
    }

    /// Clips on a track, sorted by start time.
    pub fn clips_on_track(&self, track_id: TrackId) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.iter().filter(|c| c.track_id == track_id).collect();
        clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        clips
    }

    /// The clip on `track_id` covering `time`, if any (half-open).
    pub fn clip_at(&self, track_id: TrackId, time: f64) -> Option<&Clip> {
        self.clips
            .iter()
            .find(|c| c.track_id == track_id && c.contains_time(time))
    }

    pub fn linked_group(&self, id: GroupId) -> Option<&LinkedGroup> {
        self.linked_groups.iter().find(|g| g.id == id)
    }

    pub fn linked_group_mut(&mut self, id: GroupId) -> Option<&mut LinkedGroup> {
        self.linked_groups.iter_mut().find(|g| g.id == id)
    }

    /// Every composition referenced directly as a clip source.
    pub fn nested_composition_ids(&self) -> impl Iterator<Item = CompositionId> + '_ {
        self.clips.iter().filter_map(|c| c.source.nested_composition())
    }

    /// End of the last clip.
    pub fn content_end(&self) -> f64 {
        self.clips.iter().map(Clip::end_time).fold(0.0, f64::max)
    }

    /// Whether a track is hidden, taking solo into account: when any track of
    /// the same kind is soloed, non-soloed tracks of that kind are hidden.
    pub fn is_track_hidden(&self, track: &Track) -> bool {
        if !track.visible {
            return true;
        }
        let solo_active = self.tracks.iter().any(|t| t.kind == track.kind && t.solo);
        solo_active && !track.solo
    }

    // ── Validation ──────────────────────────────────────────────

    /// Check every structural invariant.
    ///
    /// `nested_duration` resolves the natural duration of a nested
    /// composition source.
    pub fn validate(
        &self,
        config: &EngineConfig,
        nested_duration: &dyn Fn(CompositionId) -> Option<f64>,
    ) -> Result<()> {
        let track_kinds: HashMap<TrackId, TrackKind> =
            self.tracks.iter().map(|t| (t.id, t.kind)).collect();
        let mut seen = HashSet::new();

        for clip in &self.clips {
            if !seen.insert(clip.id) {
                return Err(MontageError::InvalidParameter(format!(
                    "duplicate clip id {}",
                    clip.id
                )));
            }
            let kind = *track_kinds
                .get(&clip.track_id)
                .ok_or(MontageError::TrackNotFound(clip.track_id))?;
            if clip.source.track_kind() != kind {
                return Err(MontageError::TrackKindMismatch {
                    clip_id: clip.id,
                    track_id: clip.track_id,
                    reason: format!(
                        "{:?} source on {:?} track",
                        clip.source.track_kind(),
                        kind
                    ),
                });
            }
            if !(clip.duration > 0.0) || !clip.start_time.is_finite() {
                return Err(MontageError::InvalidRange(format!(
                    "clip {} has duration {}",
                    clip.id, clip.duration
                )));
            }
            if clip.start_time < -TIME_EPSILON {
                return Err(MontageError::InvalidRange(format!(
                    "clip {} starts before zero ({})",
                    clip.id, clip.start_time
                )));
            }
            let natural = match clip.source.natural_duration(config.unbounded_duration) {
                Some(natural) => natural,
                None => clip
                    .source
                    .nested_composition()
                    .and_then(nested_duration)
                    .ok_or_else(|| {
                        MontageError::CompositionNotFound(
                            clip.source.nested_composition().unwrap_or_default(),
                        )
                    })?,
            };
            if !clip.source_bounds_valid(natural) {
                return Err(MontageError::InvalidRange(format!(
                    "clip {} source range [{}, {}) outside [0, {}]",
                    clip.id, clip.in_point, clip.out_point, natural
                )));
            }
        }

        self.validate_overlaps()?;
        self.validate_links()?;
        self.validate_groups()?;
        self.validate_parents()?;
        Ok(())
    }

    fn validate_overlaps(&self) -> Result<()> {
        for track in &self.tracks {
            let clips = self.clips_on_track(track.id);
            for pair in clips.windows(2) {
                if pair[0].range().overlaps(pair[1].range()) {
                    return Err(MontageError::Overlap {
                        clip_id: pair[1].id,
                        other_id: pair[0].id,
                        track_id: track.id,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_links(&self) -> Result<()> {
        for clip in &self.clips {
            let Some(partner_id) = clip.linked_clip_id else {
                continue;
            };
            let partner = self.require_clip(partner_id)?;
            if partner_id == clip.id || partner.linked_clip_id != Some(clip.id) {
                return Err(MontageError::InvalidParameter(format!(
                    "link between {} and {} is not symmetric",
                    clip.id, partner_id
                )));
            }
        }
        Ok(())
    }

    fn validate_groups(&self) -> Result<()> {
        for group in &self.linked_groups {
            if group.len() < 2 {
                return Err(MontageError::GroupTooSmall(group.len()));
            }
            if !group.contains(group.master_clip_id) {
                return Err(MontageError::InvalidParameter(format!(
                    "group {} does not contain its master",
                    group.id
                )));
            }
            for member in &group.member_clip_ids {
                let clip = self.require_clip(*member)?;
                if clip.linked_group_id != Some(group.id) {
                    return Err(MontageError::InvalidParameter(format!(
                        "clip {} is listed in group {} but not marked",
                        member, group.id
                    )));
                }
            }
        }
        for clip in &self.clips {
            if let Some(group_id) = clip.linked_group_id {
                let known = self
                    .linked_group(group_id)
                    .is_some_and(|g| g.contains(clip.id));
                if !known {
                    return Err(MontageError::InvalidParameter(format!(
                        "clip {} references unknown group {}",
                        clip.id, group_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_parents(&self) -> Result<()> {
        for clip in &self.clips {
            if let Some(parent) = clip.parent_clip_id {
                self.require_clip(parent)?;
                if self.clip_parent_chain_reaches(parent, clip.id) {
                    return Err(MontageError::ParentCycle {
                        child: clip.id,
                        parent,
                    });
                }
            }
        }
        for track in &self.tracks {
            if let Some(parent) = track.parent_track_id {
                self.require_track(parent)?;
                if self.track_parent_chain_reaches(parent, track.id) {
                    return Err(MontageError::ParentCycle {
                        child: track.id,
                        parent,
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether walking up the clip parent chain from `start` reaches `target`.
    pub fn clip_parent_chain_reaches(&self, start: ClipId, target: ClipId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                return true;
            }
            cursor = self.clip(id).and_then(|c| c.parent_clip_id);
        }
        false
    }

    /// Whether walking up the track parent chain from `start` reaches `target`.
    pub fn track_parent_chain_reaches(&self, start: TrackId, target: TrackId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if id == target || !visited.insert(id) {
                return true;
            }
            cursor = self.track(id).and_then(|t| t.parent_track_id);
        }
        false
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::new("Composition 1", 1920, 1080, FrameRate::FPS_30, 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipSource;

    fn solid(track: TrackId, start: f64, duration: f64) -> Clip {
        Clip::new(
            "solid",
            track,
            ClipSource::Solid {
                color: [1.0, 0.0, 0.0, 1.0],
            },
            start,
            duration,
        )
    }

    fn no_nested(_: CompositionId) -> Option<f64> {
        None
    }

    #[test]
    fn test_adjacent_clips_are_valid() {
        let mut comp = Composition::default();
        let v1 = comp.tracks[0].id;
        comp.clips.push(solid(v1, 0.0, 5.0));
        comp.clips.push(solid(v1, 5.0, 5.0));
        assert!(comp.validate(&EngineConfig::default(), &no_nested).is_ok());
        assert_eq!(comp.clip_at(v1, 5.0).map(|c| c.start_time), Some(5.0));
    }

    #[test]
    fn test_overlap_detected() {
        let mut comp = Composition::default();
        let v1 = comp.tracks[0].id;
        comp.clips.push(solid(v1, 0.0, 5.0));
        comp.clips.push(solid(v1, 4.0, 5.0));
        let err = comp.validate(&EngineConfig::default(), &no_nested);
        assert!(matches!(err, Err(MontageError::Overlap { .. })));
    }

    #[test]
    fn test_track_kind_mismatch() {
        let mut comp = Composition::default();
        let a1 = comp.tracks[1].id;
        comp.clips.push(solid(a1, 0.0, 5.0));
        let err = comp.validate(&EngineConfig::default(), &no_nested);
        assert!(matches!(err, Err(MontageError::TrackKindMismatch { .. })));
    }

    #[test]
    fn test_asymmetric_link_rejected() {
        let mut comp = Composition::default();
        let v1 = comp.tracks[0].id;
        let mut a = solid(v1, 0.0, 2.0);
        let b = solid(v1, 3.0, 2.0);
        a.linked_clip_id = Some(b.id);
        comp.clips.push(a);
        comp.clips.push(b);
        assert!(comp.validate(&EngineConfig::default(), &no_nested).is_err());
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let mut comp = Composition::default();
        let v1 = comp.tracks[0].id;
        let mut a = solid(v1, 0.0, 2.0);
        let mut b = solid(v1, 3.0, 2.0);
        a.parent_clip_id = Some(b.id);
        b.parent_clip_id = Some(a.id);
        comp.clips.push(a);
        comp.clips.push(b);
        let err = comp.validate(&EngineConfig::default(), &no_nested);
        assert!(matches!(err, Err(MontageError::ParentCycle { .. })));
    }

    #[test]
    fn test_solo_hides_other_tracks_of_same_kind() {
        let mut comp = Composition::default();
        comp.tracks.push(Track::new_video("V2"));
        comp.tracks[2].solo = true;
        assert!(comp.is_track_hidden(&comp.tracks[0]));
        assert!(!comp.is_track_hidden(&comp.tracks[2]));
        assert!(!comp.is_track_hidden(&comp.tracks[1]));
    }
}
