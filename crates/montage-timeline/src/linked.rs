//! Linked groups: clips that move together with fixed relative offsets.

use std::collections::BTreeMap;

use montage_core::{ClipId, GroupId, MontageError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registry entry for a set of synchronized clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedGroup {
    pub id: GroupId,
    pub master_clip_id: ClipId,
    pub member_clip_ids: Vec<ClipId>,
    /// Start offset of each member relative to the master, in milliseconds.
    pub offsets_ms: BTreeMap<ClipId, f64>,
}

impl LinkedGroup {
    /// Build a group from a master and per-clip offsets.
    ///
    /// The master is always a member with offset 0, whatever `offsets_ms`
    /// says about it.
    pub fn new(master_clip_id: ClipId, offsets_ms: BTreeMap<ClipId, f64>) -> Result<Self> {
        let mut offsets = offsets_ms;
        offsets.insert(master_clip_id, 0.0);
        if offsets.len() < 2 {
            return Err(MontageError::GroupTooSmall(offsets.len()));
        }
        if let Some((id, _)) = offsets.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MontageError::InvalidParameter(format!(
                "offset for clip {id} is not finite"
            )));
        }
        let mut member_clip_ids = vec![master_clip_id];
        member_clip_ids.extend(offsets.keys().copied().filter(|id| *id != master_clip_id));
        Ok(Self {
            id: Uuid::new_v4(),
            master_clip_id,
            member_clip_ids,
            offsets_ms: offsets,
        })
    }

    pub fn contains(&self, clip_id: ClipId) -> bool {
        self.member_clip_ids.contains(&clip_id)
    }

    pub fn offset_ms(&self, clip_id: ClipId) -> Option<f64> {
        self.offsets_ms.get(&clip_id).copied()
    }

    pub fn len(&self) -> usize {
        self.member_clip_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_clip_ids.is_empty()
    }

    /// Add a member at the given offset (used when a member is split).
    pub fn insert_member(&mut self, clip_id: ClipId, offset_ms: f64) {
        if !self.contains(clip_id) {
            self.member_clip_ids.push(clip_id);
        }
        self.offsets_ms.insert(clip_id, offset_ms);
    }

    /// Remove a member. Returns `false` when the group is no longer viable
    /// (fewer than two members or the master left).
    pub fn remove_member(&mut self, clip_id: ClipId) -> bool {
        self.member_clip_ids.retain(|id| *id != clip_id);
        self.offsets_ms.remove(&clip_id);
        self.member_clip_ids.len() >= 2 && clip_id != self.master_clip_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_forced_to_zero() {
        let master = Uuid::new_v4();
        let other = Uuid::new_v4();
        let offsets = BTreeMap::from([(master, 250.0), (other, 2000.0)]);
        let group = LinkedGroup::new(master, offsets).unwrap();
        assert_eq!(group.offset_ms(master), Some(0.0));
        assert_eq!(group.member_clip_ids[0], master);
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_single_member_rejected() {
        let master = Uuid::new_v4();
        let result = LinkedGroup::new(master, BTreeMap::new());
        assert!(matches!(result, Err(MontageError::GroupTooSmall(1))));
    }

    #[test]
    fn test_remove_member_viability() {
        let master = Uuid::new_v4();
        let (b, c) = (Uuid::new_v4(), Uuid::new_v4());
        let mut group =
            LinkedGroup::new(master, BTreeMap::from([(b, 10.0), (c, 20.0)])).unwrap();
        assert!(group.remove_member(c));
        assert!(!group.remove_member(b));
    }
}
