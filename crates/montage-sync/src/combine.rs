//! Apply a sync outcome to the timeline as one linked group.

use std::collections::BTreeMap;

use montage_core::GroupId;
use montage_timeline::TimelineStore;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::types::SyncOutcome;

/// Create a linked group from `outcome` in a single commit.
///
/// Ids are checked against the composition as it is now, not as it was
/// when sync started: targets deleted in the meantime are dropped, a
/// deleted master is an error. Clips that were linked without sync keep
/// the offset they have from the master now. Any placement conflict
/// rejects the whole commit.
pub fn combine_multicam(store: &mut TimelineStore, outcome: &SyncOutcome) -> Result<GroupId> {
    let comp = store.active();
    let master = outcome.master_clip_id;
    let Some(master_start) = comp.clip(master).map(|c| c.start_time) else {
        return Err(SyncError::MissingMasterData {
            clip_id: master,
            what: "clip on the timeline".into(),
        });
    };

    let mut offsets = BTreeMap::new();
    for (id, offset) in &outcome.offsets {
        match comp.clip(*id) {
            Some(_) if offset.synced => {
                offsets.insert(*id, offset.offset_ms);
            }
            Some(clip) => {
                offsets.insert(*id, (clip.start_time - master_start) * 1000.0);
            }
            None => warn!(clip = %id, "Synced clip no longer exists, dropping"),
        }
    }
    offsets.insert(master, 0.0);
    if offsets.len() < 2 {
        return Err(SyncError::InsufficientInput(offsets.len()));
    }

    let members = offsets.len();
    let group_id = store.create_linked_group(master, offsets)?;
    info!(group = %group_id, master = %master, members, "Combined multicam");
    Ok(group_id)
}
