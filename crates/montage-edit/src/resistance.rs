//! Overlap resistance for drag previews.
//!
//! A candidate that would overlap another clip is pulled back to the nearest
//! free slot. Only once the pointer has pushed further than the forcing
//! threshold past that slot is the overlap shown, flagged, as a preview.

use montage_core::{ClipId, TrackId};
use montage_timeline::placement;
use montage_timeline::Composition;

/// Where a dragged clip is previewed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub start: f64,
    /// The preview overlaps another clip and must not be committed.
    pub forcing_overlap: bool,
}

/// Apply resistance to a candidate start on `track_id`.
pub fn resolve_placement(
    comp: &Composition,
    track_id: TrackId,
    candidate: f64,
    duration: f64,
    ignore: &[ClipId],
    zoom: f64,
    forcing_overlap_px: f64,
) -> Placement {
    let nearest = placement::nearest_free_start(comp, track_id, candidate, duration, ignore);
    if (nearest - candidate).abs() <= f64::EPSILON {
        return Placement {
            start: candidate,
            forcing_overlap: false,
        };
    }
    let pushed_px = (candidate - nearest).abs() * zoom;
    if pushed_px > forcing_overlap_px {
        Placement {
            start: candidate.max(0.0),
            forcing_overlap: true,
        }
    } else {
        Placement {
            start: nearest,
            forcing_overlap: false,
        }
    }
}
