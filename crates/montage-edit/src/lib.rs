//! Montage Edit - Interactive timeline gestures
//!
//! Every gesture follows the same shape: `begin` captures the original
//! state, `update` computes a live preview from the pointer, and `finish`
//! makes at most one commit through the `TimelineStore` (or reverts).
//! - Pixel/time mapping and vertical track layout
//! - Snapping and overlap resistance
//! - Drag, trim and fade handles
//! - Marquee selection, the cut tool and the pick-whip

pub mod cut;
pub mod drag;
pub mod fade;
pub mod marquee;
pub mod pick_whip;
pub mod resistance;
pub mod selection;
pub mod snapping;
pub mod trim;
pub mod view;

pub use cut::{CutPreview, CutTool, ToolMode};
pub use drag::{DragGesture, DragPreview};
pub use fade::{FadeGesture, FadeHandle};
pub use marquee::MarqueeGesture;
pub use montage_timeline::TrimEdge;
pub use pick_whip::{PickWhipGesture, PickWhipSource, WhipTarget};
pub use resistance::{resolve_placement, Placement};
pub use selection::{GestureOutcome, Modifiers, Selection};
pub use snapping::{SnapKind, SnapPoint, SnappingEngine};
pub use trim::{hit_test_trim_handle, TrimGesture};
pub use view::{TimelineView, TrackLayout, TrackRow};
