//! Montage Timeline - Temporal data model
//!
//! Implements the composition model shared by the editing, evaluation and
//! sync engines:
//! - Compositions owning tracks, clips and linked groups
//! - Source-time mapping with speed, reversal and speed ramps
//! - The `TimelineStore` state container with validated, atomic commits
//! - Placement math for overlap resistance and trim clamping
//! - Snapshot undo/redo and versioned project files

pub mod clip;
pub mod composition;
pub mod history;
pub mod linked;
pub mod placement;
pub mod serialization;
pub mod store;
pub mod track;

pub use clip::{Clip, ClipSource, Effect, TransitionRef};
pub use composition::Composition;
pub use history::{History, HistoryEntry};
pub use linked::LinkedGroup;
pub use placement::{TrimEdge, TrimLimits, TrimPlan};
pub use serialization::{Project, ProjectFile, CURRENT_VERSION};
pub use store::TimelineStore;
pub use track::{Track, TrackKind};
