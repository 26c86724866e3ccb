//! Montage Eval - Temporal evaluation engine
//!
//! Turns a composition and a point in time into the ordered list of layers
//! the compositor draws:
//! - Bottom-to-top track walk with solo/visibility handling
//! - Recursive nested compositions with cycle and depth guards
//! - Proxy frame substitution and drift-gated media seeking
//! - Keyframed transforms composed through parent clips

pub mod error;
pub mod evaluator;
pub mod layer;
mod nested;
pub mod source;

pub use error::{EvalError, Result};
pub use evaluator::{effective_transform, CompositionResolver, Evaluator};
pub use layer::{FrameHandle, Layer, LayerSource};
pub use source::{FrameLoader, MediaSource, MemoryMediaLibrary, MemoryProxyCache, ProxyCache};
