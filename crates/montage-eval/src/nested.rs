//! Nested composition evaluation.
//!
//! A clip whose source is another composition is evaluated by recursing
//! into that composition at the clip's mapped source time. Each level
//! carries an immutable context with the chain of compositions being
//! evaluated, so self-nesting is caught even if it slipped past the store.

use montage_core::{ClipId, CompositionId};
use montage_timeline::Clip;
use smallvec::SmallVec;

use crate::error::{EvalError, Result};
use crate::evaluator::Evaluator;
use crate::layer::{Layer, LayerSource};

/// Per-call recursion state, passed down by value.
#[derive(Debug, Clone)]
pub(crate) struct EvalContext {
    /// Compositions from the root down to the one being evaluated.
    pub chain: SmallVec<[CompositionId; 8]>,
    /// Clip ids from the root down to the clip hosting this level.
    pub path: SmallVec<[ClipId; 8]>,
}

impl EvalContext {
    pub fn root(composition_id: CompositionId) -> Self {
        let mut chain = SmallVec::new();
        chain.push(composition_id);
        Self {
            chain,
            path: SmallVec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.chain.len() - 1
    }

    /// Context for evaluating `nested` hosted by `clip_id`.
    pub fn enter(&self, clip_id: ClipId, nested: CompositionId, max_depth: usize) -> Result<Self> {
        if self.chain.contains(&nested) {
            return Err(EvalError::NestingCycle(nested));
        }
        if self.depth() >= max_depth {
            return Err(EvalError::NestingTooDeep {
                max_depth,
                composition_id: nested,
            });
        }
        let mut next = self.clone();
        next.chain.push(nested);
        next.path.push(clip_id);
        Ok(next)
    }

    /// Layer id for a clip at this level.
    pub fn layer_id(&self, clip_id: ClipId) -> String {
        let mut id = String::with_capacity((self.path.len() + 1) * 37);
        for host in &self.path {
            id.push_str(&host.to_string());
            id.push('/');
        }
        id.push_str(&clip_id.to_string());
        id
    }
}

/// Evaluate the composition a clip nests, at clip-local time `local`.
pub(crate) fn evaluate_nested(
    evaluator: &Evaluator<'_>,
    clip: &Clip,
    composition_id: CompositionId,
    local: f64,
    ctx: &EvalContext,
) -> Result<LayerSource> {
    let inner_ctx = ctx.enter(clip.id, composition_id, evaluator.config().max_nesting_depth)?;
    let nested = evaluator
        .resolve(composition_id)
        .ok_or(EvalError::CompositionNotFound(composition_id))?;
    let nested_time = clip.source_time(local, nested.duration);
    let layers: Vec<Layer> = evaluator.evaluate_composition(nested, nested_time, &inner_ctx);
    Ok(LayerSource::Nested {
        composition_id,
        layers,
        width: nested.width,
        height: nested.height,
    })
}
