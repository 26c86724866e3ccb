//! Snapshot-based undo/redo.
//!
//! Every store commit pushes the composition as it was before the commit.
//! Undo swaps the current state with the most recent snapshot; redo swaps
//! it back.

use crate::composition::Composition;

/// One recorded state and the label of the commit that left it.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub label: String,
    pub composition: Composition,
}

/// Bounded undo/redo history of composition snapshots.
#[derive(Debug, Clone)]
pub struct History {
    /// States before each commit (most recent last).
    undo: Vec<HistoryEntry>,
    /// States that have been undone (most recent last).
    redo: Vec<HistoryEntry>,
    /// Maximum history depth.
    max_depth: usize,
}

impl History {
    /// Create a new history with the given maximum depth.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_depth,
        }
    }

    /// Record the state a commit replaced.
    /// Clears the redo stack (new action invalidates redo history).
    pub fn push(&mut self, label: impl Into<String>, previous: Composition) {
        self.redo.clear();
        self.undo.push(HistoryEntry {
            label: label.into(),
            composition: previous,
        });
        if self.undo.len() > self.max_depth {
            self.undo.remove(0);
        }
    }

    /// Step back. `current` is stored for redo; returns the state to restore.
    pub fn undo(&mut self, current: Composition) -> Option<Composition> {
        let entry = self.undo.pop()?;
        self.redo.push(HistoryEntry {
            label: entry.label,
            composition: current,
        });
        Some(entry.composition)
    }

    /// Step forward again. `current` goes back on the undo stack.
    pub fn redo(&mut self, current: Composition) -> Option<Composition> {
        let entry = self.redo.pop()?;
        self.undo.push(HistoryEntry {
            label: entry.label,
            composition: current,
        });
        Some(entry.composition)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the commit the next undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo.last().map(|e| e.label.as_str())
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(200)
    }
}
