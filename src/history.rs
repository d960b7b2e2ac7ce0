//! Snapshot-based undo/redo over the layer store and canvas.
//!
//! Every discrete mutating operation records the pre-mutation state;
//! continuous edits (pointer drags, slider input) ride on the last discrete
//! snapshot, which is what makes undo coarse-grained. Decoded image
//! resources are never part of a snapshot; restoring one re-acquires them
//! from each layer's source reference.

use serde::{Deserialize, Serialize};

use crate::canvas::{AspectRatio, CanvasSize};
use crate::error::EditorError;
use crate::layer::{Layer, LayerId};
use crate::store::LayerStore;

/// Maximum undo depth; the oldest snapshot is evicted beyond this.
pub const MAX_HISTORY: usize = 30;

/// An immutable deep copy of the editable document state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub layers: Vec<Layer>,
    pub canvas: CanvasSize,
    pub selected: Option<LayerId>,
    pub aspect: AspectRatio,
}

impl Snapshot {
    pub fn capture(store: &LayerStore, canvas: CanvasSize, aspect: AspectRatio) -> Self {
        Self {
            layers: store.iter().map(Layer::detached).collect(),
            canvas,
            selected: store.selected(),
            aspect,
        }
    }
}

/// Undo/redo stacks of document snapshots.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-mutation state. Clears the redo stack: history never
    /// branches.
    pub fn record(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Pop the most recent snapshot, parking `current` on the redo stack.
    pub fn undo(&mut self, current: Snapshot) -> Result<Snapshot, EditorError> {
        let snapshot = self.undo_stack.pop().ok_or(EditorError::NothingToUndo)?;
        self.redo_stack.push(current);
        Ok(snapshot)
    }

    /// Mirror of `undo`.
    pub fn redo(&mut self, current: Snapshot) -> Result<Snapshot, EditorError> {
        let snapshot = self.redo_stack.pop().ok_or(EditorError::NothingToRedo)?;
        self.undo_stack.push(current);
        Ok(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[cfg(test)]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
}
