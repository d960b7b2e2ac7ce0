//! The ordered layer collection: single source of truth for document
//! content, plus the current selection.

use log::debug;

use crate::error::EditorError;
use crate::layer::{Layer, LayerId, LayerKind};

/// Hard cap on the number of layers in one document.
pub const MAX_LAYERS: usize = 50;

/// Layers in paint order (index 0 is painted first, i.e. bottom-most).
/// A base layer, when present, is always index 0.
#[derive(Debug, Default, Clone)]
pub struct LayerStore {
    layers: Vec<Layer>,
    selected: Option<LayerId>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer on top of the stack. Rejected once the capacity is
    /// reached, leaving the store unchanged. Base layers go through
    /// [`LayerStore::set_base`] instead, which keeps them at index 0.
    pub fn add(&mut self, layer: Layer) -> Result<LayerId, EditorError> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(EditorError::CapacityExceeded(MAX_LAYERS));
        }
        let id = layer.id;
        self.layers.push(layer);
        Ok(id)
    }

    /// Install `layer` as the base: any existing base is replaced, and the
    /// new one lands at index 0 so it is painted below everything else.
    pub fn set_base(&mut self, layer: Layer) -> Result<LayerId, EditorError> {
        let had_base = self.has_base();
        if !had_base && self.layers.len() >= MAX_LAYERS {
            return Err(EditorError::CapacityExceeded(MAX_LAYERS));
        }
        if had_base {
            let old = self.layers.remove(0);
            debug!("replacing base layer {}", old.id);
            if self.selected == Some(old.id) {
                self.selected = None;
            }
        }
        let id = layer.id;
        self.layers.insert(0, layer);
        Ok(id)
    }

    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.layers.remove(index))
    }

    /// Whether `reorder(id, delta)` would apply: the layer must be unlocked
    /// and the target index inside the reorderable range. While a base
    /// exists, index 0 is not part of that range.
    pub fn can_reorder(&self, id: LayerId, delta: isize) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if self.layers[index].locked {
            return false;
        }
        let floor = if self.has_base() { 1 } else { 0 };
        let target = index as isize + delta;
        target >= floor as isize && target < self.layers.len() as isize
    }

    /// Move a layer by `delta` places in paint order. No-op (returning
    /// false) outside the `can_reorder` conditions.
    pub fn reorder(&mut self, id: LayerId, delta: isize) -> bool {
        if !self.can_reorder(id, delta) {
            return false;
        }
        let index = self.index_of(id).expect("checked by can_reorder");
        let target = (index as isize + delta) as usize;
        let layer = self.layers.remove(index);
        self.layers.insert(target, layer);
        true
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    /// Select a layer (or clear the selection with `None`). Ids that are not
    /// in the store clear the selection rather than dangling.
    pub fn set_selected(&mut self, id: Option<LayerId>) {
        self.selected = id.filter(|id| self.get(*id).is_some());
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.selected?;
        self.get_mut(id)
    }

    /// Layers in paint order, bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn has_base(&self) -> bool {
        self.layers
            .first()
            .is_some_and(|layer| layer.kind() == LayerKind::Base)
    }

    /// The export precondition: is there anything that would paint?
    pub fn has_visible_content(&self) -> bool {
        self.layers.iter().any(|layer| layer.visible)
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.selected = None;
    }

    /// Replace the whole collection in one pass (snapshot restore).
    pub fn replace_all(&mut self, layers: Vec<Layer>, selected: Option<LayerId>) {
        self.layers = layers;
        self.selected = None;
        self.set_selected(selected);
    }
}
