//! The transient pointer session: which tool is active and what the pointer
//! is currently doing. Never persisted and never snapshotted.

use egui::Vec2;

use crate::layer::LayerId;

/// Pointer samples closer than this to the last stored stroke point are
/// dropped, bounding stroke growth under high-frequency pointer input.
pub const MIN_POINT_DISTANCE: f32 = 2.0;

/// Arrow-key nudge step, and the step with shift held.
pub const NUDGE_STEP: f32 = 1.0;
pub const NUDGE_STEP_LARGE: f32 = 10.0;

/// Offset applied to a duplicated layer so it doesn't land exactly on its
/// source.
pub const DUPLICATE_OFFSET: Vec2 = Vec2::new(20.0, 20.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Draw,
}

/// What the pointer is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Moving a layer; `grab_offset` is pointer − layer position, captured
    /// at pointer-down so the layer doesn't jump under the cursor.
    Dragging { layer: LayerId, grab_offset: Vec2 },
    /// Appending points to a freshly created stroke layer.
    Drawing { layer: LayerId },
}

#[derive(Debug, Default)]
pub struct Session {
    pub tool: Tool,
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    pub fn begin_drag(&mut self, layer: LayerId, grab_offset: Vec2) {
        self.state = SessionState::Dragging { layer, grab_offset };
    }

    pub fn begin_stroke(&mut self, layer: LayerId) {
        self.state = SessionState::Drawing { layer };
    }

    /// Pointer released or left the canvas: whatever was in progress ends.
    pub fn finish(&mut self) {
        self.state = SessionState::Idle;
    }

    /// The layer id an active drag or draw is tracking.
    pub fn active_layer(&self) -> Option<LayerId> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Dragging { layer, .. } | SessionState::Drawing { layer } => Some(layer),
        }
    }
}
