//! Domain input events, decoupled from the windowing layer.
//!
//! The shell translates raw egui input into these events; the editor's state
//! machine consumes them. Keyboard translation lives here so the shortcut
//! table (undo, redo, delete, duplicate, nudge) is testable without a UI.

use egui::{Key, Modifiers, Pos2, Vec2};

/// Direction of an arrow-key nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl NudgeDirection {
    /// Unit vector for one nudge step.
    pub fn delta(&self) -> Vec2 {
        match self {
            NudgeDirection::Up => Vec2::new(0.0, -1.0),
            NudgeDirection::Down => Vec2::new(0.0, 1.0),
            NudgeDirection::Left => Vec2::new(-1.0, 0.0),
            NudgeDirection::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// A keyboard shortcut, already resolved against the platform modifier
/// (egui folds cmd-on-mac / ctrl-elsewhere into `Modifiers::command`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Undo,
    Redo,
    DeleteSelected,
    DuplicateSelected,
    Nudge { direction: NudgeDirection, large: bool },
}

impl KeyAction {
    /// Map a key press to an editor action. Returns `None` for keys the
    /// editor doesn't own. Callers must suppress this while a text field has
    /// keyboard focus.
    pub fn from_key(key: Key, modifiers: Modifiers) -> Option<Self> {
        match key {
            Key::Z if modifiers.command && modifiers.shift => Some(KeyAction::Redo),
            Key::Z if modifiers.command => Some(KeyAction::Undo),
            Key::Y if modifiers.command => Some(KeyAction::Redo),
            Key::D if modifiers.command => Some(KeyAction::DuplicateSelected),
            Key::Delete | Key::Backspace => Some(KeyAction::DeleteSelected),
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                let direction = match key {
                    Key::ArrowUp => NudgeDirection::Up,
                    Key::ArrowDown => NudgeDirection::Down,
                    Key::ArrowLeft => NudgeDirection::Left,
                    _ => NudgeDirection::Right,
                };
                Some(KeyAction::Nudge {
                    direction,
                    large: modifiers.shift,
                })
            }
            _ => None,
        }
    }
}

/// One pointer or keyboard event in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Pos2),
    PointerMove(Pos2),
    PointerUp,
    PointerLeave,
    Key(KeyAction),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_bindings() {
        let cmd = Modifiers {
            command: true,
            ..Modifiers::NONE
        };
        let cmd_shift = Modifiers {
            command: true,
            shift: true,
            ..Modifiers::NONE
        };
        assert_eq!(KeyAction::from_key(Key::Z, cmd), Some(KeyAction::Undo));
        assert_eq!(KeyAction::from_key(Key::Z, cmd_shift), Some(KeyAction::Redo));
        assert_eq!(KeyAction::from_key(Key::Y, cmd), Some(KeyAction::Redo));
        // Plain Z types a letter somewhere else; not ours.
        assert_eq!(KeyAction::from_key(Key::Z, Modifiers::NONE), None);
    }

    #[test]
    fn test_delete_and_duplicate_bindings() {
        let cmd = Modifiers {
            command: true,
            ..Modifiers::NONE
        };
        assert_eq!(
            KeyAction::from_key(Key::Delete, Modifiers::NONE),
            Some(KeyAction::DeleteSelected)
        );
        assert_eq!(
            KeyAction::from_key(Key::Backspace, Modifiers::NONE),
            Some(KeyAction::DeleteSelected)
        );
        assert_eq!(
            KeyAction::from_key(Key::D, cmd),
            Some(KeyAction::DuplicateSelected)
        );
        assert_eq!(KeyAction::from_key(Key::D, Modifiers::NONE), None);
    }

    #[test]
    fn test_arrow_keys_nudge_with_shift_for_large_steps() {
        assert_eq!(
            KeyAction::from_key(Key::ArrowLeft, Modifiers::NONE),
            Some(KeyAction::Nudge {
                direction: NudgeDirection::Left,
                large: false
            })
        );
        assert_eq!(
            KeyAction::from_key(Key::ArrowDown, Modifiers::SHIFT),
            Some(KeyAction::Nudge {
                direction: NudgeDirection::Down,
                large: true
            })
        );
    }
}
