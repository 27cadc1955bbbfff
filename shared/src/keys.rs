//! Keyboard and wheel bindings.

use crate::view_state::ZoomDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    PreviousPage,
    NextPage,
    ZoomIn,
    ZoomOut,
    FirstPage,
    LastPage,
    Exit,
    /// Ctrl/Cmd+F: swallow the browser's find bar.
    SuppressFind,
}

impl KeyCommand {
    /// Map a DOM `KeyboardEvent.key` value. `command_modifier` is Ctrl or Meta.
    pub fn from_key(key: &str, command_modifier: bool) -> Option<Self> {
        if command_modifier {
            return matches!(key, "f" | "F").then_some(Self::SuppressFind);
        }
        match key {
            "ArrowLeft" | "ArrowUp" => Some(Self::PreviousPage),
            "ArrowRight" | "ArrowDown" => Some(Self::NextPage),
            "+" | "=" => Some(Self::ZoomIn),
            "-" => Some(Self::ZoomOut),
            "Home" => Some(Self::FirstPage),
            "End" => Some(Self::LastPage),
            "Escape" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// One discrete zoom step per wheel event while the zoom modifier is held.
/// Only the sign of `delta_y` matters.
pub fn wheel_zoom(delta_y: f64, zoom_modifier: bool) -> Option<ZoomDirection> {
    if !zoom_modifier || delta_y == 0.0 || delta_y.is_nan() {
        return None;
    }
    Some(if delta_y < 0.0 {
        ZoomDirection::In
    } else {
        ZoomDirection::Out
    })
}
