use crate::Key;
use serde::{Deserialize, Serialize};

/// One captured input occurrence, stamped with the seconds elapsed since recording started.
///
/// Serializes flat, with the kind as a `type` tag:
/// `{"type": "mouse_move", "x": 10, "y": 20, "timestamp": 0.25}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub kind: EventKind,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    MouseMove {
        x: i32,
        y: i32,
    },
    #[serde(rename = "mouse_click")]
    MouseButton {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    MouseScroll {
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    },
    KeyPress {
        key: Key,
    },
    KeyRelease {
        key: Key,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[serde(alias = "Button.left")]
    Left,
    #[serde(alias = "Button.right")]
    Right,
    #[serde(alias = "Button.middle")]
    Middle,
}

impl EventRecord {
    pub fn new(kind: EventKind, timestamp: f64) -> Self {
        Self { kind, timestamp }
    }

    /// Pointer moves are the only events that get downsampled while recording
    pub fn is_mouse_move(&self) -> bool {
        self.kind.is_mouse_move()
    }
}

impl EventKind {
    pub fn is_mouse_move(&self) -> bool {
        matches!(self, EventKind::MouseMove { .. })
    }

    /// The tag this kind is written with in a macro file
    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::MouseMove { .. } => "mouse_move",
            EventKind::MouseButton { .. } => "mouse_click",
            EventKind::MouseScroll { .. } => "mouse_scroll",
            EventKind::KeyPress { .. } => "key_press",
            EventKind::KeyRelease { .. } => "key_release",
        }
    }
}
