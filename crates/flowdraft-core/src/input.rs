//! Input events for the gesture controller.

use crate::model::NodeKind;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Left,
    Middle,
    Right,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Keys the canvas reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Enter,
    Char(char),
}

/// Everything the gesture controller consumes. Positions are screen space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GestureEvent {
    PointerDown {
        position: Point,
        #[serde(default)]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        position: Point,
    },
    PointerUp {
        position: Point,
    },
    /// Pointer capture was lost.
    PointerCancel,
    Wheel {
        position: Point,
        delta_y: f64,
    },
    Key {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Live text while editing a node.
    TextInput {
        text: String,
    },
    /// Text field lost focus.
    TextCommit,
    /// Create a node at a drop point, or at the canvas center when `None`.
    CreateNode {
        node_type: NodeKind,
        #[serde(default)]
        position: Option<Point>,
    },
    ZoomIn,
    ZoomOut,
    ResetZoom,
    FitToView,
    SetViewportSize {
        size: Size,
    },
}

impl GestureEvent {
    /// Plain left-button press.
    pub fn down(position: Point) -> Self {
        GestureEvent::PointerDown {
            position,
            button: PointerButton::Left,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn moved(position: Point) -> Self {
        GestureEvent::PointerMove { position }
    }

    pub fn up(position: Point) -> Self {
        GestureEvent::PointerUp { position }
    }

    /// Key press without modifiers.
    pub fn key(key: Key) -> Self {
        GestureEvent::Key {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Key press with Ctrl held.
    pub fn ctrl(c: char) -> Self {
        GestureEvent::Key {
            key: Key::Char(c),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        }
    }
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME_MS: u128 = 500;
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Detects double-clicks from successive presses.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press; true when it completes a double-click.
    pub fn register(&mut self, position: Point) -> bool {
        self.register_at(position, Instant::now())
    }

    pub fn register_at(&mut self, position: Point, now: Instant) -> bool {
        if let Some((time, last_pos)) = self.last {
            let elapsed = now.duration_since(time).as_millis();
            if elapsed < DOUBLE_CLICK_TIME_MS && (position - last_pos).hypot() < DOUBLE_CLICK_DISTANCE {
                // Reset to prevent triple-click being detected as another double-click
                self.last = None;
                return true;
            }
        }
        self.last = Some((now, position));
        false
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
