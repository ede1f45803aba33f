//! Input events.
//!
//! The platform layer turns its native events into [`InputEvent`]s and feeds them to the
//! [`Host`](crate::Host). Pointer locations are in window coordinates, with the origin at the top
//! left corner of the window’s content area and positive y pointing down.

use crate::window::WindowId;
use cgmath::{Point2, Vector2};

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    X1,
    X2,
}

/// Modifier key state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    /// Whether any shift key is pressed.
    pub shift: bool,

    /// Whether any control key is pressed.
    pub control: bool,

    /// Whether any option key or alt key is pressed.
    pub option: bool,

    /// Whether any command key or meta key is pressed.
    pub command: bool,
}

impl KeyModifiers {
    pub const NONE: KeyModifiers = KeyModifiers {
        shift: false,
        control: false,
        option: false,
        command: false,
    };

    pub const SHIFT: KeyModifiers = KeyModifiers {
        shift: true,
        control: false,
        option: false,
        command: false,
    };
}

/// Keyboard layout-independent identifiers for keyboard keys.
///
/// Keys without a dedicated variant arrive as `Other` with the platform’s scan code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    N0,
    N1,
    N2,
    N3,
    N4,
    N5,
    N6,
    N7,
    N8,
    N9,
    Return,
    Tab,
    Space,
    Backspace,
    Delete,
    Escape,
    Shift,
    Control,
    Option,
    Command,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Other(u32),
}

impl KeyCode {
    /// The focus direction associated with an arrow key.
    pub fn direction(self) -> Option<Direction> {
        match self {
            KeyCode::Left => Some(Direction::Left),
            KeyCode::Right => Some(Direction::Right),
            KeyCode::Up => Some(Direction::Up),
            KeyCode::Down => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Directions for spatial focus movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A touch sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    /// Identifies the finger for the duration of the touch.
    pub finger: u64,

    /// Touch location.
    pub position: Point2<f64>,

    /// Distance moved since the previous sample; zero for touch-down and touch-up.
    pub distance: Vector2<f64>,

    /// Touch pressure, between 0 and 1. Devices without pressure report 1.
    pub pressure: f64,
}

/// A raw input event, addressed to a window.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MouseDown {
        window: WindowId,
        button: MouseButton,
        position: Point2<f64>,
    },
    MouseUp {
        window: WindowId,
        button: MouseButton,
        position: Point2<f64>,
    },
    MouseMovement {
        window: WindowId,
        position: Point2<f64>,
    },
    /// A wheel event. The delta is in wheel steps.
    MouseWheel {
        window: WindowId,
        position: Point2<f64>,
        delta: Vector2<i32>,
    },
    KeyDown {
        window: WindowId,
        key: KeyCode,
        modifiers: KeyModifiers,
        repeat: bool,
    },
    KeyUp {
        window: WindowId,
        key: KeyCode,
        modifiers: KeyModifiers,
        repeat: bool,
    },
    TextInput {
        window: WindowId,
        text: String,
    },
    TouchDown {
        window: WindowId,
        touch: Touch,
    },
    TouchUp {
        window: WindowId,
        touch: Touch,
    },
    TouchMovement {
        window: WindowId,
        touch: Touch,
    },
}

impl InputEvent {
    /// The window the event is addressed to.
    pub fn window(&self) -> WindowId {
        match self {
            InputEvent::MouseDown { window, .. }
            | InputEvent::MouseUp { window, .. }
            | InputEvent::MouseMovement { window, .. }
            | InputEvent::MouseWheel { window, .. }
            | InputEvent::KeyDown { window, .. }
            | InputEvent::KeyUp { window, .. }
            | InputEvent::TextInput { window, .. }
            | InputEvent::TouchDown { window, .. }
            | InputEvent::TouchUp { window, .. }
            | InputEvent::TouchMovement { window, .. } => *window,
        }
    }
}
