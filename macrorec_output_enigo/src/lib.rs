use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use log::debug;
use macrorec_core::error::InjectionError;
use macrorec_core::{InputSink, Key, MouseButton, SpecialKey};

/// Injects input through enigo. Works wherever enigo does, at the cost of some precision
/// (ex: left and right modifiers are not told apart).
pub struct EnigoInjector {
    enigo: Enigo,
}

impl EnigoInjector {
    pub fn new() -> Result<Self, InjectionError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| InjectionError::Unavailable(e.to_string()))?;
        debug!("Created enigo injector");
        Ok(Self { enigo })
    }
}

impl InputSink for EnigoInjector {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(backend_error)
    }

    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError> {
        self.move_to(x, y)?;
        self.enigo
            .button(from_button(button), direction(pressed))
            .map_err(backend_error)
    }

    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError> {
        self.move_to(x, y)?;
        // enigo scrolls down for positive lengths, recorded deltas are positive upwards
        if dy != 0 {
            self.enigo
                .scroll(dy.saturating_neg(), Axis::Vertical)
                .map_err(backend_error)?;
        }
        if dx != 0 {
            self.enigo
                .scroll(dx, Axis::Horizontal)
                .map_err(backend_error)?;
        }
        Ok(())
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        self.enigo
            .key(from_key(key)?, direction(pressed))
            .map_err(backend_error)
    }
}

fn backend_error(e: enigo::InputError) -> InjectionError {
    InjectionError::Backend(e.to_string())
}

fn direction(pressed: bool) -> Direction {
    if pressed {
        Direction::Press
    } else {
        Direction::Release
    }
}

fn from_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
    }
}

/// Keys enigo supports on every platform. Sided modifiers collapse to the generic ones.
fn from_key(key: Key) -> Result<enigo::Key, InjectionError> {
    let special = match key {
        Key::Layout(c) => return Ok(enigo::Key::Unicode(c)),
        Key::Special(special) => special,
    };

    Ok(match special {
        SpecialKey::Alt | SpecialKey::AltLeft | SpecialKey::AltRight | SpecialKey::AltGr => {
            enigo::Key::Alt
        }
        SpecialKey::Backspace => enigo::Key::Backspace,
        SpecialKey::CapsLock => enigo::Key::CapsLock,
        SpecialKey::Control | SpecialKey::ControlLeft | SpecialKey::ControlRight => {
            enigo::Key::Control
        }
        SpecialKey::Delete => enigo::Key::Delete,
        SpecialKey::DownArrow => enigo::Key::DownArrow,
        SpecialKey::End => enigo::Key::End,
        SpecialKey::Escape => enigo::Key::Escape,
        SpecialKey::F1 => enigo::Key::F1,
        SpecialKey::F2 => enigo::Key::F2,
        SpecialKey::F3 => enigo::Key::F3,
        SpecialKey::F4 => enigo::Key::F4,
        SpecialKey::F5 => enigo::Key::F5,
        SpecialKey::F6 => enigo::Key::F6,
        SpecialKey::F7 => enigo::Key::F7,
        SpecialKey::F8 => enigo::Key::F8,
        SpecialKey::F9 => enigo::Key::F9,
        SpecialKey::F10 => enigo::Key::F10,
        SpecialKey::F11 => enigo::Key::F11,
        SpecialKey::F12 => enigo::Key::F12,
        SpecialKey::Home => enigo::Key::Home,
        SpecialKey::LeftArrow => enigo::Key::LeftArrow,
        SpecialKey::Meta | SpecialKey::MetaLeft | SpecialKey::MetaRight => enigo::Key::Meta,
        SpecialKey::PageDown => enigo::Key::PageDown,
        SpecialKey::PageUp => enigo::Key::PageUp,
        SpecialKey::Return => enigo::Key::Return,
        SpecialKey::RightArrow => enigo::Key::RightArrow,
        SpecialKey::Shift | SpecialKey::ShiftLeft | SpecialKey::ShiftRight => enigo::Key::Shift,
        SpecialKey::Space => enigo::Key::Space,
        SpecialKey::Tab => enigo::Key::Tab,
        SpecialKey::UpArrow => enigo::Key::UpArrow,
        SpecialKey::Insert
        | SpecialKey::Menu
        | SpecialKey::NumLock
        | SpecialKey::Pause
        | SpecialKey::PrintScreen
        | SpecialKey::ScrollLock => return Err(InjectionError::UnsupportedKey(key)),
    })
}
