//! Injects input natively with Core Graphics events posted at the HID level.

use core_graphics::event::{
    CGEvent, CGEventTapLocation, CGEventType, CGKeyCode, CGMouseButton, KeyCode, ScrollEventUnit,
};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use log::debug;
use macrorec_core::error::InjectionError;
use macrorec_core::{InputSink, Key, MouseButton, SpecialKey};
use std::collections::HashMap;

pub struct MacInjector {
    /// Chars of the current keyboard layout and the keys that type them
    keycodes: HashMap<char, CGKeyCode>,
    /// Moves while a button is held must be sent as drags
    held: Option<MouseButton>,
}

impl MacInjector {
    pub fn new() -> Result<Self, InjectionError> {
        // fails without the Accessibility permission
        source()?;
        let keycodes = build_char_to_keycode_map();
        debug!("Mapped {} characters to key codes", keycodes.len());
        Ok(Self {
            keycodes,
            held: None,
        })
    }

    fn mouse(
        &self,
        event_type: CGEventType,
        x: i32,
        y: i32,
        button: CGMouseButton,
    ) -> Result<(), InjectionError> {
        let point = CGPoint::new(f64::from(x), f64::from(y));
        let event = CGEvent::new_mouse_event(source()?, event_type, point, button)
            .map_err(|_| backend("could not create mouse event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }
}

impl InputSink for MacInjector {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError> {
        let (event_type, button) = match self.held {
            None => (CGEventType::MouseMoved, CGMouseButton::Left),
            Some(MouseButton::Left) => (CGEventType::LeftMouseDragged, CGMouseButton::Left),
            Some(MouseButton::Right) => (CGEventType::RightMouseDragged, CGMouseButton::Right),
            Some(MouseButton::Middle) => (CGEventType::OtherMouseDragged, CGMouseButton::Center),
        };
        self.mouse(event_type, x, y, button)
    }

    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError> {
        let (event_type, cg_button) = match (button, pressed) {
            (MouseButton::Left, true) => (CGEventType::LeftMouseDown, CGMouseButton::Left),
            (MouseButton::Left, false) => (CGEventType::LeftMouseUp, CGMouseButton::Left),
            (MouseButton::Right, true) => (CGEventType::RightMouseDown, CGMouseButton::Right),
            (MouseButton::Right, false) => (CGEventType::RightMouseUp, CGMouseButton::Right),
            (MouseButton::Middle, true) => (CGEventType::OtherMouseDown, CGMouseButton::Center),
            (MouseButton::Middle, false) => (CGEventType::OtherMouseUp, CGMouseButton::Center),
        };
        self.mouse(event_type, x, y, cg_button)?;
        if pressed {
            self.held = Some(button);
        } else if self.held == Some(button) {
            self.held = None;
        }
        Ok(())
    }

    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError> {
        self.move_to(x, y)?;
        let event = CGEvent::new_scroll_event(source()?, ScrollEventUnit::LINE, 2, dy, dx, 0)
            .map_err(|_| backend("could not create scroll event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        let code = match key {
            Key::Special(special) => special_keycode(special)?,
            Key::Layout(c) => match self.keycodes.get(&c) {
                Some(code) => *code,
                None => return type_char(c, pressed),
            },
        };
        let event = CGEvent::new_keyboard_event(source()?, code, pressed)
            .map_err(|_| backend("could not create keyboard event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }
}

fn source() -> Result<CGEventSource, InjectionError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| {
        InjectionError::Unavailable("could not create a Core Graphics event source".into())
    })
}

fn backend(message: &str) -> InjectionError {
    InjectionError::Backend(message.to_owned())
}

/// Types a char that is not on the keyboard layout. Supports UTF-8
fn type_char(c: char, down: bool) -> Result<(), InjectionError> {
    let event = CGEvent::new_keyboard_event(source()?, 0, down)
        .map_err(|_| InjectionError::UnmappedCharacter(c))?;
    let mut buf = [0; 2];
    event.set_string_from_utf16_unchecked(c.encode_utf16(&mut buf));
    event.post(CGEventTapLocation::HID);
    Ok(())
}

fn special_keycode(key: SpecialKey) -> Result<CGKeyCode, InjectionError> {
    Ok(match key {
        SpecialKey::Alt | SpecialKey::AltLeft => KeyCode::OPTION,
        SpecialKey::AltRight | SpecialKey::AltGr => KeyCode::RIGHT_OPTION,
        SpecialKey::Backspace => KeyCode::DELETE,
        SpecialKey::CapsLock => KeyCode::CAPS_LOCK,
        SpecialKey::Control | SpecialKey::ControlLeft => KeyCode::CONTROL,
        SpecialKey::ControlRight => KeyCode::RIGHT_CONTROL,
        SpecialKey::Delete => KeyCode::FORWARD_DELETE,
        SpecialKey::DownArrow => KeyCode::DOWN_ARROW,
        SpecialKey::End => KeyCode::END,
        SpecialKey::Escape => KeyCode::ESCAPE,
        SpecialKey::F1 => KeyCode::F1,
        SpecialKey::F2 => KeyCode::F2,
        SpecialKey::F3 => KeyCode::F3,
        SpecialKey::F4 => KeyCode::F4,
        SpecialKey::F5 => KeyCode::F5,
        SpecialKey::F6 => KeyCode::F6,
        SpecialKey::F7 => KeyCode::F7,
        SpecialKey::F8 => KeyCode::F8,
        SpecialKey::F9 => KeyCode::F9,
        SpecialKey::F10 => KeyCode::F10,
        SpecialKey::F11 => KeyCode::F11,
        SpecialKey::F12 => KeyCode::F12,
        SpecialKey::Home => KeyCode::HOME,
        SpecialKey::LeftArrow => KeyCode::LEFT_ARROW,
        SpecialKey::Meta | SpecialKey::MetaLeft => KeyCode::COMMAND,
        SpecialKey::MetaRight => KeyCode::RIGHT_COMMAND,
        SpecialKey::PageDown => KeyCode::PAGE_DOWN,
        SpecialKey::PageUp => KeyCode::PAGE_UP,
        SpecialKey::Return => KeyCode::RETURN,
        SpecialKey::RightArrow => KeyCode::RIGHT_ARROW,
        SpecialKey::Shift | SpecialKey::ShiftLeft => KeyCode::SHIFT,
        SpecialKey::ShiftRight => KeyCode::RIGHT_SHIFT,
        SpecialKey::Space => KeyCode::SPACE,
        SpecialKey::Tab => KeyCode::TAB,
        SpecialKey::UpArrow => KeyCode::UP_ARROW,
        SpecialKey::Insert
        | SpecialKey::Menu
        | SpecialKey::NumLock
        | SpecialKey::Pause
        | SpecialKey::PrintScreen
        | SpecialKey::ScrollLock => return Err(InjectionError::UnsupportedKey(Key::Special(key))),
    })
}

/// Build a hashmap between the char and its physical key (layout dependent)
fn build_char_to_keycode_map() -> HashMap<char, CGKeyCode> {
    let mut map = HashMap::new();
    // check each key code to see if it represents a char
    for code in 0..128 {
        if let Some(c) = keycode_to_char(code) {
            // keep the lowest code, later ones are usually keypad duplicates
            map.entry(c).or_insert(code);
        }
    }
    map
}

fn keycode_to_char(code: CGKeyCode) -> Option<char> {
    use cocoa::appkit::{NSEvent, NSEventType};
    use cocoa::base::nil;
    use cocoa::foundation::NSString;
    use foreign_types::ForeignType;
    use std::{slice, str};

    let event = CGEvent::new_keyboard_event(source().ok()?, code, true).ok()?;

    // SAFETY: the CGEvent outlives the NSEvent wrapping it, and the UTF-8 buffer is only read
    // while the NSEvent is alive
    unsafe {
        let ns_event = NSEvent::eventWithCGEvent_(nil, event.as_ptr() as *mut core::ffi::c_void);
        if ns_event == nil || ns_event.eventType() != NSEventType::NSKeyDown {
            return None;
        }

        let chars = ns_event.characters();
        if chars == nil {
            return None;
        }
        let bytes = slice::from_raw_parts(chars.UTF8String() as *const u8, chars.len());
        let s = str::from_utf8(bytes).ok()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            // dead keys and keys producing several chars can't be typed by code
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_keys() {
        assert_eq!(special_keycode(SpecialKey::Return).unwrap(), KeyCode::RETURN);
        assert_eq!(
            special_keycode(SpecialKey::ShiftRight).unwrap(),
            KeyCode::RIGHT_SHIFT
        );
        assert!(special_keycode(SpecialKey::PrintScreen).is_err());
    }

    #[test]
    fn keycode_conversion() {
        // NOTE: if you hold down shift while running this test, it will fail
        // on QWERTY layout
        assert_eq!(keycode_to_char(0), Some('a'));
        assert_eq!(keycode_to_char(6), Some('z'));

        // control key
        assert_eq!(keycode_to_char(59), None);
    }
}
