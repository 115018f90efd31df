//! Which key a keyboard event refers to

use crate::error::KeyParseError;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

/// A key as recorded in a macro.
///
/// Serialized as a plain string: the canonical name of a special key (ex: "space", "shift_r")
/// or the literal character for everything else (ex: "a", "7", "/").
#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Special(SpecialKey),
    Layout(char), // literal key (ex: "a", "b", etc.)
}

#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq)]
pub enum SpecialKey {
    Alt,
    AltGr,
    AltLeft,
    AltRight,
    Backspace,
    CapsLock,
    Control,
    ControlLeft,
    ControlRight,
    Delete,
    DownArrow,
    End,
    Escape,
    F1,
    F10,
    F11,
    F12,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    Home,
    Insert,
    LeftArrow,
    Menu,
    Meta,
    MetaLeft,
    MetaRight,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Return,
    RightArrow,
    ScrollLock,
    Shift,
    ShiftLeft,
    ShiftRight,
    Space,
    Tab,
    UpArrow,
}

/// Canonical name of every special key. Parsing accepts exactly these (plus a few aliases).
const NAMES: &[(SpecialKey, &str)] = &[
    (SpecialKey::Alt, "alt"),
    (SpecialKey::AltGr, "alt_gr"),
    (SpecialKey::AltLeft, "alt_l"),
    (SpecialKey::AltRight, "alt_r"),
    (SpecialKey::Backspace, "backspace"),
    (SpecialKey::CapsLock, "caps_lock"),
    (SpecialKey::Control, "ctrl"),
    (SpecialKey::ControlLeft, "ctrl_l"),
    (SpecialKey::ControlRight, "ctrl_r"),
    (SpecialKey::Delete, "delete"),
    (SpecialKey::DownArrow, "down"),
    (SpecialKey::End, "end"),
    (SpecialKey::Escape, "esc"),
    (SpecialKey::F1, "f1"),
    (SpecialKey::F2, "f2"),
    (SpecialKey::F3, "f3"),
    (SpecialKey::F4, "f4"),
    (SpecialKey::F5, "f5"),
    (SpecialKey::F6, "f6"),
    (SpecialKey::F7, "f7"),
    (SpecialKey::F8, "f8"),
    (SpecialKey::F9, "f9"),
    (SpecialKey::F10, "f10"),
    (SpecialKey::F11, "f11"),
    (SpecialKey::F12, "f12"),
    (SpecialKey::Home, "home"),
    (SpecialKey::Insert, "insert"),
    (SpecialKey::LeftArrow, "left"),
    (SpecialKey::Menu, "menu"),
    (SpecialKey::Meta, "cmd"),
    (SpecialKey::MetaLeft, "cmd_l"),
    (SpecialKey::MetaRight, "cmd_r"),
    (SpecialKey::NumLock, "num_lock"),
    (SpecialKey::PageDown, "page_down"),
    (SpecialKey::PageUp, "page_up"),
    (SpecialKey::Pause, "pause"),
    (SpecialKey::PrintScreen, "print_screen"),
    (SpecialKey::Return, "enter"),
    (SpecialKey::RightArrow, "right"),
    (SpecialKey::ScrollLock, "scroll_lock"),
    (SpecialKey::Shift, "shift"),
    (SpecialKey::ShiftLeft, "shift_l"),
    (SpecialKey::ShiftRight, "shift_r"),
    (SpecialKey::Space, "space"),
    (SpecialKey::Tab, "tab"),
    (SpecialKey::UpArrow, "up"),
];

/// Other spellings seen in older macro files
const ALIASES: &[(&str, SpecialKey)] = &[
    ("return", SpecialKey::Return),
    ("escape", SpecialKey::Escape),
    ("control", SpecialKey::Control),
    ("ctrl_left", SpecialKey::ControlLeft),
    ("ctrl_right", SpecialKey::ControlRight),
    ("shift_left", SpecialKey::ShiftLeft),
    ("shift_right", SpecialKey::ShiftRight),
    ("cmd_left", SpecialKey::MetaLeft),
    ("cmd_right", SpecialKey::MetaRight),
    ("pageup", SpecialKey::PageUp),
    ("pagedown", SpecialKey::PageDown),
    ("print", SpecialKey::PrintScreen),
];

impl SpecialKey {
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    fn from_name(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(k, _)| *k)
            .or_else(|| ALIASES.iter().find(|(n, _)| *n == name).map(|(_, k)| *k))
    }

    /// Windows virtual-key code
    pub fn vk_code(self) -> u16 {
        match self {
            SpecialKey::Backspace => 0x08,
            SpecialKey::Tab => 0x09,
            SpecialKey::Return => 0x0D,
            SpecialKey::Shift => 0x10,
            SpecialKey::Control => 0x11,
            SpecialKey::Alt => 0x12,
            SpecialKey::Pause => 0x13,
            SpecialKey::CapsLock => 0x14,
            SpecialKey::Escape => 0x1B,
            SpecialKey::Space => 0x20,
            SpecialKey::PageUp => 0x21,
            SpecialKey::PageDown => 0x22,
            SpecialKey::End => 0x23,
            SpecialKey::Home => 0x24,
            SpecialKey::LeftArrow => 0x25,
            SpecialKey::UpArrow => 0x26,
            SpecialKey::RightArrow => 0x27,
            SpecialKey::DownArrow => 0x28,
            SpecialKey::PrintScreen => 0x2C,
            SpecialKey::Insert => 0x2D,
            SpecialKey::Delete => 0x2E,
            SpecialKey::Meta | SpecialKey::MetaLeft => 0x5B,
            SpecialKey::MetaRight => 0x5C,
            SpecialKey::Menu => 0x5D,
            SpecialKey::F1 => 0x70,
            SpecialKey::F2 => 0x71,
            SpecialKey::F3 => 0x72,
            SpecialKey::F4 => 0x73,
            SpecialKey::F5 => 0x74,
            SpecialKey::F6 => 0x75,
            SpecialKey::F7 => 0x76,
            SpecialKey::F8 => 0x77,
            SpecialKey::F9 => 0x78,
            SpecialKey::F10 => 0x79,
            SpecialKey::F11 => 0x7A,
            SpecialKey::F12 => 0x7B,
            SpecialKey::NumLock => 0x90,
            SpecialKey::ScrollLock => 0x91,
            SpecialKey::ShiftLeft => 0xA0,
            SpecialKey::ShiftRight => 0xA1,
            SpecialKey::ControlLeft => 0xA2,
            SpecialKey::ControlRight => 0xA3,
            SpecialKey::AltLeft => 0xA4,
            SpecialKey::AltRight | SpecialKey::AltGr => 0xA5,
        }
    }
}

/// Characters typed by the US layout's punctuation keys, by virtual-key code
const OEM_CHARS: &[(u32, char)] = &[
    (0xBA, ';'),
    (0xBB, '='),
    (0xBC, ','),
    (0xBD, '-'),
    (0xBE, '.'),
    (0xBF, '/'),
    (0xC0, '`'),
    (0xDB, '['),
    (0xDC, '\\'),
    (0xDD, ']'),
    (0xDE, '\''),
    (0x6A, '*'),
    (0x6B, '+'),
    (0x6D, '-'),
    (0x6E, '.'),
    (0x6F, '/'),
];

impl Key {
    pub fn special(key: SpecialKey) -> Self {
        Self::Special(key)
    }

    pub fn layout(c: char) -> Self {
        Self::Layout(c)
    }

    /// Decode a Windows virtual-key code, as stored in the `vkCode` field of older macros.
    ///
    /// Letters come back lowercase and keypad digits as plain digits.
    pub fn from_vk_code(code: u32) -> Option<Self> {
        match code {
            0x30..=0x39 => char::from_u32(code).map(Key::Layout),
            0x41..=0x5A => char::from_u32(code + 0x20).map(Key::Layout),
            0x60..=0x69 => char::from_u32(code - 0x30).map(Key::Layout),
            _ => OEM_CHARS
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, ch)| Key::Layout(*ch))
                .or_else(|| {
                    NAMES
                        .iter()
                        .map(|(key, _)| *key)
                        // 0x5B and 0xA5 are recorded as the sided keys
                        .filter(|key| !matches!(key, SpecialKey::Meta | SpecialKey::AltGr))
                        .find(|key| u32::from(key.vk_code()) == code)
                        .map(Key::Special)
                }),
        }
    }
}

impl FromStr for Key {
    type Err = KeyParseError;

    /// Parses a canonical key name or a single literal character.
    ///
    /// The dotted form written by older recorders ("Key.space") is accepted as well.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (None, _) => return Err(KeyParseError::Empty),
            // a single char is always literal, so "a" and "A" stay distinct
            (Some(c), None) => return Ok(Key::Layout(c)),
            _ => {}
        }

        let name = raw.strip_prefix("Key.").unwrap_or(raw).to_ascii_lowercase();
        SpecialKey::from_name(&name)
            .map(Key::Special)
            .ok_or_else(|| KeyParseError::Unknown(raw.to_owned()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Special(special) => f.write_str(special.name()),
            Key::Layout(c) => write!(f, "{}", c),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = KeyParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}
