//! Windows virtual-key codes for the named keys.

use macrorec_core::SpecialKey;

/// A virtual-key code, and whether it has to be sent with the extended-key flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualKey {
    pub code: u16,
    pub extended: bool,
}

pub fn virtual_key(key: SpecialKey) -> VirtualKey {
    VirtualKey {
        code: key.vk_code(),
        extended: is_extended(key),
    }
}

fn is_extended(key: SpecialKey) -> bool {
    matches!(
        key,
        SpecialKey::PageUp
            | SpecialKey::PageDown
            | SpecialKey::End
            | SpecialKey::Home
            | SpecialKey::LeftArrow
            | SpecialKey::UpArrow
            | SpecialKey::RightArrow
            | SpecialKey::DownArrow
            | SpecialKey::PrintScreen
            | SpecialKey::Insert
            | SpecialKey::Delete
            | SpecialKey::Meta
            | SpecialKey::MetaLeft
            | SpecialKey::MetaRight
            | SpecialKey::Menu
            | SpecialKey::NumLock
            | SpecialKey::ControlRight
            | SpecialKey::AltRight
            | SpecialKey::AltGr
    )
}
