//! Injects input with each platform's own API: `SendInput` on Windows, Core Graphics on macOS.
//!
//! Elsewhere [`NativeInjector::new`] fails with [`InjectionError::Unavailable`]; use the
//! enigo backend instead.

mod geometry;
mod vk;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod windows;

pub use geometry::{ScreenGeometry, NORMALIZED_MAX};
pub use vk::{virtual_key, VirtualKey};

use macrorec_core::error::InjectionError;
use macrorec_core::{InputSink, Key, MouseButton};

#[cfg(target_os = "macos")]
type Platform = macos::MacInjector;
#[cfg(windows)]
type Platform = windows::WindowsInjector;

pub struct NativeInjector {
    #[cfg(any(windows, target_os = "macos"))]
    inner: Platform,
}

impl NativeInjector {
    #[cfg(any(windows, target_os = "macos"))]
    pub fn new() -> Result<Self, InjectionError> {
        Ok(Self {
            inner: Platform::new()?,
        })
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    pub fn new() -> Result<Self, InjectionError> {
        Err(InjectionError::Unavailable(format!(
            "native injection is not supported on {}",
            std::env::consts::OS
        )))
    }

    /// Whether this platform has a native backend at all
    pub fn is_supported() -> bool {
        cfg!(any(windows, target_os = "macos"))
    }
}

#[cfg(any(windows, target_os = "macos"))]
impl InputSink for NativeInjector {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.inner.move_to(x, y)
    }

    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError> {
        self.inner.button(x, y, button, pressed)
    }

    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError> {
        self.inner.scroll(x, y, dx, dy)
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        self.inner.key(key, pressed)
    }
}

// never constructed: new() always fails here
#[cfg(not(any(windows, target_os = "macos")))]
impl InputSink for NativeInjector {
    fn move_to(&mut self, _x: i32, _y: i32) -> Result<(), InjectionError> {
        Err(unsupported())
    }

    fn button(
        &mut self,
        _x: i32,
        _y: i32,
        _button: MouseButton,
        _pressed: bool,
    ) -> Result<(), InjectionError> {
        Err(unsupported())
    }

    fn scroll(&mut self, _x: i32, _y: i32, _dx: i32, _dy: i32) -> Result<(), InjectionError> {
        Err(unsupported())
    }

    fn key(&mut self, _key: Key, _pressed: bool) -> Result<(), InjectionError> {
        Err(unsupported())
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
fn unsupported() -> InjectionError {
    InjectionError::Unavailable(std::env::consts::OS.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(any(windows, target_os = "macos")))]
    fn unavailable_off_windows_and_macos() {
        assert!(!NativeInjector::is_supported());
        assert!(matches!(
            NativeInjector::new(),
            Err(InjectionError::Unavailable(_))
        ));
    }
}
