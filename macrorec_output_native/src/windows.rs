use crate::geometry::ScreenGeometry;
use crate::vk::virtual_key;
use log::debug;
use macrorec_core::error::InjectionError;
use macrorec_core::{InputSink, Key, MouseButton};
use std::mem;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, VkKeyScanW, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE,
    MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

/// One notch of a mouse wheel
const WHEEL_DELTA: i32 = 120;

/// Injects input with `SendInput`. Absolute positions are relative to the primary display.
pub struct WindowsInjector {
    screen: ScreenGeometry,
}

impl WindowsInjector {
    pub fn new() -> Result<Self, InjectionError> {
        // SAFETY: GetSystemMetrics has no preconditions
        let (width, height) =
            unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        if width <= 0 || height <= 0 {
            return Err(InjectionError::Unavailable(
                "could not read the primary display size".into(),
            ));
        }
        debug!("Primary display is {}x{}", width, height);
        Ok(Self {
            screen: ScreenGeometry::new(width, height),
        })
    }

    fn mouse(
        &self,
        x: i32,
        y: i32,
        flags: MOUSE_EVENT_FLAGS,
        data: i32,
    ) -> Result<(), InjectionError> {
        let (dx, dy) = self.screen.normalize(x, y);
        send(&[INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: data as _,
                    dwFlags: MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }])
    }
}

impl InputSink for WindowsInjector {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.mouse(x, y, MOUSE_EVENT_FLAGS(0), 0)
    }

    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError> {
        let flags = match (button, pressed) {
            (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
            (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
            (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
        };
        self.mouse(x, y, flags, 0)
    }

    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError> {
        if dy != 0 {
            self.mouse(x, y, MOUSEEVENTF_WHEEL, dy.saturating_mul(WHEEL_DELTA))?;
        }
        if dx != 0 {
            self.mouse(x, y, MOUSEEVENTF_HWHEEL, dx.saturating_mul(WHEEL_DELTA))?;
        }
        Ok(())
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        let up = if pressed {
            KEYBD_EVENT_FLAGS(0)
        } else {
            KEYEVENTF_KEYUP
        };

        let input = match key {
            Key::Special(special) => {
                let vk = virtual_key(special);
                let extended = if vk.extended {
                    KEYEVENTF_EXTENDEDKEY
                } else {
                    KEYBD_EVENT_FLAGS(0)
                };
                keyboard(VIRTUAL_KEY(vk.code), 0, extended | up)
            }
            Key::Layout(c) => {
                let mut units = [0; 2];
                let unit = match c.encode_utf16(&mut units) {
                    [unit] => *unit,
                    _ => return Err(InjectionError::UnmappedCharacter(c)),
                };
                // SAFETY: VkKeyScanW has no preconditions
                let scan = unsafe { VkKeyScanW(unit) };
                if scan == -1 {
                    // not on the current layout: type the character itself
                    keyboard(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | up)
                } else {
                    keyboard(VIRTUAL_KEY((scan as u16) & 0xFF), 0, up)
                }
            }
        };
        send(&[input])
    }
}

fn keyboard(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), InjectionError> {
    // SAFETY: every INPUT is fully initialized and cbsize matches the struct
    let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(InjectionError::Backend(format!(
            "SendInput accepted {} of {} events: {}",
            sent,
            inputs.len(),
            windows::core::Error::from_win32()
        )))
    }
}
