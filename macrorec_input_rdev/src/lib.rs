//! Captures system-wide mouse and keyboard input with rdev.

#[macro_use]
extern crate lazy_static;

use log::{debug, error, info};
use macrorec_core::error::CaptureError;
use macrorec_core::{CaptureCallback, EventKind, InputSource, Key, MouseButton, SpecialKey};
use rdev::{Button, Event, EventType};
use std::{
    sync::{
        mpsc::{self, RecvTimeoutError},
        Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

/// How long to wait for the OS hook to report a startup failure
const STARTUP_GRACE: Duration = Duration::from_millis(250);

/// Runs the OS hook on the calling thread. Only returns once the hook is gone.
type Listen = fn() -> Result<(), String>;

/// Where the single process-wide rdev listener sends its events
#[derive(Default)]
struct Hub {
    subscriber: Option<CaptureCallback>,
    /// Last pointer position, for events that don't carry one
    position: (i32, i32),
    listening: bool,
}

lazy_static! {
    // rdev can only be started once per process and never stops, so all sources share it
    static ref HUB: Mutex<Hub> = Mutex::new(Hub::default());
}

fn hub() -> MutexGuard<'static, Hub> {
    HUB.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Input source backed by the OS-level hook in rdev.
///
/// Only one source receives events at a time: subscribing replaces the previous subscriber.
/// On macOS the process needs the Accessibility permission, otherwise subscribing fails.
#[derive(Debug, Default)]
pub struct RdevSource {
    subscribed: bool,
}

impl RdevSource {
    pub fn new() -> Self {
        Default::default()
    }

    fn subscribe_with(
        &mut self,
        callback: CaptureCallback,
        listen: Listen,
    ) -> Result<(), CaptureError> {
        let start_listener = {
            let mut hub = hub();
            hub.subscriber = Some(callback);
            !std::mem::replace(&mut hub.listening, true)
        };
        self.subscribed = true;

        if start_listener {
            if let Err(e) = start_listener_thread(listen) {
                let mut hub = hub();
                hub.subscriber = None;
                hub.listening = false;
                self.subscribed = false;
                return Err(e);
            }
        }
        debug!("Subscribed to system input");
        Ok(())
    }
}

impl InputSource for RdevSource {
    fn subscribe(&mut self, callback: CaptureCallback) -> Result<(), CaptureError> {
        self.subscribe_with(callback, listen_system)
    }

    fn unsubscribe(&mut self) {
        if self.subscribed {
            hub().subscriber = None;
            self.subscribed = false;
            debug!("Unsubscribed from system input");
        }
    }
}

impl Drop for RdevSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

fn listen_system() -> Result<(), String> {
    rdev::listen(handle_event).map_err(|e| format!("{:?}", e))
}

fn start_listener_thread(listen: Listen) -> Result<(), CaptureError> {
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("macrorec-capture".into())
        .spawn(move || {
            let reason = match listen() {
                Ok(()) => "listener exited".to_owned(),
                Err(e) => e,
            };
            listener_stopped(&reason);
            // the subscriber may already have given up waiting
            let _ = sender.send(reason);
        })
        .map_err(|e| CaptureError::Subscription(e.to_string()))?;

    match receiver.recv_timeout(STARTUP_GRACE) {
        Err(RecvTimeoutError::Timeout) => {
            info!("Listening to system input");
            Ok(())
        }
        Ok(reason) => Err(CaptureError::Subscription(reason)),
        Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Subscription(
            "listener thread exited".to_owned(),
        )),
    }
}

/// The hook is gone: drop the subscriber so the next subscribe starts a new listener
fn listener_stopped(reason: &str) {
    error!("System input listener stopped: {}", reason);
    let mut hub = hub();
    hub.listening = false;
    hub.subscriber = None;
}

fn handle_event(event: Event) {
    deliver(&event.event_type, Instant::now());
}

/// Translate an event and pass it to the current subscriber, if any
fn deliver(event_type: &EventType, observed: Instant) {
    let (kind, subscriber) = {
        let mut hub = hub();
        let kind = translate(&mut hub.position, event_type);
        (kind, hub.subscriber.clone())
    };

    // call outside the lock, subscribers may take their time
    if let (Some(kind), Some(subscriber)) = (kind, subscriber) {
        subscriber(kind, observed);
    }
}

/// Convert an rdev event into an [`EventKind`], tracking the pointer position in `position`.
///
/// Returns None for events that have no counterpart (ex: extra mouse buttons, unknown keys).
fn translate(position: &mut (i32, i32), event_type: &EventType) -> Option<EventKind> {
    let (x, y) = *position;
    match *event_type {
        EventType::MouseMove { x, y } => {
            *position = (round(x), round(y));
            Some(EventKind::MouseMove {
                x: position.0,
                y: position.1,
            })
        }
        EventType::ButtonPress(button) => map_button(button).map(|button| EventKind::MouseButton {
            x,
            y,
            button,
            pressed: true,
        }),
        EventType::ButtonRelease(button) => {
            map_button(button).map(|button| EventKind::MouseButton {
                x,
                y,
                button,
                pressed: false,
            })
        }
        EventType::Wheel { delta_x, delta_y } => Some(EventKind::MouseScroll {
            x,
            y,
            dx: clamp(delta_x),
            dy: clamp(delta_y),
        }),
        EventType::KeyPress(key) => map_key(key).map(|key| EventKind::KeyPress { key }),
        EventType::KeyRelease(key) => map_key(key).map(|key| EventKind::KeyRelease { key }),
    }
}

fn round(v: f64) -> i32 {
    v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

fn clamp(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn map_button(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(code) => {
            debug!("Ignoring mouse button {}", code);
            None
        }
    }
}

/// Map a physical key to the key it produces on an unshifted US layout
fn map_key(key: rdev::Key) -> Option<Key> {
    use rdev::Key as K;

    let special = match key {
        K::Alt => SpecialKey::AltLeft,
        K::AltGr => SpecialKey::AltGr,
        K::Backspace => SpecialKey::Backspace,
        K::CapsLock => SpecialKey::CapsLock,
        K::ControlLeft => SpecialKey::ControlLeft,
        K::ControlRight => SpecialKey::ControlRight,
        K::Delete | K::KpDelete => SpecialKey::Delete,
        K::DownArrow => SpecialKey::DownArrow,
        K::End => SpecialKey::End,
        K::Escape => SpecialKey::Escape,
        K::F1 => SpecialKey::F1,
        K::F2 => SpecialKey::F2,
        K::F3 => SpecialKey::F3,
        K::F4 => SpecialKey::F4,
        K::F5 => SpecialKey::F5,
        K::F6 => SpecialKey::F6,
        K::F7 => SpecialKey::F7,
        K::F8 => SpecialKey::F8,
        K::F9 => SpecialKey::F9,
        K::F10 => SpecialKey::F10,
        K::F11 => SpecialKey::F11,
        K::F12 => SpecialKey::F12,
        K::Home => SpecialKey::Home,
        K::LeftArrow => SpecialKey::LeftArrow,
        K::MetaLeft => SpecialKey::MetaLeft,
        K::MetaRight => SpecialKey::MetaRight,
        K::PageDown => SpecialKey::PageDown,
        K::PageUp => SpecialKey::PageUp,
        K::Return | K::KpReturn => SpecialKey::Return,
        K::RightArrow => SpecialKey::RightArrow,
        K::ShiftLeft => SpecialKey::ShiftLeft,
        K::ShiftRight => SpecialKey::ShiftRight,
        K::Space => SpecialKey::Space,
        K::Tab => SpecialKey::Tab,
        K::UpArrow => SpecialKey::UpArrow,
        K::PrintScreen => SpecialKey::PrintScreen,
        K::ScrollLock => SpecialKey::ScrollLock,
        K::Pause => SpecialKey::Pause,
        K::NumLock => SpecialKey::NumLock,
        K::Insert => SpecialKey::Insert,
        other => return layout_char(other).map(Key::Layout),
    };
    Some(Key::Special(special))
}

fn layout_char(key: rdev::Key) -> Option<char> {
    use rdev::Key as K;

    let c = match key {
        K::BackQuote => '`',
        K::Num1 | K::Kp1 => '1',
        K::Num2 | K::Kp2 => '2',
        K::Num3 | K::Kp3 => '3',
        K::Num4 | K::Kp4 => '4',
        K::Num5 | K::Kp5 => '5',
        K::Num6 | K::Kp6 => '6',
        K::Num7 | K::Kp7 => '7',
        K::Num8 | K::Kp8 => '8',
        K::Num9 | K::Kp9 => '9',
        K::Num0 | K::Kp0 => '0',
        K::Minus | K::KpMinus => '-',
        K::Equal => '=',
        K::KpPlus => '+',
        K::KpMultiply => '*',
        K::KpDivide | K::Slash => '/',
        K::KeyQ => 'q',
        K::KeyW => 'w',
        K::KeyE => 'e',
        K::KeyR => 'r',
        K::KeyT => 't',
        K::KeyY => 'y',
        K::KeyU => 'u',
        K::KeyI => 'i',
        K::KeyO => 'o',
        K::KeyP => 'p',
        K::LeftBracket => '[',
        K::RightBracket => ']',
        K::KeyA => 'a',
        K::KeyS => 's',
        K::KeyD => 'd',
        K::KeyF => 'f',
        K::KeyG => 'g',
        K::KeyH => 'h',
        K::KeyJ => 'j',
        K::KeyK => 'k',
        K::KeyL => 'l',
        K::SemiColon => ';',
        K::Quote => '\'',
        K::BackSlash | K::IntlBackslash => '\\',
        K::KeyZ => 'z',
        K::KeyX => 'x',
        K::KeyC => 'c',
        K::KeyV => 'v',
        K::KeyB => 'b',
        K::KeyN => 'n',
        K::KeyM => 'm',
        K::Comma => ',',
        K::Dot => '.',
        other => {
            debug!("Ignoring key {:?}", other);
            return None;
        }
    };
    Some(c)
}
