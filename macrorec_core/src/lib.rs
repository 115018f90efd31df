use std::{sync::Arc, time::Instant};

mod buffer;
pub mod config;
pub mod error;
mod event;
mod key;
pub mod macro_file;
pub mod settings;

pub use buffer::MacroBuffer;
pub use config::{PlaybackConfig, PlaybackMode};
pub use error::{CaptureError, InjectionError};
pub use event::{EventKind, EventRecord, MouseButton};
pub use key::{Key, SpecialKey};
pub use settings::{MemorySettings, SettingValue, Settings};

/// Called by an input source for every normalized event, with the instant it was observed.
///
/// May be called from several threads at once (ex: one for the pointer, one for the keyboard).
pub type CaptureCallback = Arc<dyn Fn(EventKind, Instant) + Send + Sync>;

/// Builds a fresh sink on the thread that will use it. Playback calls this once per run, so
/// backends that are not `Send` can still be used.
pub type SinkFactory = Arc<dyn Fn() -> Result<Box<dyn InputSink>, InjectionError> + Send + Sync>;

/// A live stream of user input (the capture side)
pub trait InputSource: Send {
    /// Start delivering events to `callback`. Replaces any previous subscriber.
    fn subscribe(&mut self, callback: CaptureCallback) -> Result<(), CaptureError>;

    /// Stop delivering events. Safe to call when not subscribed.
    fn unsubscribe(&mut self);
}

/// Something that can turn recorded events back into real input (the injection side)
pub trait InputSink {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError>;
    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError>;
    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError>;
    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError>;

    fn dispatch(&mut self, event: &EventKind) -> Result<(), InjectionError> {
        match *event {
            EventKind::MouseMove { x, y } => self.move_to(x, y),
            EventKind::MouseButton {
                x,
                y,
                button,
                pressed,
            } => self.button(x, y, button, pressed),
            EventKind::MouseScroll { x, y, dx, dy } => self.scroll(x, y, dx, dy),
            EventKind::KeyPress { key } => self.key(key, true),
            EventKind::KeyRelease { key } => self.key(key, false),
        }
    }
}
