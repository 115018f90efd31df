#![allow(dead_code)]

use macrorec_core::error::{CaptureError, InjectionError};
use macrorec_core::{
    CaptureCallback, EventKind, EventRecord, InputSink, InputSource, Key, MacroBuffer,
    MouseButton, SinkFactory,
};
use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

pub type Log = Arc<Mutex<Vec<(EventKind, Instant)>>>;

/// Sink that remembers everything it was asked to inject, and when
pub struct RecordingSink {
    log: Log,
    fail_keys: bool,
}

impl InputSink for RecordingSink {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.push(EventKind::MouseMove { x, y });
        Ok(())
    }

    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError> {
        self.push(EventKind::MouseButton {
            x,
            y,
            button,
            pressed,
        });
        Ok(())
    }

    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError> {
        self.push(EventKind::MouseScroll { x, y, dx, dy });
        Ok(())
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        if self.fail_keys {
            return Err(InjectionError::UnsupportedKey(key));
        }
        self.push(if pressed {
            EventKind::KeyPress { key }
        } else {
            EventKind::KeyRelease { key }
        });
        Ok(())
    }
}

impl RecordingSink {
    fn push(&mut self, kind: EventKind) {
        self.log.lock().unwrap().push((kind, Instant::now()));
    }
}

/// Factory for [`RecordingSink`]s that all write to the returned log
pub fn recording_sink() -> (SinkFactory, Log) {
    sink_with(false)
}

/// Like [`recording_sink`], but every key event fails to inject
pub fn key_failing_sink() -> (SinkFactory, Log) {
    sink_with(true)
}

fn sink_with(fail_keys: bool) -> (SinkFactory, Log) {
    let log: Log = Default::default();
    let shared = Arc::clone(&log);
    let factory: SinkFactory = Arc::new(move || {
        Ok(Box::new(RecordingSink {
            log: Arc::clone(&shared),
            fail_keys,
        }) as Box<dyn InputSink>)
    });
    (factory, log)
}

/// Factory that can never produce a sink
pub fn unavailable_sink() -> SinkFactory {
    Arc::new(|| Err(InjectionError::Unavailable("no display".into())))
}

/// Sink that panics with `message` whenever it is asked to inject anything
pub struct CrashingSink(&'static str);

impl InputSink for CrashingSink {
    fn move_to(&mut self, _x: i32, _y: i32) -> Result<(), InjectionError> {
        panic!("{}", self.0)
    }

    fn button(
        &mut self,
        _x: i32,
        _y: i32,
        _button: MouseButton,
        _pressed: bool,
    ) -> Result<(), InjectionError> {
        panic!("{}", self.0)
    }

    fn scroll(&mut self, _x: i32, _y: i32, _dx: i32, _dy: i32) -> Result<(), InjectionError> {
        panic!("{}", self.0)
    }

    fn key(&mut self, _key: Key, _pressed: bool) -> Result<(), InjectionError> {
        panic!("{}", self.0)
    }
}

pub fn crashing_sink(message: &'static str) -> SinkFactory {
    Arc::new(move || Ok(Box::new(CrashingSink(message)) as Box<dyn InputSink>))
}

/// Source driven by the test through a [`ManualHandle`]
pub struct ManualSource {
    callback: Arc<Mutex<Option<CaptureCallback>>>,
    fail: bool,
}

#[derive(Clone)]
pub struct ManualHandle {
    callback: Arc<Mutex<Option<CaptureCallback>>>,
}

impl ManualSource {
    pub fn new() -> (Self, ManualHandle) {
        Self::build(false)
    }

    pub fn failing() -> (Self, ManualHandle) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Self, ManualHandle) {
        let callback: Arc<Mutex<Option<CaptureCallback>>> = Default::default();
        let handle = ManualHandle {
            callback: Arc::clone(&callback),
        };
        (Self { callback, fail }, handle)
    }
}

impl InputSource for ManualSource {
    fn subscribe(&mut self, callback: CaptureCallback) -> Result<(), CaptureError> {
        if self.fail {
            return Err(CaptureError::Subscription("permission denied".into()));
        }
        *self.callback.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.callback.lock().unwrap().take();
    }
}

impl ManualHandle {
    /// Deliver an event observed at `at`. Returns false if nobody is subscribed.
    pub fn emit_at(&self, kind: EventKind, at: Instant) -> bool {
        let callback = self.callback.lock().unwrap().clone();
        match callback {
            Some(callback) => {
                callback(kind, at);
                true
            }
            None => false,
        }
    }

    pub fn emit(&self, kind: EventKind) -> bool {
        self.emit_at(kind, Instant::now())
    }

    pub fn is_subscribed(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }
}

pub fn mouse_move(x: i32, y: i32) -> EventKind {
    EventKind::MouseMove { x, y }
}

pub fn key_press(c: char) -> EventKind {
    EventKind::KeyPress { key: Key::layout(c) }
}

pub fn key_release(c: char) -> EventKind {
    EventKind::KeyRelease { key: Key::layout(c) }
}

/// Buffer with the given kinds at the given timestamps
pub fn buffer(events: &[(EventKind, f64)]) -> Arc<MacroBuffer> {
    let events = events
        .iter()
        .map(|(kind, t)| EventRecord::new(kind.clone(), *t))
        .collect();
    Arc::new(MacroBuffer::new(events).unwrap())
}
