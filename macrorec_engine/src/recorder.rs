use crate::cancel::lock;
use crate::Timing;
use log::{debug, info};
use macrorec_core::error::RecorderError;
use macrorec_core::{CaptureCallback, EventKind, EventRecord, InputSource, MacroBuffer};
use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

/// Records everything an input source reports into a macro.
///
/// `Idle -> Recording -> Idle`. Callbacks may arrive on any number of threads; appends are
/// serialized by one lock and gated by an atomic "recording" flag.
pub struct Recorder {
    source: Box<dyn InputSource>,
    capture: Arc<Capture>,
}

struct Capture {
    recording: AtomicBool,
    move_interval: f64,
    state: Mutex<CaptureState>,
}

struct CaptureState {
    origin: Instant,
    events: Vec<EventRecord>,
}

impl Capture {
    fn on_event(&self, kind: EventKind, observed: Instant) {
        if !self.recording.load(Ordering::Acquire) {
            return;
        }

        let mut state = lock(&self.state);
        // stop() may have won the race for the lock
        if !self.recording.load(Ordering::Acquire) {
            return;
        }

        let elapsed = observed.saturating_duration_since(state.origin).as_secs_f64();
        let last = state.events.last().map(|e| e.timestamp);
        // callbacks from different threads can be observed slightly out of order
        let timestamp = match last {
            Some(last) if elapsed < last => last,
            _ => elapsed,
        };

        if kind.is_mouse_move() {
            if let Some(last) = last {
                if timestamp - last <= self.move_interval {
                    return;
                }
            }
        }

        state.events.push(EventRecord::new(kind, timestamp));
    }
}

impl Recorder {
    pub fn new(source: Box<dyn InputSource>) -> Self {
        Self::with_move_interval(source, Timing::default().move_interval)
    }

    pub fn with_move_interval(source: Box<dyn InputSource>, move_interval: Duration) -> Self {
        Self {
            source,
            capture: Arc::new(Capture {
                recording: AtomicBool::new(false),
                move_interval: move_interval.as_secs_f64(),
                state: Mutex::new(CaptureState {
                    origin: Instant::now(),
                    events: Vec::new(),
                }),
            }),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.capture.recording.load(Ordering::Acquire)
    }

    /// Number of events captured so far in the current (or last) recording
    pub fn event_count(&self) -> usize {
        lock(&self.capture.state).events.len()
    }

    /// Start a new recording.
    ///
    /// Does nothing and returns [`RecorderError::Busy`] if already recording, leaving the
    /// current recording untouched.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.is_recording() {
            return Err(RecorderError::Busy);
        }

        {
            let mut state = lock(&self.capture.state);
            state.events.clear();
            state.origin = Instant::now();
        }
        self.capture.recording.store(true, Ordering::Release);

        let capture = Arc::clone(&self.capture);
        let callback: CaptureCallback = Arc::new(move |kind, observed| {
            capture.on_event(kind, observed);
        });
        if let Err(e) = self.source.subscribe(callback) {
            self.capture.recording.store(false, Ordering::Release);
            return Err(e.into());
        }

        info!("Recording started");
        Ok(())
    }

    /// Stop recording and hand over what was captured. Returns None if not recording.
    pub fn stop(&mut self) -> Option<MacroBuffer> {
        if !self.capture.recording.swap(false, Ordering::AcqRel) {
            debug!("stop() called while not recording");
            return None;
        }
        self.source.unsubscribe();

        let events = mem::take(&mut lock(&self.capture.state).events);
        let buffer = MacroBuffer::from_capture(events);
        info!(
            "Recording stopped: {} events over {:.2}s",
            buffer.len(),
            buffer.duration().as_secs_f64()
        );
        Some(buffer)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.is_recording() {
            self.capture.recording.store(false, Ordering::Release);
            self.source.unsubscribe();
        }
    }
}
