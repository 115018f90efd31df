use crate::cancel::{lock, CancelToken};
use crate::Timing;
use log::{debug, error, info, warn};
use macrorec_core::error::{ConfigError, PlaybackError};
use macrorec_core::{MacroBuffer, SinkFactory};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

/// Used when an event's offset is too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Replays one macro at a time through a sink, on a background thread.
pub struct PlaybackScheduler {
    sink_factory: SinkFactory,
    timing: Timing,
    shared: Arc<Shared>,
}

struct Shared {
    playing: AtomicBool,
    cancel: Mutex<CancelToken>,
    last_report: Mutex<Option<RunReport>>,
}

/// What happened during one replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Events handed to the sink successfully
    pub dispatched: usize,
    /// Events the sink failed to inject
    pub failed: usize,
    /// The run was stopped before the last event
    pub cancelled: bool,
    /// The sink could not be created, so nothing was replayed
    pub sink_error: Option<String>,
    /// The replay panicked with this message
    pub panic: Option<String>,
}

/// Clears the playing flag however the replay thread exits
struct PlayingGuard(Arc<Shared>);

impl Drop for PlayingGuard {
    fn drop(&mut self) {
        self.0.playing.store(false, Ordering::Release);
    }
}

impl PlaybackScheduler {
    pub fn new(sink_factory: SinkFactory) -> Self {
        Self::with_timing(sink_factory, Timing::default())
    }

    pub fn with_timing(sink_factory: SinkFactory, timing: Timing) -> Self {
        Self {
            sink_factory,
            timing,
            shared: Arc::new(Shared {
                playing: AtomicBool::new(false),
                cancel: Mutex::new(CancelToken::new()),
                last_report: Mutex::new(None),
            }),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Report of the most recent finished run. None while a run is in progress.
    pub fn last_report(&self) -> Option<RunReport> {
        lock(&self.shared.last_report).clone()
    }

    /// Start replaying `buffer` at `speed` times real time and return immediately.
    ///
    /// Fails without side effects when the speed is not positive or a replay is already
    /// running. An empty buffer finishes immediately without starting a thread.
    pub fn play(&self, buffer: Arc<MacroBuffer>, speed: f64) -> Result<(), PlaybackError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ConfigError::NonPositiveSpeed(speed).into());
        }
        // held until the new token is installed, so a concurrent stop() can't miss this run
        let mut current = lock(&self.shared.cancel);
        if self
            .shared
            .playing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PlaybackError::Busy);
        }

        if buffer.is_empty() {
            *lock(&self.shared.last_report) = Some(RunReport::default());
            self.shared.playing.store(false, Ordering::Release);
            debug!("Nothing to replay");
            return Ok(());
        }

        let token = CancelToken::new();
        *current = token.clone();
        drop(current);
        *lock(&self.shared.last_report) = None;

        let guard = PlayingGuard(Arc::clone(&self.shared));
        let sink_factory = Arc::clone(&self.sink_factory);
        let timing = self.timing;
        let spawned = thread::Builder::new()
            .name("macrorec-replay".into())
            .spawn(move || {
                let guard = guard;
                let report = panic::catch_unwind(AssertUnwindSafe(|| {
                    replay(&buffer, speed, &sink_factory, &token, &timing)
                }))
                .unwrap_or_else(|payload| {
                    let reason = panic_message(payload.as_ref());
                    error!("Replay panicked: {}", reason);
                    RunReport {
                        panic: Some(reason),
                        ..RunReport::default()
                    }
                });
                *lock(&guard.0.last_report) = Some(report);
            });

        // a failed spawn drops the closure, and the guard with it
        spawned.map(|_| ()).map_err(PlaybackError::Spawn)
    }

    /// Ask the current replay to stop. Returns without waiting; does nothing when idle.
    pub fn stop(&self) {
        lock(&self.shared.cancel).cancel();
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn replay(
    buffer: &MacroBuffer,
    speed: f64,
    sink_factory: &SinkFactory,
    token: &CancelToken,
    timing: &Timing,
) -> RunReport {
    let mut report = RunReport::default();
    let mut sink = match sink_factory() {
        Ok(sink) => sink,
        Err(e) => {
            error!("Could not open input sink: {}", e);
            report.sink_error = Some(e.to_string());
            return report;
        }
    };

    info!("Replaying {} events at {}x", buffer.len(), speed);
    let start = Instant::now();
    for (index, event) in buffer.events().iter().enumerate() {
        if token.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let offset = Duration::try_from_secs_f64(event.timestamp / speed).unwrap_or(FAR_FUTURE);
        let target = start
            .checked_add(offset)
            .unwrap_or_else(|| start + FAR_FUTURE);
        // late events go out immediately, without waiting
        if Instant::now() < target && token.wait_until(target, timing.max_wait_slice) {
            report.cancelled = true;
            break;
        }

        match sink.dispatch(&event.kind) {
            Ok(()) => report.dispatched += 1,
            Err(e) => {
                warn!(
                    "Could not inject {} event #{}: {}",
                    event.kind.type_name(),
                    index,
                    e
                );
                report.failed += 1;
            }
        }
    }

    debug!(
        "Replay finished after {:.2}s: {:?}",
        start.elapsed().as_secs_f64(),
        report
    );
    report
}
