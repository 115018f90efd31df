use crate::cancel::{lock, CancelToken};
use crate::scheduler::{panic_message, PlaybackScheduler};
use crate::Timing;
use log::{debug, error, info};
use macrorec_core::error::PlaybackError;
use macrorec_core::{MacroBuffer, PlaybackConfig, PlaybackMode, SinkFactory};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc, Mutex,
    },
    thread,
};

/// Repeats a macro according to a [`PlaybackConfig`]: once, N times, forever, or with a
/// pause between runs.
///
/// Progress and completion are reported on the channel returned by [`new`](Self::new).
/// Every successful `play()` produces exactly one [`PlaybackNotification::Finished`].
pub struct PlaybackOrchestrator {
    control: StopHandle,
    timing: Timing,
    notifier: Mutex<Sender<PlaybackNotification>>,
}

/// Lets any thread stop the orchestrator it came from
#[derive(Clone)]
pub struct StopHandle {
    scheduler: Arc<PlaybackScheduler>,
    running: Arc<AtomicBool>,
    cancel: Arc<Mutex<CancelToken>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
    Stopping,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotification {
    Started { mode: PlaybackMode, speed: f64 },
    Progress(PlaybackProgress),
    Finished { completed: u32, outcome: PlaybackOutcome },
}

/// Sent after every completed run
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackProgress {
    pub completed: u32,
    /// None when repeating forever
    pub target: Option<u32>,
    pub speed: f64,
    /// Pause between runs in seconds, when interval mode is on
    pub interval: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl PlaybackOrchestrator {
    pub fn new(sink_factory: SinkFactory) -> (Self, Receiver<PlaybackNotification>) {
        Self::with_timing(sink_factory, Timing::default())
    }

    pub fn with_timing(
        sink_factory: SinkFactory,
        timing: Timing,
    ) -> (Self, Receiver<PlaybackNotification>) {
        let (sender, receiver) = mpsc::channel();
        let orchestrator = Self {
            control: StopHandle {
                scheduler: Arc::new(PlaybackScheduler::with_timing(sink_factory, timing)),
                running: Arc::new(AtomicBool::new(false)),
                cancel: Arc::new(Mutex::new(CancelToken::new())),
            },
            timing,
            notifier: Mutex::new(sender),
        };
        (orchestrator, receiver)
    }

    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PlaybackState {
        self.control.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.control.clone()
    }

    /// Stop the current playback, including the run in progress. No-op when idle.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Start playing `buffer` in the background according to a snapshot of `config`.
    ///
    /// Rejected synchronously (and without any notification) when the config is invalid,
    /// the buffer is empty, or a playback is already running.
    pub fn play(
        &self,
        buffer: Arc<MacroBuffer>,
        config: &PlaybackConfig,
    ) -> Result<(), PlaybackError> {
        let config = *config;
        config.validate()?;
        if buffer.is_empty() {
            return Err(PlaybackError::EmptyMacro);
        }
        if self
            .control
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PlaybackError::Busy);
        }

        let token = CancelToken::new();
        *lock(&self.control.cancel) = token.clone();

        let session = Session {
            buffer,
            config,
            timing: self.timing,
            scheduler: Arc::clone(&self.control.scheduler),
            cancel: token,
            notifier: lock(&self.notifier).clone(),
        };
        let running = Arc::clone(&self.control.running);

        let spawned = thread::Builder::new()
            .name("macrorec-playback".into())
            .spawn(move || session.run(&running));
        if let Err(e) = spawned {
            self.control.running.store(false, Ordering::Release);
            return Err(PlaybackError::Spawn(e));
        }
        Ok(())
    }
}

impl StopHandle {
    pub fn stop(&self) {
        if self.running.load(Ordering::Acquire) {
            info!("Stopping playback");
        }
        lock(&self.cancel).cancel();
        self.scheduler.stop();
    }

    pub fn state(&self) -> PlaybackState {
        if !self.running.load(Ordering::Acquire) {
            PlaybackState::Idle
        } else if lock(&self.cancel).is_cancelled() {
            PlaybackState::Stopping
        } else {
            PlaybackState::Running
        }
    }
}

/// Everything the background thread needs for one `play()`
struct Session {
    buffer: Arc<MacroBuffer>,
    config: PlaybackConfig,
    timing: Timing,
    scheduler: Arc<PlaybackScheduler>,
    cancel: CancelToken,
    notifier: Sender<PlaybackNotification>,
}

impl Session {
    fn run(self, running: &AtomicBool) {
        info!(
            "Playback started: {} at {}x",
            self.config.mode(),
            self.config.speed
        );
        self.notify(PlaybackNotification::Started {
            mode: self.config.mode(),
            speed: self.config.speed,
        });

        let mut completed = 0;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.repeat(&mut completed)))
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Playback thread panicked: {}", reason);
                PlaybackOutcome::Failed(reason)
            }
        };

        // never leave a replay running behind us
        self.scheduler.stop();
        running.store(false, Ordering::Release);

        info!(
            "Playback finished after {} repetitions: {:?}",
            completed, outcome
        );
        self.notify(PlaybackNotification::Finished { completed, outcome });
    }

    fn repeat(&self, completed: &mut u32) -> PlaybackOutcome {
        let config = &self.config;
        loop {
            if self.cancel.is_cancelled() {
                return PlaybackOutcome::Cancelled;
            }

            if let Err(e) = self.scheduler.play(Arc::clone(&self.buffer), config.speed) {
                return PlaybackOutcome::Failed(e.to_string());
            }
            self.wait_for_run();

            match self.scheduler.last_report() {
                None => return PlaybackOutcome::Failed("replay thread stopped unexpectedly".into()),
                Some(report) => {
                    if let Some(reason) = report.sink_error {
                        return PlaybackOutcome::Failed(reason);
                    }
                    if let Some(reason) = report.panic {
                        return PlaybackOutcome::Failed(format!("replay panicked: {}", reason));
                    }
                    if report.cancelled || self.cancel.is_cancelled() {
                        return PlaybackOutcome::Cancelled;
                    }
                }
            }

            *completed += 1;
            debug!("Run {} complete", completed);
            self.notify(PlaybackNotification::Progress(PlaybackProgress {
                completed: *completed,
                target: config.target(),
                speed: config.speed,
                interval: config.interval_enabled.then_some(config.interval_seconds),
            }));

            if let Some(target) = config.target() {
                if *completed >= target {
                    return PlaybackOutcome::Completed;
                }
            }

            let cancelled = if config.interval_enabled {
                self.cancel.wait_for(
                    self.timing.interval_unit * config.interval_seconds,
                    self.timing.interval_slice,
                )
            } else {
                self.cancel
                    .wait_for(self.timing.loop_yield, self.timing.loop_yield)
            };
            if cancelled {
                return PlaybackOutcome::Cancelled;
            }
        }
    }

    /// Block until the scheduler's run ends, forwarding a cancellation into it
    fn wait_for_run(&self) {
        while self.scheduler.is_playing() {
            if self.cancel.is_cancelled() {
                self.scheduler.stop();
                thread::sleep(self.timing.run_poll);
            } else {
                self.cancel
                    .wait_for(self.timing.run_poll, self.timing.run_poll);
            }
        }
    }

    fn notify(&self, notification: PlaybackNotification) {
        if self.notifier.send(notification).is_err() {
            debug!("Playback notification dropped: nobody is listening");
        }
    }
}

impl fmt::Display for PlaybackProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(interval) = self.interval {
            write!(f, "Interval {}s | ", interval)?;
        }
        match self.target {
            Some(target) => write!(f, "Rep. {}/{}", self.completed, target)?,
            None => write!(f, "Rep. {} (infinite)", self.completed)?,
        }
        write!(f, " at {}x", self.speed)
    }
}
