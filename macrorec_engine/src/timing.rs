use std::time::Duration;

/// Timing knobs for recording and playback.
///
/// The defaults are the values the recorder has always used; they are kept adjustable
/// because none of them is load-bearing for correctness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Pointer moves closer together than this to the previous event are dropped
    pub move_interval: Duration,
    /// Longest uninterrupted sleep while waiting for the next event
    pub max_wait_slice: Duration,
    /// How often the orchestrator checks whether a run has finished
    pub run_poll: Duration,
    /// Pause between back-to-back runs when no interval is configured
    pub loop_yield: Duration,
    /// Longest uninterrupted sleep during an interval pause
    pub interval_slice: Duration,
    /// Length of one "second" of `interval_seconds`
    pub interval_unit: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            move_interval: Duration::from_millis(50),
            max_wait_slice: Duration::from_millis(100),
            run_poll: Duration::from_millis(10),
            loop_yield: Duration::from_millis(50),
            interval_slice: Duration::from_secs(1),
            interval_unit: Duration::from_secs(1),
        }
    }
}
