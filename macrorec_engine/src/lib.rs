//! Recording and timed playback of input macros.
//!
//! [`Recorder`] turns a live [`InputSource`](macrorec_core::InputSource) into a
//! [`MacroBuffer`](macrorec_core::MacroBuffer). [`PlaybackScheduler`] replays one buffer
//! through an [`InputSink`](macrorec_core::InputSink) with its original timing, and
//! [`PlaybackOrchestrator`] repeats that according to a
//! [`PlaybackConfig`](macrorec_core::PlaybackConfig).

mod cancel;
mod orchestrator;
mod recorder;
mod scheduler;
mod timing;

pub use cancel::CancelToken;
pub use orchestrator::{
    PlaybackNotification, PlaybackOrchestrator, PlaybackOutcome, PlaybackProgress,
    PlaybackState, StopHandle,
};
pub use recorder::Recorder;
pub use scheduler::{PlaybackScheduler, RunReport};
pub use timing::Timing;
