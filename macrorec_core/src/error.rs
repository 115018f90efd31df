use crate::Key;
use std::path::PathBuf;
use thiserror::Error;

/// The capture hook could not be installed
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not subscribe to system input events: {0}")]
    Subscription(String),
}

/// A single event could not be injected. Playback logs these and moves on.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("input backend is unavailable: {0}")]
    Unavailable(String),
    #[error("input backend rejected the event: {0}")]
    Backend(String),
    #[error("key {0} has no mapping in this backend")]
    UnsupportedKey(Key),
    #[error("character {0:?} cannot be typed with the current keyboard layout")]
    UnmappedCharacter(char),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("playback speed must be a positive number, got {0}")]
    NonPositiveSpeed(f64),
    #[error("interval must be at least one second, got {0}")]
    NonPositiveInterval(u32),
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("already recording")]
    Busy,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback is already running")]
    Busy,
    #[error("invalid playback configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("no macro loaded")]
    EmptyMacro,
    #[error("could not start the playback thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("event {index} has a non-finite timestamp")]
    NonFiniteTimestamp { index: usize },
    #[error("first event starts before the recording ({0}s)")]
    NegativeStart(f64),
    #[error("event {index} at {timestamp}s comes before the previous event at {previous}s")]
    OutOfOrder {
        index: usize,
        timestamp: f64,
        previous: f64,
    },
}

#[derive(Debug, Error)]
pub enum MacroFileError {
    #[error("could not access macro file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed macro file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid macro: {0}")]
    Invalid(#[from] BufferError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("empty key name")]
    Empty,
    #[error("unknown key name {0:?}")]
    Unknown(String),
}
