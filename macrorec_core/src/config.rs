use crate::error::ConfigError;
use crate::settings::Settings;
use std::fmt;

pub const SPEED_KEY: &str = "speed";
pub const REPEAT_COUNT_KEY: &str = "repeat_count";
pub const INTERVAL_ENABLED_KEY: &str = "interval_enabled";
pub const INTERVAL_SECONDS_KEY: &str = "interval_seconds";

/// How a macro should be replayed.
///
/// `repeat_count` 0 means forever. `interval_seconds` only matters when `interval_enabled`.
/// The orchestrator copies this at the start of each `play()`, so editing the caller's copy
/// never affects a replay already in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub speed: f64,
    pub repeat_count: u32,
    pub interval_enabled: bool,
    pub interval_seconds: u32,
}

/// The replay policy a config resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Once,
    Times(u32),
    Infinite,
    Interval { seconds: u32, target: Option<u32> },
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            repeat_count: 1,
            interval_enabled: false,
            interval_seconds: 5,
        }
    }
}

impl PlaybackConfig {
    pub fn once(speed: f64) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }

    pub fn times(speed: f64, repeat_count: u32) -> Self {
        Self {
            speed,
            repeat_count,
            ..Default::default()
        }
    }

    pub fn interval(speed: f64, repeat_count: u32, interval_seconds: u32) -> Self {
        Self {
            speed,
            repeat_count,
            interval_enabled: true,
            interval_seconds,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::NonPositiveSpeed(self.speed));
        }
        if self.interval_enabled && self.interval_seconds == 0 {
            return Err(ConfigError::NonPositiveInterval(self.interval_seconds));
        }
        Ok(())
    }

    pub fn mode(&self) -> PlaybackMode {
        if self.interval_enabled {
            return PlaybackMode::Interval {
                seconds: self.interval_seconds,
                target: self.target(),
            };
        }
        match self.repeat_count {
            0 => PlaybackMode::Infinite,
            1 => PlaybackMode::Once,
            n => PlaybackMode::Times(n),
        }
    }

    /// Number of runs to perform, `None` for infinite
    pub fn target(&self) -> Option<u32> {
        match self.repeat_count {
            0 => None,
            n => Some(n),
        }
    }

    /// Read a config, falling back to defaults for missing or malformed values
    pub fn from_settings(settings: &dyn Settings) -> Self {
        let defaults = Self::default();
        Self {
            speed: settings.get_number(SPEED_KEY, defaults.speed),
            repeat_count: to_count(
                settings.get_number(REPEAT_COUNT_KEY, defaults.repeat_count.into()),
                defaults.repeat_count,
            ),
            interval_enabled: settings.get_bool(INTERVAL_ENABLED_KEY, defaults.interval_enabled),
            interval_seconds: to_count(
                settings.get_number(INTERVAL_SECONDS_KEY, defaults.interval_seconds.into()),
                defaults.interval_seconds,
            ),
        }
    }

    pub fn store(&self, settings: &mut dyn Settings) {
        settings.set(SPEED_KEY, self.speed.into());
        settings.set(REPEAT_COUNT_KEY, self.repeat_count.into());
        settings.set(INTERVAL_ENABLED_KEY, self.interval_enabled.into());
        settings.set(INTERVAL_SECONDS_KEY, self.interval_seconds.into());
    }
}

fn to_count(n: f64, default: u32) -> u32 {
    if n.is_finite() && n >= 0.0 && n <= u32::MAX as f64 {
        n.round() as u32
    } else {
        default
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Once => write!(f, "once"),
            PlaybackMode::Times(n) => write!(f, "{} times (no pause)", n),
            PlaybackMode::Infinite => write!(f, "infinite (no pause)"),
            PlaybackMode::Interval {
                seconds,
                target: Some(n),
            } => write!(f, "{} times every {}s", n, seconds),
            PlaybackMode::Interval {
                seconds,
                target: None,
            } => write!(f, "every {}s (infinite)", seconds),
        }
    }
}
