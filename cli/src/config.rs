use crate::settings::{BACKEND_KEY, MOVE_INTERVAL_KEY};
use anyhow::{anyhow, Result};
use clap::ValueEnum;
use log::info;
use macrorec_core::error::InjectionError;
use macrorec_core::{InputSink, Key, MouseButton, Settings, SinkFactory};
use macrorec_engine::Timing;
use macrorec_output_enigo::EnigoInjector;
use macrorec_output_native::NativeInjector;
use std::{fmt, str::FromStr, sync::Arc, time::Duration};

/// Where played back events go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// The platform's own injection API
    Native,
    /// Cross-platform injection through enigo
    Library,
    /// Print events instead of injecting them
    Stdout,
}

impl Default for Backend {
    fn default() -> Self {
        if NativeInjector::is_supported() {
            Self::Native
        } else {
            Self::Library
        }
    }
}

impl Backend {
    fn name(self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Library => "library",
            Backend::Stdout => "stdout",
        }
    }

    /// Read the backend from the settings. Accepts an override to ignore the settings
    pub fn from_settings(settings: &dyn Settings, override_with: Option<Backend>) -> Result<Self> {
        if let Some(backend) = override_with {
            return Ok(backend);
        }
        let raw = settings.get_text(BACKEND_KEY, Backend::default().name());
        raw.parse()
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Backend::Native),
            "library" | "enigo" => Ok(Backend::Library),
            "stdout" => Ok(Backend::Stdout),
            other => Err(anyhow!(
                "unknown backend {:?}, expected native, library or stdout",
                other
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create the sink factory for an output backend
pub fn get_output_sink(backend: Backend) -> SinkFactory {
    info!("Output to: {}", backend);
    match backend {
        Backend::Native => Arc::new(native_sink),
        Backend::Library => Arc::new(library_sink),
        Backend::Stdout => Arc::new(stdout_sink),
    }
}

fn native_sink() -> Result<Box<dyn InputSink>, InjectionError> {
    Ok(Box::new(NativeInjector::new()?))
}

fn library_sink() -> Result<Box<dyn InputSink>, InjectionError> {
    Ok(Box::new(EnigoInjector::new()?))
}

fn stdout_sink() -> Result<Box<dyn InputSink>, InjectionError> {
    Ok(Box::new(StdoutSink))
}

/// Recording timing, with the pointer move spacing taken from the settings
pub fn timing(settings: &dyn Settings) -> Timing {
    let defaults = Timing::default();
    let default_ms = defaults.move_interval.as_millis() as f64;
    let ms = settings.get_number(MOVE_INTERVAL_KEY, default_ms);
    let move_interval = if ms.is_finite() && (0.0..=60_000.0).contains(&ms) {
        Duration::from_micros((ms * 1000.0).round() as u64)
    } else {
        defaults.move_interval
    };
    Timing {
        move_interval,
        ..defaults
    }
}

/// Prints events instead of injecting them
struct StdoutSink;

impl InputSink for StdoutSink {
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), InjectionError> {
        println!("move to ({}, {})", x, y);
        Ok(())
    }

    fn button(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    ) -> Result<(), InjectionError> {
        let action = if pressed { "press" } else { "release" };
        println!("{} {:?} at ({}, {})", action, button, x, y);
        Ok(())
    }

    fn scroll(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> Result<(), InjectionError> {
        println!("scroll ({}, {}) at ({}, {})", dx, dy, x, y);
        Ok(())
    }

    fn key(&mut self, key: Key, pressed: bool) -> Result<(), InjectionError> {
        let action = if pressed { "press" } else { "release" };
        println!("{} key {}", action, key);
        Ok(())
    }
}
