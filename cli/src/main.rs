use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, warn};
use macrorec_core::config::{
    INTERVAL_ENABLED_KEY, INTERVAL_SECONDS_KEY, REPEAT_COUNT_KEY, SPEED_KEY,
};
use macrorec_core::{macro_file, PlaybackConfig, SettingValue, Settings};
use macrorec_engine::{PlaybackNotification, PlaybackOrchestrator, PlaybackOutcome, Recorder};
use macrorec_input_rdev::RdevSource;
use std::{
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
};

mod config;
mod settings;

use config::Backend;
use settings::{SettingsFile, BACKEND_KEY, MOVE_INTERVAL_KEY};

/// Every key `set` accepts
const KNOWN_KEYS: &[&str] = &[
    SPEED_KEY,
    REPEAT_COUNT_KEY,
    INTERVAL_ENABLED_KEY,
    INTERVAL_SECONDS_KEY,
    BACKEND_KEY,
    MOVE_INTERVAL_KEY,
];

/// Record mouse and keyboard input and play it back
#[derive(Debug, Parser)]
#[command(name = "macrorec", version)]
struct Cli {
    /// Log every event (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Settings file to use instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record a macro until Enter or Ctrl-C is pressed
    Record {
        /// Where to save the macro
        file: PathBuf,
    },
    /// Play a recorded macro
    Play {
        file: PathBuf,
        /// Playback speed multiplier (2 plays twice as fast)
        #[arg(long)]
        speed: Option<f64>,
        /// Number of repetitions, 0 for infinite
        #[arg(long)]
        repeat: Option<u32>,
        /// Seconds to wait between repetitions
        #[arg(long, value_name = "SECS")]
        interval: Option<u32>,
        #[arg(long, value_enum)]
        backend: Option<Backend>,
        /// Print the events instead of injecting them
        #[arg(long, conflicts_with = "backend")]
        dry_run: bool,
    },
    /// Change a stored setting
    Set { key: String, value: String },
    /// Show the stored settings
    Settings,
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = match cli.settings {
        Some(path) => path,
        None => SettingsFile::default_path().context("could not find a config directory")?,
    };
    let mut settings = SettingsFile::load(&path)?;
    debug!("Using settings from {}", settings.path().display());

    match cli.command {
        Command::Record { file } => record(&settings, &with_default_extension(file)),
        Command::Play {
            file,
            speed,
            repeat,
            interval,
            backend,
            dry_run,
        } => {
            let mut config = PlaybackConfig::from_settings(&settings);
            if let Some(speed) = speed {
                config.speed = speed;
            }
            if let Some(repeat) = repeat {
                config.repeat_count = repeat;
            }
            if let Some(seconds) = interval {
                config.interval_enabled = true;
                config.interval_seconds = seconds;
            }
            let backend = if dry_run {
                Backend::Stdout
            } else {
                Backend::from_settings(&settings, backend)?
            };
            play(&file, &config, backend)
        }
        Command::Set { key, value } => {
            set(&mut settings, &key, &value)?;
            settings.save()?;
            println!("{} = {}", key, settings.get_text(&key, ""));
            Ok(())
        }
        Command::Settings => {
            print_settings(&settings);
            Ok(())
        }
    }
}

fn record(settings: &SettingsFile, file: &Path) -> Result<()> {
    let timing = config::timing(settings);
    let source = Box::new(RdevSource::new());
    let mut recorder = Recorder::with_move_interval(source, timing.move_interval);

    let (stop_sender, stop_receiver) = mpsc::channel();
    let on_interrupt = stop_sender.clone();
    ctrlc::set_handler(move || {
        let _ = on_interrupt.send(());
    })
    .context("could not install the Ctrl-C handler")?;
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        let _ = stop_sender.send(());
    });

    recorder.start()?;
    println!("Recording... press Enter or Ctrl-C to stop");
    let _ = stop_receiver.recv();

    let buffer = recorder.stop().context("recording was not running")?;
    if buffer.is_empty() {
        warn!("Nothing was recorded");
    }
    macro_file::save(file, &buffer)?;
    println!(
        "Saved {} events ({:.1}s) to {}",
        buffer.len(),
        buffer.duration().as_secs_f64(),
        file.display()
    );
    Ok(())
}

fn play(file: &Path, config: &PlaybackConfig, backend: Backend) -> Result<()> {
    let buffer = macro_file::load(file)?;
    println!(
        "Loaded {} events ({:.1}s) from {}",
        buffer.len(),
        buffer.duration().as_secs_f64(),
        file.display()
    );

    let (orchestrator, notifications) =
        PlaybackOrchestrator::new(config::get_output_sink(backend));
    let stop = orchestrator.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("could not install the Ctrl-C handler")?;

    orchestrator.play(Arc::new(buffer), config)?;
    for notification in notifications {
        match notification {
            PlaybackNotification::Started { mode, speed } => {
                println!("Playing {} at {}x, press Ctrl-C to stop", mode, speed)
            }
            PlaybackNotification::Progress(progress) => println!("{}", progress),
            PlaybackNotification::Finished { completed, outcome } => {
                return match outcome {
                    PlaybackOutcome::Completed => {
                        println!("Playback completed {} repetitions", completed);
                        Ok(())
                    }
                    PlaybackOutcome::Cancelled => {
                        println!("Playback stopped after {} repetitions", completed);
                        Ok(())
                    }
                    PlaybackOutcome::Failed(reason) => {
                        bail!("playback failed after {} repetitions: {}", completed, reason)
                    }
                };
            }
        }
    }
    bail!("playback ended without reporting completion")
}

/// Store a user-typed setting, rejecting values playback would refuse
fn set(settings: &mut dyn Settings, key: &str, raw: &str) -> Result<()> {
    let value = match key {
        BACKEND_KEY => SettingValue::Text(raw.parse::<Backend>()?.to_string()),
        SPEED_KEY | REPEAT_COUNT_KEY | INTERVAL_SECONDS_KEY | MOVE_INTERVAL_KEY => {
            match SettingValue::parse(raw) {
                SettingValue::Number(n) if n >= 0.0 => SettingValue::Number(n),
                _ => bail!("{} must be a non-negative number", key),
            }
        }
        INTERVAL_ENABLED_KEY => match SettingValue::parse(raw) {
            SettingValue::Bool(b) => SettingValue::Bool(b),
            _ => bail!("{} must be true or false", key),
        },
        _ => bail!("unknown setting {:?}", key),
    };
    settings.set(key, value);
    PlaybackConfig::from_settings(settings)
        .validate()
        .with_context(|| format!("refusing to set {} to {}", key, raw))?;
    Ok(())
}

fn print_settings(settings: &SettingsFile) {
    let config = PlaybackConfig::from_settings(settings);
    println!("# {}", settings.path().display());
    println!("{} = {}", SPEED_KEY, config.speed);
    println!("{} = {}", REPEAT_COUNT_KEY, config.repeat_count);
    println!("{} = {}", INTERVAL_ENABLED_KEY, config.interval_enabled);
    println!("{} = {}", INTERVAL_SECONDS_KEY, config.interval_seconds);
    match Backend::from_settings(settings, None) {
        Ok(backend) => println!("{} = {}", BACKEND_KEY, backend),
        Err(e) => println!("{} = ({})", BACKEND_KEY, e),
    }
    println!(
        "{} = {}",
        MOVE_INTERVAL_KEY,
        config::timing(settings).move_interval.as_millis()
    );
    println!("mode: {}", config.mode());
    for (key, value) in unknown_settings(settings) {
        println!("{} = {} (ignored)", key, value);
    }
}

/// Stored values nothing reads (ex: a typo in a hand-edited file)
fn unknown_settings(settings: &SettingsFile) -> Vec<(&str, &SettingValue)> {
    settings
        .iter()
        .filter(|(key, _)| !KNOWN_KEYS.contains(key))
        .collect()
}

/// Adds the macro extension when the path has none
fn with_default_extension(mut path: PathBuf) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension(macro_file::EXTENSION);
    }
    path
}
