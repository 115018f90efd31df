//! Reading and writing macros as JSON documents of the form `{"events": [...]}`.

use crate::error::MacroFileError;
use crate::{EventKind, EventRecord, Key, MacroBuffer};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path};

/// Extension given to saved macros
pub const EXTENSION: &str = "macro";

#[derive(Debug, Serialize)]
struct MacroFile {
    events: Vec<EventRecord>,
}

pub fn to_string(buffer: &MacroBuffer) -> Result<String, MacroFileError> {
    let file = MacroFile {
        events: buffer.events().to_vec(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Events are decoded one at a time so a key the current format can't name doesn't sink
/// the whole file.
#[derive(Debug, Deserialize)]
struct RawMacroFile {
    events: Vec<Value>,
}

/// A key event as written by older recorders: an arbitrary (or null) key name, plus the
/// Windows virtual-key code when the recorder knew it.
#[derive(Debug, Deserialize)]
struct LegacyKeyEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    key: Value,
    #[serde(rename = "vkCode", default)]
    vk_code: Option<u32>,
    timestamp: f64,
}

/// Parse a macro document.
///
/// Key events whose name doesn't parse fall back to their `vkCode`. Ones that still can't
/// be decoded are skipped with a warning. Any other malformed event fails the whole load.
pub fn from_str(raw: &str) -> Result<MacroBuffer, MacroFileError> {
    let file: RawMacroFile = serde_json::from_str(raw)?;
    let mut events = Vec::with_capacity(file.events.len());
    for (index, value) in file.events.iter().enumerate() {
        if let Some(event) = decode_event(index, value)? {
            events.push(event);
        }
    }
    Ok(MacroBuffer::new(events)?)
}

fn decode_event(index: usize, value: &Value) -> Result<Option<EventRecord>, MacroFileError> {
    let error = match EventRecord::deserialize(value) {
        Ok(event) => return Ok(Some(event)),
        Err(e) => e,
    };
    let legacy = match LegacyKeyEvent::deserialize(value) {
        Ok(legacy) if legacy.kind == "key_press" || legacy.kind == "key_release" => legacy,
        _ => return Err(error.into()),
    };

    match legacy.vk_code.and_then(Key::from_vk_code) {
        Some(key) => {
            let kind = if legacy.kind == "key_press" {
                EventKind::KeyPress { key }
            } else {
                EventKind::KeyRelease { key }
            };
            Ok(Some(EventRecord::new(kind, legacy.timestamp)))
        }
        None => {
            warn!(
                "Skipping event {} ({} of key {}): no replayable key",
                index, legacy.kind, legacy.key
            );
            Ok(None)
        }
    }
}

pub fn save(path: &Path, buffer: &MacroBuffer) -> Result<(), MacroFileError> {
    let contents = to_string(buffer)?;
    fs::write(path, contents).map_err(|source| MacroFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load(path: &Path) -> Result<MacroBuffer, MacroFileError> {
    let raw = fs::read_to_string(path).map_err(|source| MacroFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_str(&raw)
}
