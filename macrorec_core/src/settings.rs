//! Key/value settings store consumed by the core.
//!
//! The core never owns where settings live; it only reads and writes through [`Settings`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

pub trait Settings {
    fn get(&self, key: &str, default: SettingValue) -> SettingValue;
    fn set(&mut self, key: &str, value: SettingValue);

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key, SettingValue::Bool(default)) {
            SettingValue::Bool(b) => b,
            SettingValue::Text(s) => match s.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            SettingValue::Number(_) => default,
        }
    }

    fn get_number(&self, key: &str, default: f64) -> f64 {
        match self.get(key, SettingValue::Number(default)) {
            SettingValue::Number(n) => n,
            SettingValue::Text(s) => s.trim().parse().unwrap_or(default),
            SettingValue::Bool(_) => default,
        }
    }

    fn get_text(&self, key: &str, default: &str) -> String {
        match self.get(key, SettingValue::Text(default.to_owned())) {
            SettingValue::Text(s) => s,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Number(n) => write!(f, "{}", n),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

impl SettingValue {
    /// Interpret a user-typed value: booleans, then numbers, then plain text
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => return SettingValue::Bool(true),
            "false" => return SettingValue::Bool(false),
            _ => {}
        }
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => SettingValue::Number(n),
            _ => SettingValue::Text(raw.to_owned()),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<f64> for SettingValue {
    fn from(n: f64) -> Self {
        SettingValue::Number(n)
    }
}

impl From<u32> for SettingValue {
    fn from(n: u32) -> Self {
        SettingValue::Number(n.into())
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Text(s.to_owned())
    }
}

/// Settings kept in memory only
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, SettingValue>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Settings for MemorySettings {
    fn get(&self, key: &str, default: SettingValue) -> SettingValue {
        self.values.get(key).cloned().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_owned(), value);
    }
}
