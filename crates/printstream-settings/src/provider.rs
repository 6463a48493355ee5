//! Settings lookup by key
//!
//! The stream filters never hold a settings struct directly; they ask a
//! [`SettingsProvider`] on each decision so a change made mid-print (for
//! example re-probing the bed) is seen on the next line.

use crate::keys;
use printstream_core::{GridShape, LevelingData};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A typed setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean flag
    Bool(bool),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Free text
    Text(String),
}

impl SettingValue {
    /// Interpret as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            Self::Text(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            Self::Float(_) => None,
        }
    }

    /// Interpret as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Interpret as a non-negative whole number
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Integer(i) => usize::try_from(*i).ok(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Float(_) | Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Source of printer settings for the stream filters
///
/// Implementors only need [`get`](SettingsProvider::get) and
/// [`leveling_data`](SettingsProvider::leveling_data); the typed helpers
/// apply the defaults a printer without a profile entry would use.
pub trait SettingsProvider: Send + Sync {
    /// Look up a setting by key
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// The current probed leveling samples, if the bed has been probed
    fn leveling_data(&self) -> Option<Arc<LevelingData>>;

    /// Boolean setting, `false` when missing or not a boolean
    fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Float setting, `0.0` when missing or not numeric
    fn get_f64(&self, key: &str) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    /// Whole-number setting with an explicit default
    fn get_usize(&self, key: &str, default: usize) -> usize {
        self.get(key).and_then(|v| v.as_usize()).unwrap_or(default)
    }

    /// Probing grid dimensions, 3x3 unless configured
    fn grid_shape(&self) -> GridShape {
        let default = GridShape::default();
        GridShape::new(
            self.get_usize(keys::LEVELING_GRID_WIDTH, default.width),
            self.get_usize(keys::LEVELING_GRID_HEIGHT, default.height),
        )
    }
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for Arc<T> {
    fn get(&self, key: &str) -> Option<SettingValue> {
        (**self).get(key)
    }

    fn leveling_data(&self) -> Option<Arc<LevelingData>> {
        (**self).leveling_data()
    }
}
