//! printstream Settings Crate
//!
//! Handles printer settings lookup by key, the live settings store shared
//! with the stream filters, and config file persistence.

pub mod config;
pub mod error;
pub mod keys;
pub mod provider;
pub mod store;

pub use config::{Config, PipelineSettings, PrinterSettings};
pub use error::{SettingsError, SettingsResult};
pub use provider::{SettingValue, SettingsProvider};
pub use store::SettingsStore;
