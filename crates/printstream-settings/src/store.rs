//! Live settings store
//!
//! Holds the printer settings a running pipeline reads from. A UI or the
//! consumer loop can change a value (or swap in freshly probed leveling data)
//! through any clone of the store, and the filters observe it on their next
//! decision.

use crate::config::{Config, PrinterSettings};
use crate::error::SettingsResult;
use crate::provider::{SettingValue, SettingsProvider};
use printstream_core::{thread_safe_rw, LevelingData, ThreadSafeRw};
use std::path::Path;
use std::sync::Arc;

/// Shared, mutable printer settings
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: ThreadSafeRw<PrinterSettings>,
}

impl SettingsStore {
    /// Create a store holding `settings`
    pub fn new(settings: PrinterSettings) -> Self {
        Self {
            settings: thread_safe_rw(settings),
        }
    }

    /// Load the printer section of a config file
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let config = Config::load_from_file(path)?;
        Ok(Self::new(config.printer))
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> PrinterSettings {
        self.settings.read().clone()
    }

    /// Modify the settings in place
    ///
    /// The change is validated; an invalid result is rolled back and the
    /// error returned.
    pub fn update<F>(&self, f: F) -> SettingsResult<()>
    where
        F: FnOnce(&mut PrinterSettings),
    {
        let mut guard = self.settings.write();
        let previous = guard.clone();
        f(&mut *guard);
        if let Err(e) = guard.validate() {
            *guard = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Replace the probed samples wholesale (after re-probing or a reset)
    pub fn replace_leveling(&self, data: Option<LevelingData>) -> SettingsResult<()> {
        let count = data.as_ref().map_or(0, |d| d.len());
        self.update(|s| s.leveling = data.map(Arc::new))?;
        tracing::info!("Leveling data replaced ({} samples)", count);
        Ok(())
    }

    /// Set a scalar setting from its textual form
    pub fn set_from_str(&self, key: &str, value: &str) -> SettingsResult<()> {
        let mut result = Ok(());
        self.update(|s| result = s.set_from_str(key, value))?;
        result
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(PrinterSettings::default())
    }
}

impl SettingsProvider for SettingsStore {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().get(key)
    }

    fn leveling_data(&self) -> Option<Arc<LevelingData>> {
        self.settings.read().leveling_data()
    }
}
