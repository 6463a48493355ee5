//! Configuration and settings management for printstream
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into two sections:
//! - Printer settings (leveling switches, probe offset, nozzle, probed samples)
//! - Pipeline settings (which filters run and how temperature waits poll)

use crate::error::{SettingsError, SettingsResult};
use crate::keys;
use crate::provider::{SettingValue, SettingsProvider};
use printstream_core::{GridShape, LevelingData};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Printer profile values consulted by the stream filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterSettings {
    /// Software print leveling is turned on
    pub print_leveling_enabled: bool,
    /// The firmware levels the bed itself
    pub has_hardware_leveling: bool,
    /// Probe trigger height above the nozzle tip, in mm
    pub z_probe_z_offset: f64,
    /// Nozzle diameter in mm
    pub nozzle_diameter: f64,
    /// Columns in the probing grid
    pub leveling_grid_width: usize,
    /// Rows in the probing grid
    pub leveling_grid_height: usize,
    /// Probed samples, absent until the bed has been probed
    pub leveling: Option<Arc<LevelingData>>,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        let grid = GridShape::default();
        Self {
            print_leveling_enabled: false,
            has_hardware_leveling: false,
            z_probe_z_offset: 0.0,
            nozzle_diameter: 0.4,
            leveling_grid_width: grid.width,
            leveling_grid_height: grid.height,
            leveling: None,
        }
    }
}

impl PrinterSettings {
    /// Probing grid dimensions
    pub fn grid(&self) -> GridShape {
        GridShape::new(self.leveling_grid_width, self.leveling_grid_height)
    }

    /// Set a scalar setting from its textual form, as typed on a command line
    pub fn set_from_str(&mut self, key: &str, value: &str) -> SettingsResult<()> {
        let text = SettingValue::Text(value.to_string());
        let bad = |kind: &str| SettingsError::invalid(key, format!("expected {kind}, got '{value}'"));

        match key {
            keys::PRINT_LEVELING_ENABLED => {
                self.print_leveling_enabled = text.as_bool().ok_or_else(|| bad("a boolean"))?
            }
            keys::HAS_HARDWARE_LEVELING => {
                self.has_hardware_leveling = text.as_bool().ok_or_else(|| bad("a boolean"))?
            }
            keys::Z_PROBE_Z_OFFSET => {
                self.z_probe_z_offset = text.as_f64().ok_or_else(|| bad("a number"))?
            }
            keys::NOZZLE_DIAMETER => {
                self.nozzle_diameter = text.as_f64().ok_or_else(|| bad("a number"))?
            }
            keys::LEVELING_GRID_WIDTH => {
                self.leveling_grid_width = text.as_usize().ok_or_else(|| bad("a whole number"))?
            }
            keys::LEVELING_GRID_HEIGHT => {
                self.leveling_grid_height = text.as_usize().ok_or_else(|| bad("a whole number"))?
            }
            _ => return Err(SettingsError::invalid(key, "unknown setting")),
        }
        Ok(())
    }

    /// Validate printer settings
    pub fn validate(&self) -> SettingsResult<()> {
        if self.leveling_grid_width < 2 || self.leveling_grid_height < 2 {
            return Err(SettingsError::invalid(
                keys::LEVELING_GRID_WIDTH,
                format!("leveling grid {} is smaller than 2x2", self.grid()),
            ));
        }

        let Some(expected) = self.grid().sample_count() else {
            return Err(SettingsError::invalid(
                keys::LEVELING_GRID_WIDTH,
                format!("leveling grid {} is too large", self.grid()),
            ));
        };

        if !self.z_probe_z_offset.is_finite() {
            return Err(SettingsError::invalid(
                keys::Z_PROBE_Z_OFFSET,
                "must be a finite number",
            ));
        }

        if !self.nozzle_diameter.is_finite() || self.nozzle_diameter < 0.0 {
            return Err(SettingsError::invalid(
                keys::NOZZLE_DIAMETER,
                "must be a non-negative number",
            ));
        }

        if let Some(data) = &self.leveling {
            if data.len() != expected {
                return Err(SettingsError::invalid(
                    "leveling",
                    format!(
                        "{} samples stored but a {} grid needs {}",
                        data.len(),
                        self.grid(),
                        expected
                    ),
                ));
            }
        }

        Ok(())
    }
}

impl SettingsProvider for PrinterSettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        let value = match key {
            keys::PRINT_LEVELING_ENABLED => SettingValue::Bool(self.print_leveling_enabled),
            keys::HAS_HARDWARE_LEVELING => SettingValue::Bool(self.has_hardware_leveling),
            keys::Z_PROBE_Z_OFFSET => SettingValue::Float(self.z_probe_z_offset),
            keys::NOZZLE_DIAMETER => SettingValue::Float(self.nozzle_diameter),
            keys::LEVELING_GRID_WIDTH => SettingValue::Integer(self.leveling_grid_width as i64),
            keys::LEVELING_GRID_HEIGHT => SettingValue::Integer(self.leveling_grid_height as i64),
            _ => return None,
        };
        Some(value)
    }

    fn leveling_data(&self) -> Option<Arc<LevelingData>> {
        self.leveling.clone()
    }
}

/// Stream pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Rewrite blocking temperature waits into dwell polling
    pub wait_for_temperature: bool,
    /// Run the software print-leveling filter
    pub print_leveling: bool,
    /// The stream feeds an active print (as opposed to manual commands)
    pub active_printing: bool,
    /// Dwell length emitted per poll while waiting, in milliseconds
    pub dwell_ms: u64,
    /// Give up a temperature wait after this many dwells
    pub max_wait_polls: Option<u32>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            wait_for_temperature: true,
            print_leveling: true,
            active_printing: true,
            dwell_ms: 1000,
            max_wait_polls: None,
        }
    }
}

impl PipelineSettings {
    /// Validate pipeline settings
    pub fn validate(&self) -> SettingsResult<()> {
        if self.dwell_ms == 0 {
            return Err(SettingsError::invalid("dwell_ms", "must be > 0"));
        }
        Ok(())
    }
}

/// Complete configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Printer profile
    pub printer: PrinterSettings,
    /// Stream pipeline
    pub pipeline: PipelineSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location under the platform config directory
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("printstream").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no platform config directory".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match Format::from_path(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        self.printer.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printstream_core::Vector3;

    #[test]
    fn test_defaults_validate() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert!(!config.printer.print_leveling_enabled);
        assert_eq!(config.printer.grid(), GridShape::new(3, 3));
        assert_eq!(config.pipeline.dwell_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_small_grid() {
        let mut printer = PrinterSettings::default();
        printer.leveling_grid_width = 1;
        assert!(matches!(
            printer.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_sample_mismatch() {
        let mut printer = PrinterSettings::default();
        printer.leveling = Some(Arc::new(LevelingData::new(vec![Vector3::ZERO; 4])));
        assert!(printer.validate().is_err());

        printer.leveling_grid_width = 2;
        printer.leveling_grid_height = 2;
        assert!(printer.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overflowing_grid() {
        let mut printer = PrinterSettings::default();
        printer.leveling_grid_width = usize::MAX;
        assert!(matches!(
            printer.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));

        printer.leveling = Some(Arc::new(LevelingData::new(vec![Vector3::ZERO; 9])));
        assert!(printer.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_nozzle() {
        let mut printer = PrinterSettings::default();
        printer.nozzle_diameter = -0.4;
        assert!(printer.validate().is_err());
    }

    #[test]
    fn test_set_from_str() {
        let mut printer = PrinterSettings::default();
        printer
            .set_from_str(keys::PRINT_LEVELING_ENABLED, "true")
            .unwrap();
        printer.set_from_str(keys::Z_PROBE_Z_OFFSET, "-0.15").unwrap();
        printer.set_from_str(keys::LEVELING_GRID_WIDTH, "5").unwrap();
        assert!(printer.print_leveling_enabled);
        assert_eq!(printer.z_probe_z_offset, -0.15);
        assert_eq!(printer.leveling_grid_width, 5);

        assert!(printer.set_from_str(keys::NOZZLE_DIAMETER, "wide").is_err());
        assert!(printer.set_from_str("bed_size", "200").is_err());
    }

    #[test]
    fn test_provider_lookup() {
        let printer = PrinterSettings {
            print_leveling_enabled: true,
            z_probe_z_offset: 0.2,
            ..Default::default()
        };
        assert!(printer.get_bool(keys::PRINT_LEVELING_ENABLED));
        assert!(!printer.get_bool(keys::HAS_HARDWARE_LEVELING));
        assert_eq!(printer.get_f64(keys::Z_PROBE_Z_OFFSET), 0.2);
        assert_eq!(printer.get_f64(keys::NOZZLE_DIAMETER), 0.4);
        assert_eq!(printer.get("unknown_key"), None);
        assert!(printer.leveling_data().is_none());
        for key in keys::ALL {
            assert!(printer.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Config::new()
            .save_to_file(Path::new("printer.yaml"))
            .unwrap_err();
        assert!(matches!(err, SettingsError::UnsupportedFormat(ext) if ext == "yaml"));
    }
}
