use printstream_core::{GridShape, LevelingData};
use printstream_settings::{keys, Config, SettingsError, SettingsProvider, SettingsStore};
use std::sync::Arc;
use tempfile::tempdir;

fn probed_config() -> Config {
    let mut config = Config::new();
    config.printer.print_leveling_enabled = true;
    config.printer.z_probe_z_offset = -0.1;
    config.printer.leveling = Some(Arc::new(
        LevelingData::from_fn(GridShape::default(), (10.0, 10.0), (190.0, 190.0), |x, y| {
            (x - y) * 0.001
        })
        .with_probe_offset(-0.1),
    ));
    config.pipeline.max_wait_polls = Some(600);
    config
}

#[test]
fn test_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("printer.toml");

    let config = probed_config();
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("printer.json");

    let config = probed_config();
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("printer.toml");
    std::fs::write(
        &path,
        "[printer]\nprint_leveling_enabled = true\nleveling_grid_width = 4\n",
    )
    .unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert!(loaded.printer.print_leveling_enabled);
    assert_eq!(loaded.printer.grid(), GridShape::new(4, 3));
    assert_eq!(loaded.printer.nozzle_diameter, 0.4);
    assert!(loaded.pipeline.wait_for_temperature);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("printer.toml");
    std::fs::write(&path, "[pipeline]\ndwell_ms = 0\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidSetting { .. }));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = Config::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::LoadError(_)));
}

#[test]
fn test_store_loads_printer_section() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("printer.json");
    probed_config().save_to_file(&path).unwrap();

    let store = SettingsStore::load_from_file(&path).unwrap();
    assert!(store.get_bool(keys::PRINT_LEVELING_ENABLED));
    assert_eq!(store.get_f64(keys::Z_PROBE_Z_OFFSET), -0.1);
    assert_eq!(store.leveling_data().map(|d| d.len()), Some(9));
}
