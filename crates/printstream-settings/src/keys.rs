//! Setting keys understood by the printstream filters
//!
//! Keys match the names used in printer profiles so a profile exported by
//! another host can be looked up without translation.

/// Software print leveling is turned on (`bool`)
pub const PRINT_LEVELING_ENABLED: &str = "print_leveling_enabled";

/// The firmware levels the bed itself (`bool`); software leveling stays off
pub const HAS_HARDWARE_LEVELING: &str = "has_hardware_leveling";

/// Height of the probe trigger point above the nozzle tip, in mm (`f64`)
pub const Z_PROBE_Z_OFFSET: &str = "z_probe_z_offset";

/// Nozzle diameter in mm (`f64`)
pub const NOZZLE_DIAMETER: &str = "nozzle_diameter";

/// Columns in the probing grid (`usize`)
pub const LEVELING_GRID_WIDTH: &str = "leveling_grid_width";

/// Rows in the probing grid (`usize`)
pub const LEVELING_GRID_HEIGHT: &str = "leveling_grid_height";

/// Every scalar key, in profile order
pub const ALL: [&str; 6] = [
    PRINT_LEVELING_ENABLED,
    HAS_HARDWARE_LEVELING,
    Z_PROBE_Z_OFFSET,
    NOZZLE_DIAMETER,
    LEVELING_GRID_WIDTH,
    LEVELING_GRID_HEIGHT,
];
