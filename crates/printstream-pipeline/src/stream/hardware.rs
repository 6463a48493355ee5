//! Printer status as seen by the temperature-wait filter
//!
//! The printer connection owns the real readings; the filter only polls them
//! between lines.

use printstream_core::{thread_safe_rw, ThreadSafeRw};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Highest number of extruders a status handle tracks
pub const MAX_EXTRUDERS: usize = 16;

/// Live printer status
pub trait HardwareStatus: Send + Sync {
    /// Current temperature of extruder `tool`, `None` when it cannot be read
    fn extruder_temperature(&self, tool: usize) -> Option<f64>;

    /// Current bed temperature, `None` when it cannot be read
    fn bed_temperature(&self) -> Option<f64>;

    /// True once the user has canceled the print
    fn print_canceled(&self) -> bool;
}

impl<T: HardwareStatus + ?Sized> HardwareStatus for Arc<T> {
    fn extruder_temperature(&self, tool: usize) -> Option<f64> {
        (**self).extruder_temperature(tool)
    }

    fn bed_temperature(&self) -> Option<f64> {
        (**self).bed_temperature()
    }

    fn print_canceled(&self) -> bool {
        (**self).print_canceled()
    }
}

/// Point-in-time printer readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    /// Temperature per extruder, indexed by tool number
    pub extruder_temperatures: Vec<f64>,
    /// Bed temperature
    pub bed_temperature: f64,
    /// Print canceled by the user
    pub canceled: bool,
    /// The printer is answering status queries
    pub reachable: bool,
}

impl Default for HardwareSnapshot {
    fn default() -> Self {
        Self {
            extruder_temperatures: vec![0.0],
            bed_temperature: 0.0,
            canceled: false,
            reachable: true,
        }
    }
}

/// Cloneable handle to readings updated by the printer connection
#[derive(Debug, Clone, Default)]
pub struct SharedHardwareStatus {
    state: ThreadSafeRw<HardwareSnapshot>,
}

impl SharedHardwareStatus {
    /// Create a status handle with ambient readings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a status handle holding `snapshot`
    pub fn with_snapshot(snapshot: HardwareSnapshot) -> Self {
        Self {
            state: thread_safe_rw(snapshot),
        }
    }

    /// Copy of the current readings
    pub fn snapshot(&self) -> HardwareSnapshot {
        self.state.read().clone()
    }

    /// Record an extruder reading, growing the tool list as needed
    ///
    /// Readings for tools at or past [`MAX_EXTRUDERS`] are dropped.
    pub fn set_extruder_temperature(&self, tool: usize, temperature: f64) {
        if tool >= MAX_EXTRUDERS {
            tracing::warn!(
                "Ignoring reading for extruder {}, at most {} are tracked",
                tool,
                MAX_EXTRUDERS
            );
            return;
        }
        let mut state = self.state.write();
        if state.extruder_temperatures.len() <= tool {
            state.extruder_temperatures.resize(tool + 1, 0.0);
        }
        state.extruder_temperatures[tool] = temperature;
    }

    /// Record a bed reading
    pub fn set_bed_temperature(&self, temperature: f64) {
        self.state.write().bed_temperature = temperature;
    }

    /// Mark the print canceled (or resumed)
    pub fn set_canceled(&self, canceled: bool) {
        self.state.write().canceled = canceled;
    }

    /// Mark the printer reachable or not
    pub fn set_reachable(&self, reachable: bool) {
        self.state.write().reachable = reachable;
    }
}

impl HardwareStatus for SharedHardwareStatus {
    fn extruder_temperature(&self, tool: usize) -> Option<f64> {
        let state = self.state.read();
        if !state.reachable {
            return None;
        }
        state.extruder_temperatures.get(tool).copied()
    }

    fn bed_temperature(&self) -> Option<f64> {
        let state = self.state.read();
        state.reachable.then_some(state.bed_temperature)
    }

    fn print_canceled(&self) -> bool {
        self.state.read().canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings() {
        let status = SharedHardwareStatus::new();
        assert_eq!(status.extruder_temperature(0), Some(0.0));
        assert_eq!(status.extruder_temperature(1), None);

        status.set_extruder_temperature(1, 205.0);
        status.set_bed_temperature(60.0);
        assert_eq!(status.extruder_temperature(1), Some(205.0));
        assert_eq!(status.bed_temperature(), Some(60.0));
        assert_eq!(status.snapshot().extruder_temperatures.len(), 2);
    }

    #[test]
    fn test_out_of_range_tool_is_dropped() {
        let status = SharedHardwareStatus::new();
        status.set_extruder_temperature(usize::MAX, 200.0);
        status.set_extruder_temperature(MAX_EXTRUDERS, 200.0);
        assert_eq!(status.snapshot().extruder_temperatures.len(), 1);

        status.set_extruder_temperature(MAX_EXTRUDERS - 1, 180.0);
        assert_eq!(status.extruder_temperature(MAX_EXTRUDERS - 1), Some(180.0));
    }

    #[test]
    fn test_unreachable_and_canceled() {
        let status = SharedHardwareStatus::new();
        let handle = status.clone();
        handle.set_reachable(false);
        handle.set_canceled(true);
        assert_eq!(status.extruder_temperature(0), None);
        assert_eq!(status.bed_temperature(), None);
        assert!(status.print_canceled());

        let shared: Arc<dyn HardwareStatus> = Arc::new(status);
        assert!(shared.print_canceled());
    }
}
