//! Simulated printer on the consuming end of a pipeline
//!
//! Stands in for a real printer connection: it watches the lines the pipeline
//! emits, tracks heater targets, warms the heaters during each dwell and
//! publishes the readings the temperature-wait stage polls.

use printstream_core::data::Axis;
use printstream_core::PrinterMove;
use printstream_pipeline::gcode::{classify, first_number_after, parameters, LineKind};
use printstream_pipeline::{SharedHardwareStatus, MAX_EXTRUDERS};

/// Counts of what the simulated printer has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Lines received
    pub lines: usize,
    /// Dwell lines received
    pub dwells: usize,
    /// Total dwell time in milliseconds
    pub dwell_ms: u64,
    /// Homing commands received
    pub homes: usize,
}

/// A printer with linearly responding heaters
#[derive(Debug)]
pub struct SimulatedPrinter {
    status: SharedHardwareStatus,
    heat_rate: f64,
    extruders: Vec<Heater>,
    bed: Heater,
    stats: SimulationStats,
}

#[derive(Debug, Clone, Copy)]
struct Heater {
    temperature: f64,
    target: f64,
}

impl Heater {
    fn new(temperature: f64) -> Self {
        Self {
            temperature,
            target: temperature,
        }
    }

    /// Move toward the target by at most `step`
    fn advance(&mut self, step: f64) {
        let gap = self.target - self.temperature;
        self.temperature += gap.clamp(-step, step);
    }
}

impl SimulatedPrinter {
    /// Create a printer whose heaters start at `start_temperature` and change
    /// by `heat_rate` degrees per second
    pub fn new(status: SharedHardwareStatus, start_temperature: f64, heat_rate: f64) -> Self {
        let printer = Self {
            status,
            heat_rate,
            extruders: vec![Heater::new(start_temperature)],
            bed: Heater::new(start_temperature),
            stats: SimulationStats::default(),
        };
        printer.publish();
        printer
    }

    /// Status handle the temperature-wait stage should poll
    pub fn status(&self) -> &SharedHardwareStatus {
        &self.status
    }

    /// What has been seen so far
    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    /// Current temperature of extruder `tool`
    pub fn extruder_temperature(&self, tool: usize) -> Option<f64> {
        self.extruders.get(tool).map(|h| h.temperature)
    }

    /// Current bed temperature
    pub fn bed_temperature(&self) -> f64 {
        self.bed.temperature
    }

    /// Process one line sent to the printer
    ///
    /// Returns the position the printer now reports when the line moved the
    /// machine outside the stream's control (homing).
    pub fn receive(&mut self, line: &str) -> Option<PrinterMove> {
        self.stats.lines += 1;

        match classify(line) {
            LineKind::SetExtruderTemp | LineKind::WaitExtruderTemp => {
                let tool = first_number_after('T', line).unwrap_or(0.0);
                if !(0.0..MAX_EXTRUDERS as f64).contains(&tool) {
                    tracing::warn!("Ignoring '{}', no extruder {}", line, tool);
                    return None;
                }
                if let Some(target) = first_number_after('S', line) {
                    self.extruder(tool as usize).target = target;
                }
                None
            }
            LineKind::SetBedTemp | LineKind::WaitBedTemp => {
                if let Some(target) = first_number_after('S', line) {
                    self.bed.target = target;
                }
                None
            }
            LineKind::Dwell => {
                let ms = first_number_after('P', line).unwrap_or(0.0).max(0.0);
                self.stats.dwells += 1;
                self.stats.dwell_ms += ms as u64;
                let step = self.heat_rate * ms / 1000.0;
                for heater in self.extruders.iter_mut().chain(std::iter::once(&mut self.bed)) {
                    heater.advance(step);
                }
                self.publish();
                None
            }
            LineKind::Home => {
                self.stats.homes += 1;
                Some(homed_position(line))
            }
            _ => None,
        }
    }

    /// Heater for `tool`, which must be below [`MAX_EXTRUDERS`]
    fn extruder(&mut self, tool: usize) -> &mut Heater {
        if self.extruders.len() <= tool {
            let ambient = self.extruders[0].temperature;
            self.extruders.resize(tool + 1, Heater::new(ambient));
        }
        &mut self.extruders[tool]
    }

    fn publish(&self) {
        for (tool, heater) in self.extruders.iter().enumerate() {
            self.status.set_extruder_temperature(tool, heater.temperature);
        }
        self.status.set_bed_temperature(self.bed.temperature);
    }
}

/// Position after a `G28`: named axes at zero, or X, Y and Z when none is named
fn homed_position(line: &str) -> PrinterMove {
    let mut position = PrinterMove::UNKNOWN;
    for param in parameters(line) {
        if let Some(axis @ (Axis::X | Axis::Y | Axis::Z)) = Axis::from_letter(param.letter) {
            position.set(axis, 0.0);
        }
    }
    if position.known().is_empty() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            position.set(axis, 0.0);
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use printstream_pipeline::HardwareStatus;

    #[test]
    fn test_heats_during_dwell() {
        let status = SharedHardwareStatus::new();
        let mut printer = SimulatedPrinter::new(status.clone(), 20.0, 10.0);
        assert_eq!(status.extruder_temperature(0), Some(20.0));

        printer.receive("M104 S200");
        printer.receive("M140 S60");
        printer.receive("G4 P1000");
        assert_eq!(status.extruder_temperature(0), Some(30.0));
        assert_eq!(status.bed_temperature(), Some(30.0));

        printer.receive("G4 P5000");
        assert_eq!(status.extruder_temperature(0), Some(80.0));
        assert_eq!(status.bed_temperature(), Some(60.0));

        let stats = printer.stats();
        assert_eq!(stats.dwells, 2);
        assert_eq!(stats.dwell_ms, 6000);
        assert_eq!(stats.lines, 4);
    }

    #[test]
    fn test_second_tool_and_cooling() {
        let status = SharedHardwareStatus::new();
        let mut printer = SimulatedPrinter::new(status.clone(), 100.0, 50.0);
        printer.receive("M104 S150 T1");
        printer.receive("M104 S0");
        printer.receive("G4 P1000");
        assert_eq!(printer.extruder_temperature(1), Some(150.0));
        assert_eq!(printer.extruder_temperature(0), Some(50.0));
        assert_eq!(status.extruder_temperature(1), Some(150.0));
    }

    #[test]
    fn test_unknown_tool_is_ignored() {
        let status = SharedHardwareStatus::new();
        let mut printer = SimulatedPrinter::new(status.clone(), 20.0, 10.0);
        printer.receive("M104 S200 T18446744073709551615");
        printer.receive("M104 S200 T-1");
        printer.receive(&format!("M104 S200 T{}", MAX_EXTRUDERS));
        printer.receive("G4 P1000");

        assert_eq!(printer.extruder_temperature(0), Some(20.0));
        assert_eq!(printer.extruder_temperature(1), None);
        assert_eq!(status.snapshot().extruder_temperatures.len(), 1);
        assert_eq!(printer.stats().lines, 4);
    }

    #[test]
    fn test_homing_reports_origin() {
        let status = SharedHardwareStatus::new();
        let mut printer = SimulatedPrinter::new(status, 20.0, 1.0);

        let all = printer.receive("G28").unwrap();
        assert_eq!(all.position(), Some(printstream_core::Vector3::ZERO));
        assert_eq!(all.extrusion(), None);

        let z_only = printer.receive("G28 Z").unwrap();
        assert_eq!(z_only.z(), Some(0.0));
        assert_eq!(z_only.x(), None);

        assert!(printer.receive("G1 X10").is_none());
        assert_eq!(printer.stats().homes, 2);
    }
}
