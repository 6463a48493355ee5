//! Temperature waits as dwell polling
//!
//! `M109` and `M190` block the firmware until a heater reaches its target,
//! during which it ignores everything the host sends. This stage rewrites them
//! into their non-blocking forms (`M104`, `M140`) and then emits dwell lines
//! until the reading reaches the target, so the host stays responsive and the
//! wait can be canceled.

use super::{chain_debug_info, GcodeStream, HardwareStatus};
use crate::gcode::{
    classify, dwell_line, first_number_after, has_no_processing_suffix, replace_command_word,
    LineKind,
};
use printstream_core::PrinterMove;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default dwell per poll, in milliseconds
pub const DEFAULT_DWELL_MS: u64 = 1000;

/// What the stage is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WaitState {
    /// Forwarding lines
    Passthrough,
    /// Polling an extruder until it reaches `target`
    WaitingForExtruderTemp {
        /// Target temperature
        target: f64,
        /// Extruder index
        tool: usize,
    },
    /// Polling the bed until it reaches `target`
    WaitingForBedTemp {
        /// Target temperature
        target: f64,
    },
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passthrough => write!(f, "passthrough"),
            Self::WaitingForExtruderTemp { target, tool } => {
                write!(f, "waiting for extruder {} to reach {}", tool, target)
            }
            Self::WaitingForBedTemp { target } => write!(f, "waiting for bed to reach {}", target),
        }
    }
}

/// Stage that turns blocking temperature waits into dwell polling
pub struct WaitForTempStream<S> {
    inner: S,
    hardware: Arc<dyn HardwareStatus>,
    state: WaitState,
    dwell_ms: u64,
    max_wait_polls: Option<u32>,
    polls: u32,
    reported_unreachable: bool,
}

impl<S: GcodeStream> WaitForTempStream<S> {
    /// Stage name used in pipeline listings
    pub const NAME: &'static str = "wait-for-temperature";

    /// Wrap `inner`, polling `hardware` while waiting
    pub fn new(inner: S, hardware: Arc<dyn HardwareStatus>) -> Self {
        Self {
            inner,
            hardware,
            state: WaitState::Passthrough,
            dwell_ms: DEFAULT_DWELL_MS,
            max_wait_polls: None,
            polls: 0,
            reported_unreachable: false,
        }
    }

    /// Dwell length emitted per poll
    pub fn with_dwell_ms(mut self, dwell_ms: u64) -> Self {
        self.dwell_ms = dwell_ms;
        self
    }

    /// Abandon a wait after this many dwells
    pub fn with_max_wait_polls(mut self, limit: Option<u32>) -> Self {
        self.max_wait_polls = limit;
        self
    }

    /// Current state
    pub fn state(&self) -> WaitState {
        self.state
    }

    /// The wrapped stage
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the stage
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn enter(&mut self, state: WaitState) {
        tracing::debug!("Temperature wait: {}", state);
        self.state = state;
        self.polls = 0;
        self.reported_unreachable = false;
    }

    /// Read and classify one inner line while passing through
    fn passthrough(&mut self) -> Option<String> {
        let line = self.inner.read_line()?;
        if has_no_processing_suffix(&line) {
            return Some(line);
        }

        match classify(&line) {
            LineKind::WaitExtruderTemp => {
                let target = first_number_after('S', &line).unwrap_or(0.0);
                let tool = first_number_after('T', &line)
                    .filter(|t| *t >= 0.0)
                    .map_or(0, |t| t as usize);
                self.enter(WaitState::WaitingForExtruderTemp { target, tool });
                Some(replace_command_word(&line, "M104"))
            }
            LineKind::WaitBedTemp => {
                let target = first_number_after('S', &line).unwrap_or(0.0);
                self.enter(WaitState::WaitingForBedTemp { target });
                Some(replace_command_word(&line, "M140"))
            }
            _ => Some(line),
        }
    }

    /// Decide whether to dwell once more
    fn keep_waiting(&mut self, reading: Option<f64>, target: f64) -> bool {
        if self.hardware.print_canceled() {
            tracing::debug!("Print canceled, ending temperature wait");
            return false;
        }

        match reading {
            Some(temperature) if temperature >= target => {
                tracing::debug!("Reached {} (target {}) after {} polls", temperature, target, self.polls);
                return false;
            }
            Some(temperature) => {
                tracing::trace!("At {} of {}", temperature, target);
            }
            None if !self.reported_unreachable => {
                tracing::warn!("Printer status unavailable while waiting for {}", target);
                self.reported_unreachable = true;
            }
            None => {}
        }

        if let Some(limit) = self.max_wait_polls {
            if self.polls >= limit {
                tracing::warn!("Gave up waiting for {} after {} polls", target, self.polls);
                return false;
            }
        }

        self.polls += 1;
        true
    }
}

impl<S: GcodeStream> GcodeStream for WaitForTempStream<S> {
    fn read_line(&mut self) -> Option<String> {
        loop {
            let (reading, target) = match self.state {
                WaitState::Passthrough => return self.passthrough(),
                WaitState::WaitingForExtruderTemp { target, tool } => {
                    (self.hardware.extruder_temperature(tool), target)
                }
                WaitState::WaitingForBedTemp { target } => (self.hardware.bed_temperature(), target),
            };

            if self.keep_waiting(reading, target) {
                return Some(dwell_line(self.dwell_ms));
            }
            self.state = WaitState::Passthrough;
        }
    }

    fn set_printer_position(&mut self, position: PrinterMove) {
        self.inner.set_printer_position(position);
    }

    fn debug_info(&self) -> String {
        chain_debug_info(format!("Wait state = {}", self.state), self.inner.debug_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{SharedHardwareStatus, VecLineSource};

    fn stage(lines: &[&str], status: &SharedHardwareStatus) -> WaitForTempStream<VecLineSource> {
        WaitForTempStream::new(VecLineSource::new(lines.iter().copied()), Arc::new(status.clone()))
    }

    #[test]
    fn test_extruder_wait_polls_until_reached() {
        let status = SharedHardwareStatus::new();
        status.set_extruder_temperature(0, 150.0);
        let mut s = stage(&["M109 S200", "G28"], &status);

        assert_eq!(s.read_line().as_deref(), Some("M104 S200"));
        assert_eq!(
            s.state(),
            WaitState::WaitingForExtruderTemp { target: 200.0, tool: 0 }
        );
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));

        status.set_extruder_temperature(0, 200.0);
        assert_eq!(s.read_line().as_deref(), Some("G28"));
        assert_eq!(s.state(), WaitState::Passthrough);
        assert_eq!(s.read_line(), None);
    }

    #[test]
    fn test_tool_selection() {
        let status = SharedHardwareStatus::new();
        status.set_extruder_temperature(0, 250.0);
        status.set_extruder_temperature(1, 20.0);
        let mut s = stage(&["M109 S210 T1"], &status);

        assert_eq!(s.read_line().as_deref(), Some("M104 S210 T1"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));
        status.set_extruder_temperature(1, 211.0);
        assert_eq!(s.read_line(), None);
    }

    #[test]
    fn test_bed_wait() {
        let status = SharedHardwareStatus::new();
        status.set_bed_temperature(65.0);
        let mut s = stage(&["M190 S60", "G1 X1"], &status).with_dwell_ms(250);

        assert_eq!(s.read_line().as_deref(), Some("M140 S60"));
        assert_eq!(s.read_line().as_deref(), Some("G1 X1"));
    }

    #[test]
    fn test_cancel_ends_wait() {
        let status = SharedHardwareStatus::new();
        let mut s = stage(&["M190 S60", "M84"], &status).with_dwell_ms(250);

        assert_eq!(s.read_line().as_deref(), Some("M140 S60"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P250"));
        status.set_canceled(true);
        assert_eq!(s.read_line().as_deref(), Some("M84"));
    }

    #[test]
    fn test_poll_limit_abandons_wait() {
        let status = SharedHardwareStatus::new();
        let mut s = stage(&["M109 S200", "G28"], &status).with_max_wait_polls(Some(2));

        assert_eq!(s.read_line().as_deref(), Some("M104 S200"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));
        assert_eq!(s.read_line().as_deref(), Some("G28"));
    }

    #[test]
    fn test_unreachable_counts_as_not_reached() {
        let status = SharedHardwareStatus::new();
        status.set_reachable(false);
        let mut s = stage(&["M109 S200"], &status);

        assert_eq!(s.read_line().as_deref(), Some("M104 S200"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));
        assert_eq!(s.read_line().as_deref(), Some("G4 P1000"));
        status.set_reachable(true);
        status.set_extruder_temperature(0, 200.0);
        assert_eq!(s.read_line(), None);
    }

    #[test]
    fn test_no_processing_and_other_lines_untouched() {
        let status = SharedHardwareStatus::new();
        let mut s = stage(&["M109 S200 ; NO_PROCESSING", "M104 S180", "; hi"], &status);

        assert_eq!(s.read_line().as_deref(), Some("M109 S200 ; NO_PROCESSING"));
        assert_eq!(s.state(), WaitState::Passthrough);
        assert_eq!(s.read_line().as_deref(), Some("M104 S180"));
        assert_eq!(s.read_line().as_deref(), Some("; hi"));
        assert_eq!(s.read_line(), None);
    }

    #[test]
    fn test_missing_target_does_not_wait() {
        let status = SharedHardwareStatus::new();
        let mut s = stage(&["M109", "G28"], &status);
        assert_eq!(s.read_line().as_deref(), Some("M104"));
        assert_eq!(s.read_line().as_deref(), Some("G28"));
    }

    #[test]
    fn test_debug_info_includes_inner() {
        let status = SharedHardwareStatus::new();
        let s = stage(&["G28"], &status);
        assert_eq!(s.debug_info(), "Wait state = passthrough | Source 1 lines left");
    }
}
