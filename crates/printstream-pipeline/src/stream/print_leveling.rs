//! Software print leveling stage
//!
//! Rewrites every move so the nozzle follows the probed bed surface. The
//! first line of a leveled stream is [`LEVELING_MARKER`]; a stream that
//! already starts with it is passed through untouched, so leveling a leveled
//! file is a no-op.
//!
//! The stage tracks two positions:
//! - the *logical* destination: where the program asked to go, used as the
//!   base when a move omits an axis
//! - the *as-sent* destination: where the printer was actually told to go,
//!   including compensation

use super::{chain_debug_info, GcodeStream};
use crate::gcode::{
    classify, has_no_processing_suffix, parse_move, serialize_move, LineKind, LEVELING_MARKER,
};
use crate::leveling::LevelingFunctions;
use printstream_core::data::Axis;
use printstream_core::{GridShape, LevelingData, PrinterMove};
use printstream_settings::{keys, SettingsProvider};
use std::sync::Arc;

/// Stage that applies bed-leveling compensation to moves
pub struct PrintLevelingStream<S> {
    inner: S,
    settings: Arc<dyn SettingsProvider>,
    allow_leveling: bool,
    active_printing: bool,
    logical_destination: PrinterMove,
    last_destination: PrinterMove,
    functions: Option<LevelingFunctions>,
    /// Inputs of the last failed build, so a bad sample set warns once
    rejected: Option<(Arc<LevelingData>, GridShape, f64)>,
    wrote_marker: bool,
    already_leveled: bool,
    /// Line read ahead while checking for the marker; `Some(None)` is end of stream
    held: Option<Option<String>>,
}

impl<S: GcodeStream> PrintLevelingStream<S> {
    /// Stage name used in pipeline listings
    pub const NAME: &'static str = "print-leveling";

    /// Wrap `inner`, reading leveling settings from `settings`
    ///
    /// `active_printing` records whether this stream feeds a print (as opposed
    /// to manual commands); it is informational.
    pub fn new(settings: Arc<dyn SettingsProvider>, inner: S, active_printing: bool) -> Self {
        Self {
            inner,
            settings,
            allow_leveling: true,
            active_printing,
            logical_destination: PrinterMove::UNKNOWN,
            last_destination: PrinterMove::UNKNOWN,
            functions: None,
            rejected: None,
            wrote_marker: false,
            already_leveled: false,
            held: None,
        }
    }

    /// Permit or suspend leveling for this stage
    ///
    /// Used while probing, when moves must reach the printer uncompensated.
    pub fn set_allow_leveling(&mut self, allow: bool) {
        if allow != self.allow_leveling {
            tracing::debug!("Leveling {}", if allow { "allowed" } else { "suspended" });
        }
        self.allow_leveling = allow;
    }

    /// True when moves are currently being compensated
    pub fn leveling_active(&self) -> bool {
        self.allow_leveling
            && self.settings.get_bool(keys::PRINT_LEVELING_ENABLED)
            && !self.settings.get_bool(keys::HAS_HARDWARE_LEVELING)
    }

    /// True once the input was found to carry the leveling marker
    pub fn already_leveled(&self) -> bool {
        self.already_leveled
    }

    /// True when this stream feeds a print
    pub fn active_printing(&self) -> bool {
        self.active_printing
    }

    /// Destination most recently sent to the printer, compensation included
    pub fn last_destination(&self) -> PrinterMove {
        self.last_destination
    }

    /// Destination most recently requested, compensation excluded
    pub fn logical_destination(&self) -> PrinterMove {
        self.logical_destination
    }

    /// The wrapped stage
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the stage
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn next_inner(&mut self) -> Option<String> {
        match self.held.take() {
            Some(held) => held,
            None => self.inner.read_line(),
        }
    }

    /// Rebuild the leveling model if its inputs changed
    fn refresh_functions(&mut self) {
        let Some(data) = self.settings.leveling_data() else {
            if self.functions.take().is_some() {
                tracing::info!("Leveling data removed");
            }
            return;
        };
        let shape = self.settings.grid_shape();
        let probe_offset = self.settings.get_f64(keys::Z_PROBE_Z_OFFSET);

        if let Some(functions) = &self.functions {
            if functions.is_current_for(&data, shape, probe_offset) {
                return;
            }
        }

        if let Some((rejected, rejected_shape, rejected_offset)) = &self.rejected {
            if Arc::ptr_eq(rejected, &data)
                && *rejected_shape == shape
                && rejected_offset.to_bits() == probe_offset.to_bits()
            {
                return;
            }
        }

        match LevelingFunctions::build(&data, shape, probe_offset) {
            Ok(functions) => {
                tracing::info!(
                    "Built leveling model from {} samples ({} grid, probe offset {})",
                    data.len(),
                    shape,
                    probe_offset
                );
                self.functions = Some(functions);
                self.rejected = None;
            }
            Err(e) => {
                tracing::warn!("Leveling data unusable, moves pass through: {}", e);
                self.functions = None;
                self.rejected = Some((data, shape, probe_offset));
            }
        }
    }

    /// Compensate one movement line
    fn level_movement(&mut self, line: String) -> String {
        let current = parse_move(&line, &self.logical_destination);
        self.logical_destination = current;

        let Some(destination) = current.position() else {
            tracing::trace!("Destination not fully known, passing through: {}", line);
            self.last_destination = parse_move(&line, &self.last_destination);
            return line;
        };

        self.refresh_functions();
        match &self.functions {
            Some(functions) => {
                let leveled = functions.apply_leveling(&line, destination);
                self.last_destination = parse_move(&leveled, &current);
                tracing::trace!("Leveled '{}' -> '{}'", line, leveled);
                leveled
            }
            None => {
                self.last_destination = current;
                line
            }
        }
    }

    fn track_unmodified(&mut self, line: &str) {
        self.logical_destination = parse_move(line, &self.logical_destination);
        self.last_destination = parse_move(line, &self.last_destination);
    }
}

impl<S: GcodeStream> GcodeStream for PrintLevelingStream<S> {
    fn read_line(&mut self) -> Option<String> {
        if !self.wrote_marker && self.leveling_active() {
            self.wrote_marker = true;
            let first = self.inner.read_line();
            if first.as_deref().map(str::trim) == Some(LEVELING_MARKER) {
                tracing::debug!("Input is already leveled");
                self.already_leveled = true;
                return first;
            }
            self.held = Some(first);
            return Some(LEVELING_MARKER.to_string());
        }

        let mut line = self.next_inner()?;
        loop {
            if has_no_processing_suffix(&line) {
                return Some(line);
            }

            let kind = classify(&line);
            if kind == LineKind::LevelingMarker {
                self.already_leveled = true;
                return Some(line);
            }

            if !self.leveling_active() || self.already_leveled {
                if kind == LineKind::Movement {
                    self.track_unmodified(&line);
                }
                return Some(line);
            }

            match kind {
                LineKind::Movement => return Some(self.level_movement(line)),
                LineKind::BedProbe => {
                    tracing::debug!("Dropping '{}', the bed is already leveled in software", line);
                    line = self.next_inner()?;
                }
                _ => return Some(line),
            }
        }
    }

    fn set_printer_position(&mut self, position: PrinterMove) {
        if self.leveling_active() {
            if let Some(target) = position.position() {
                self.refresh_functions();
                let line = serialize_move(&position);
                let leveled_line = match &self.functions {
                    Some(functions) => functions.apply_leveling(&line, target),
                    None => line,
                };
                let leveled = parse_move(&leveled_line, &PrinterMove::UNKNOWN);
                let delta = leveled - position;

                let mut logical = position - delta;
                for axis in [Axis::E, Axis::F] {
                    match position.get(axis) {
                        Some(value) => logical.set(axis, value),
                        None => logical.clear(axis),
                    }
                }

                tracing::debug!("Printer position {} reconciled to {}", position, logical);
                self.logical_destination = logical;
                self.last_destination = position;
                self.inner.set_printer_position(logical);
                return;
            }
        }

        self.logical_destination.copy_known_settings(&position);
        self.last_destination.copy_known_settings(&position);
        self.inner.set_printer_position(position);
    }

    fn debug_info(&self) -> String {
        chain_debug_info(
            format!("Last Destination = {}", self.last_destination),
            self.inner.debug_info(),
        )
    }
}
