//! Pull-based G-code line streams
//!
//! Every stage wraps exactly one inner stage and produces lines on demand.
//! The consumer (usually the printer connection) pulls the outermost stage;
//! each stage pulls its inner stage only when it needs a new line. A stage
//! may emit lines of its own (a dwell while waiting, the leveling marker)
//! without consuming input.

pub mod hardware;
pub mod print_leveling;
pub mod source;
pub mod wait_for_temp;

pub use hardware::{HardwareSnapshot, HardwareStatus, SharedHardwareStatus, MAX_EXTRUDERS};
pub use print_leveling::PrintLevelingStream;
pub use source::{FileLineSource, ReaderLineSource, StringLineSource, VecLineSource};
pub use wait_for_temp::{WaitForTempStream, WaitState};

use printstream_core::PrinterMove;

/// A stage in a G-code stream chain
pub trait GcodeStream {
    /// Produce the next line, or `None` at end of stream
    ///
    /// Once `None` has been returned the stream stays exhausted.
    fn read_line(&mut self) -> Option<String>;

    /// Inform the stage of the printer's actual position
    ///
    /// Called after an event that moves the machine outside the stream
    /// (homing, a manual jog). Filters reconcile their tracked position and
    /// forward the call inward.
    fn set_printer_position(&mut self, _position: PrinterMove) {}

    /// Human-readable state, for diagnostics
    fn debug_info(&self) -> String {
        String::new()
    }
}

/// An owned, type-erased stage
pub type BoxedStream = Box<dyn GcodeStream + Send>;

impl<S: GcodeStream + ?Sized> GcodeStream for Box<S> {
    fn read_line(&mut self) -> Option<String> {
        (**self).read_line()
    }

    fn set_printer_position(&mut self, position: PrinterMove) {
        (**self).set_printer_position(position)
    }

    fn debug_info(&self) -> String {
        (**self).debug_info()
    }
}

impl<S: GcodeStream + ?Sized> GcodeStream for &mut S {
    fn read_line(&mut self) -> Option<String> {
        (**self).read_line()
    }

    fn set_printer_position(&mut self, position: PrinterMove) {
        (**self).set_printer_position(position)
    }

    fn debug_info(&self) -> String {
        (**self).debug_info()
    }
}

/// Join a stage's own state with its inner stage's, outermost first
pub(crate) fn chain_debug_info(own: String, inner: String) -> String {
    if inner.is_empty() {
        own
    } else {
        format!("{} | {}", own, inner)
    }
}

/// Iterator over the lines of a stream
#[derive(Debug)]
pub struct StreamLines<S> {
    stream: S,
}

impl<S> StreamLines<S> {
    /// Recover the wrapped stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: GcodeStream> Iterator for StreamLines<S> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.stream.read_line()
    }
}

/// Adapters available on every stream
pub trait GcodeStreamExt: GcodeStream + Sized {
    /// Iterate the remaining lines
    fn lines(self) -> StreamLines<Self> {
        StreamLines { stream: self }
    }
}

impl<S: GcodeStream> GcodeStreamExt for S {}
