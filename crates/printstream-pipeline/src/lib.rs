//! # printstream Pipeline
//!
//! The G-code stream filters that sit between a sliced file and the printer
//! connection. Includes the line classifier and parser, the leveling surface,
//! the pull-based stream stages, and a builder that assembles them.

pub mod gcode;
pub mod leveling;
pub mod pipeline;
pub mod stream;

pub use gcode::{
    classify, dwell_line, first_number_after, is_movement, parse_move, serialize_move, LineKind,
    LEVELING_MARKER, NO_PROCESSING_SUFFIX,
};
pub use leveling::LevelingFunctions;
pub use pipeline::{StreamPipeline, StreamPipelineBuilder};
pub use stream::{
    BoxedStream, FileLineSource, GcodeStream, GcodeStreamExt, HardwareStatus,
    PrintLevelingStream, ReaderLineSource, SharedHardwareStatus, StreamLines, StringLineSource,
    VecLineSource, WaitForTempStream, WaitState, MAX_EXTRUDERS,
};
