//! Error handling for printstream
//!
//! Provides the error types for the layers that can actually fail:
//! - G-Code errors (malformed parameter values)
//! - Leveling errors (probed sample sets that cannot form a surface)
//!
//! The streaming filters themselves never surface these to the consumer.
//! A filter that hits one logs it and degrades to pass-through, so the stream
//! always yields a line or a clean end-of-stream.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// G-Code error type
///
/// Represents errors related to reading numeric parameters out of a G-Code line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// A parameter letter was present but its value was not a number
    #[error("Invalid parameter '{param}' in '{line}': {reason}")]
    InvalidParameter {
        /// The G-Code line being parsed.
        line: String,
        /// The parameter letter.
        param: char,
        /// The reason the parameter is invalid.
        reason: String,
    },
}

/// Leveling error type
///
/// Raised while turning a probed sample set into an interpolation surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LevelingError {
    /// Sample count does not match the configured grid shape
    #[error("Expected {expected} leveling samples for a {width}x{height} grid, got {actual}")]
    SampleCountMismatch {
        /// Grid width (columns).
        width: usize,
        /// Grid height (rows).
        height: usize,
        /// Number of samples the grid requires.
        expected: usize,
        /// Number of samples provided.
        actual: usize,
    },

    /// Grid needs at least two columns and two rows to span a surface
    #[error("Leveling grid {width}x{height} is too small (minimum 2x2)")]
    GridTooSmall {
        /// Grid width (columns).
        width: usize,
        /// Grid height (rows).
        height: usize,
    },

    /// Grid dimensions whose sample count does not fit in memory
    #[error("Leveling grid {width}x{height} is too large")]
    GridTooLarge {
        /// Grid width (columns).
        width: usize,
        /// Grid height (rows).
        height: usize,
    },

    /// Samples do not lie on a rectilinear grid of the configured shape
    #[error("Leveling samples do not form a rectilinear grid: {reason}")]
    NotRectilinear {
        /// Description of the layout problem.
        reason: String,
    },

    /// A sample coordinate is NaN or infinite
    #[error("Leveling sample {index} is not finite")]
    NonFiniteSample {
        /// Index of the offending sample.
        index: usize,
    },

    /// The configured probe offset is NaN or infinite
    #[error("Probe offset {offset} is not finite")]
    NonFiniteOffset {
        /// The offending offset.
        offset: f64,
    },
}

/// Main error type for printstream
///
/// A unified error type that can represent any error from the core layers.
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Leveling error
    #[error(transparent)]
    Leveling(#[from] LevelingError),

    /// Standard I/O error, e.g. opening a G-code file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a leveling error
    pub fn is_leveling_error(&self) -> bool {
        matches!(self, Error::Leveling(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
