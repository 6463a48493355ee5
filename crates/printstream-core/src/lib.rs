//! # printstream Core
//!
//! Core types shared by every stage of the printstream pipeline.
//! Provides the printer position model, probed bed-leveling data,
//! and the error taxonomy used by the settings and pipeline crates.

pub mod data;
pub mod error;
pub mod types;

pub use data::{GridShape, KnownAxes, LevelingData, PrinterMove, Vector3};

pub use error::{Error, GcodeError, LevelingError, Result};

pub use types::{thread_safe_rw, ThreadSafeRw};
