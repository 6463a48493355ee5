//! # printstream
//!
//! Streams G-code from a sliced file toward a printer connection through a
//! chain of filters:
//! - **Temperature waits**: blocking `M109`/`M190` become `M104`/`M140`
//!   followed by dwell polling until the heater is at temperature
//! - **Print leveling**: every move is compensated for the probed bed surface
//!
//! ## Architecture
//!
//! printstream is organized as a workspace with multiple crates:
//!
//! 1. **printstream-core** - Position model, leveling samples, error types
//! 2. **printstream-settings** - Settings lookup, live store, config files
//! 3. **printstream-pipeline** - Line parser, leveling surface, stream filters
//! 4. **printstream** - CLI that drives the pipeline against a simulated printer

pub mod simulate;

pub use printstream_core::{
    Error, GcodeError, GridShape, LevelingData, LevelingError, PrinterMove, Result, Vector3,
};
pub use printstream_pipeline::{
    GcodeStream, GcodeStreamExt, LevelingFunctions, PrintLevelingStream, SharedHardwareStatus,
    StreamPipeline, WaitForTempStream,
};
pub use printstream_settings::{Config, PipelineSettings, PrinterSettings, SettingsStore};
pub use simulate::SimulatedPrinter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout carries nothing but G-code
/// - RUST_LOG environment variable support, falling back to `default_level`
/// - Text or JSON formatting
pub fn init_logging(default_level: tracing::Level, format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    match format {
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(false);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
