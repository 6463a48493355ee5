//! G-Code stream pipeline assembly
//!
//! Builds the standard filter chain on top of a line source:
//!
//! ```text
//! source -> wait-for-temperature -> print-leveling -> consumer
//! ```
//!
//! # Example
//! ```
//! use printstream_pipeline::{GcodeStreamExt, SharedHardwareStatus, StreamPipeline, StringLineSource};
//! use printstream_settings::PrinterSettings;
//!
//! let hardware = SharedHardwareStatus::new();
//! hardware.set_bed_temperature(60.0);
//!
//! let pipeline = StreamPipeline::builder(StringLineSource::new("M190 S60\nG28\n"))
//!     .settings(PrinterSettings::default())
//!     .hardware(hardware)
//!     .build();
//!
//! let lines: Vec<String> = pipeline.lines().collect();
//! assert_eq!(lines, ["M140 S60", "G28"]);
//! ```

use std::sync::Arc;

use crate::stream::{
    BoxedStream, GcodeStream, HardwareStatus, PrintLevelingStream, WaitForTempStream,
};
use printstream_core::PrinterMove;
use printstream_settings::{PipelineSettings, PrinterSettings, SettingsProvider};

/// Name of the bottom stage in [`StreamPipeline::list_stages`]
pub const SOURCE_STAGE: &str = "source";

/// An assembled filter chain
pub struct StreamPipeline {
    head: BoxedStream,
    stages: Vec<&'static str>,
}

impl StreamPipeline {
    /// Start building a pipeline over `source`
    pub fn builder(source: impl GcodeStream + Send + 'static) -> StreamPipelineBuilder {
        StreamPipelineBuilder::new(Box::new(source))
    }

    /// Stage names, innermost first
    pub fn list_stages(&self) -> &[&'static str] {
        &self.stages
    }

    /// Number of stages including the source
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// True when the named stage is part of the chain
    pub fn has_stage(&self, name: &str) -> bool {
        self.stages.contains(&name)
    }
}

impl GcodeStream for StreamPipeline {
    fn read_line(&mut self) -> Option<String> {
        self.head.read_line()
    }

    fn set_printer_position(&mut self, position: PrinterMove) {
        self.head.set_printer_position(position);
    }

    fn debug_info(&self) -> String {
        self.head.debug_info()
    }
}

/// Builder for [`StreamPipeline`]
pub struct StreamPipelineBuilder {
    source: BoxedStream,
    settings: Option<Arc<dyn SettingsProvider>>,
    hardware: Option<Arc<dyn HardwareStatus>>,
    config: PipelineSettings,
}

impl StreamPipelineBuilder {
    fn new(source: BoxedStream) -> Self {
        Self {
            source,
            settings: None,
            hardware: None,
            config: PipelineSettings::default(),
        }
    }

    /// Printer settings the leveling stage reads
    ///
    /// Without settings, leveling stays off.
    pub fn settings(mut self, settings: impl SettingsProvider + 'static) -> Self {
        self.settings = Some(Arc::new(settings));
        self
    }

    /// Shared printer settings
    pub fn shared_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Printer status the temperature-wait stage polls
    ///
    /// Without a status source, temperature waits pass through unchanged.
    pub fn hardware(mut self, hardware: impl HardwareStatus + 'static) -> Self {
        self.hardware = Some(Arc::new(hardware));
        self
    }

    /// Which stages to include and how they behave
    pub fn config(mut self, config: PipelineSettings) -> Self {
        self.config = config;
        self
    }

    /// Assemble the chain
    pub fn build(self) -> StreamPipeline {
        let mut head = self.source;
        let mut stages = vec![SOURCE_STAGE];

        if self.config.wait_for_temperature {
            match self.hardware {
                Some(hardware) => {
                    head = Box::new(
                        WaitForTempStream::new(head, hardware)
                            .with_dwell_ms(self.config.dwell_ms)
                            .with_max_wait_polls(self.config.max_wait_polls),
                    );
                    stages.push(WaitForTempStream::<BoxedStream>::NAME);
                }
                None => {
                    tracing::warn!("No printer status available, temperature waits pass through")
                }
            }
        }

        if self.config.print_leveling {
            let settings = self
                .settings
                .unwrap_or_else(|| Arc::new(PrinterSettings::default()));
            head = Box::new(PrintLevelingStream::new(
                settings,
                head,
                self.config.active_printing,
            ));
            stages.push(PrintLevelingStream::<BoxedStream>::NAME);
        }

        tracing::debug!("Assembled stream pipeline: {}", stages.join(" -> "));
        StreamPipeline { head, stages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::LEVELING_MARKER;
    use crate::stream::{GcodeStreamExt, SharedHardwareStatus, VecLineSource};
    use printstream_core::{GridShape, LevelingData};

    fn leveled_settings() -> PrinterSettings {
        PrinterSettings {
            print_leveling_enabled: true,
            leveling: Some(Arc::new(LevelingData::flat(
                GridShape::default(),
                (0.0, 0.0),
                (200.0, 200.0),
                0.1,
            ))),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_stages() {
        let pipeline = StreamPipeline::builder(VecLineSource::new(["G28"]))
            .hardware(SharedHardwareStatus::new())
            .build();
        assert_eq!(
            pipeline.list_stages(),
            [SOURCE_STAGE, "wait-for-temperature", "print-leveling"]
        );
        assert_eq!(pipeline.stage_count(), 3);
    }

    #[test]
    fn test_stages_follow_config() {
        let config = PipelineSettings {
            print_leveling: false,
            ..Default::default()
        };
        let pipeline = StreamPipeline::builder(VecLineSource::new(["G28"]))
            .hardware(SharedHardwareStatus::new())
            .config(config)
            .build();
        assert!(pipeline.has_stage("wait-for-temperature"));
        assert!(!pipeline.has_stage("print-leveling"));

        let pipeline = StreamPipeline::builder(VecLineSource::new(["M109 S200"])).build();
        assert!(!pipeline.has_stage("wait-for-temperature"));
        assert_eq!(pipeline.lines().collect::<Vec<_>>(), ["M109 S200"]);
    }

    #[test]
    fn test_full_chain() {
        let hardware = SharedHardwareStatus::new();
        hardware.set_extruder_temperature(0, 210.0);
        let config = PipelineSettings {
            dwell_ms: 500,
            ..Default::default()
        };

        let pipeline = StreamPipeline::builder(VecLineSource::new([
            "M109 S200",
            "G29",
            "G1 X10 Y10 Z0.2 F1200",
        ]))
        .settings(leveled_settings())
        .hardware(hardware)
        .config(config)
        .build();

        let lines: Vec<String> = pipeline.lines().collect();
        assert_eq!(
            lines,
            [LEVELING_MARKER, "M104 S200", "G1 X10 Y10 Z0.3 F1200"]
        );
    }

    #[test]
    fn test_dwell_emitted_through_leveling() {
        let hardware = SharedHardwareStatus::new();
        let mut pipeline = StreamPipeline::builder(VecLineSource::new(["M190 S60", "G28"]))
            .settings(leveled_settings())
            .hardware(hardware.clone())
            .build();

        assert_eq!(pipeline.read_line().as_deref(), Some(LEVELING_MARKER));
        assert_eq!(pipeline.read_line().as_deref(), Some("M140 S60"));
        assert_eq!(pipeline.read_line().as_deref(), Some("G4 P1000"));
        hardware.set_bed_temperature(60.0);
        assert_eq!(pipeline.read_line().as_deref(), Some("G28"));
        assert_eq!(pipeline.read_line(), None);
        assert!(pipeline.debug_info().contains("Wait state = passthrough"));
    }
}
