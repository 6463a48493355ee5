use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use printstream::{
    init_logging, Config, GcodeStream, LogFormat, SettingsStore, SharedHardwareStatus,
    SimulatedPrinter, StreamPipeline,
};
use printstream_pipeline::FileLineSource;

/// Stream a G-code file through the leveling and temperature-wait filters
#[derive(Parser, Debug)]
#[command(name = "printstream", version, about)]
struct Args {
    /// G-code file to stream
    input: PathBuf,

    /// Config file (.toml or .json); defaults to the platform config location
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the filtered stream here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip the print-leveling stage
    #[arg(long)]
    no_leveling: bool,

    /// Skip the temperature-wait stage
    #[arg(long)]
    no_temp_wait: bool,

    /// Simulated heater response, degrees per second
    #[arg(long, value_name = "DEG_PER_S", default_value_t = 5.0)]
    heat_rate: f64,

    /// Abandon a temperature wait after this many dwells
    #[arg(long, value_name = "N")]
    max_wait_polls: Option<u32>,

    /// Starting temperature of the simulated heaters
    #[arg(long, value_name = "C", default_value_t = 20.0)]
    start_temp: f64,

    /// Override a printer setting, e.g. --set print_leveling_enabled=true
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()));
    }

    match Config::default_path() {
        Ok(path) if path.exists() => Config::load_from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        _ => {
            tracing::debug!("No config file, using defaults");
            Ok(Config::default())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let format = if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_logging(level, format)?;

    if !args.heat_rate.is_finite() || args.heat_rate <= 0.0 {
        bail!("--heat-rate must be a positive number");
    }

    let mut config = load_config(args.config.as_deref())?;
    if args.no_leveling {
        config.pipeline.print_leveling = false;
    }
    if args.no_temp_wait {
        config.pipeline.wait_for_temperature = false;
    }
    if args.max_wait_polls.is_some() {
        config.pipeline.max_wait_polls = args.max_wait_polls;
    }

    let store = SettingsStore::new(config.printer);
    for entry in &args.overrides {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("--set expects KEY=VALUE, got '{}'", entry);
        };
        store
            .set_from_str(key.trim(), value.trim())
            .with_context(|| format!("applying --set {}", entry))?;
    }

    let source = FileLineSource::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;

    let hardware = SharedHardwareStatus::new();
    let mut printer = SimulatedPrinter::new(hardware.clone(), args.start_temp, args.heat_rate);

    let mut pipeline = StreamPipeline::builder(source)
        .settings(store)
        .hardware(hardware)
        .config(config.pipeline)
        .build();
    tracing::info!(
        "printstream {} ({}): {}",
        printstream::VERSION,
        printstream::BUILD_DATE,
        pipeline.list_stages().join(" -> ")
    );

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);

    while let Some(line) = pipeline.read_line() {
        writeln!(out, "{}", line).context("writing output")?;
        if let Some(position) = printer.receive(&line) {
            pipeline.set_printer_position(position);
        }
    }
    out.flush().context("writing output")?;

    let stats = printer.stats();
    tracing::info!(
        "Streamed {} lines ({} dwells, {:.1}s waiting)",
        stats.lines,
        stats.dwells,
        stats.dwell_ms as f64 / 1000.0
    );
    tracing::debug!("Final state: {}", pipeline.debug_info());

    Ok(())
}
