//! ---
//! sdadc_section: "01-core-functionality"
//! sdadc_subsection: "binary"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Binary entrypoint for the frequency-response testbench."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, ValueEnum};
use sdadc_common::config::env;
use sdadc_common::{
    init_tracing, LogFormat, Polarity, ResetWindow, RunConfig, Spacing,
};
use sdadc_freqz::{CsvResultSink, FrequencySweep, SweepReport};
use sdadc_sim::{SigmaDeltaAdc, SimulationSession};
use tracing::info;

const SERVICE_NAME: &str = "sdadc-tb";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Measure the frequency response of the sigma-delta ADC model",
    long_about = None
)]
struct Cli {
    /// TOML configuration file. Without it the harness reads its parameters
    /// from the environment (VCC, OVERSAMPLE_RATE, SCLK, ...).
    #[arg(long, value_name = "FILE", env = RunConfig::ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Warm-up cycles before the first frequency point
    #[arg(long)]
    settle_cycles: Option<u64>,

    /// Hold reset during warm-up cycles START:END (inclusive)
    #[arg(long, value_name = "START:END", value_parser = parse_reset_window)]
    settle_reset: Option<ResetWindow>,

    /// Stdout log format
    #[arg(long, value_enum)]
    log_format: Option<CliLogFormat>,

    /// Also write a JSON log file into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Skip writing summary.json
    #[arg(long, action = ArgAction::SetTrue)]
    no_summary: bool,

    /// Print the frequency plan and exit without simulating
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

/// Values that take precedence over the configuration source.
#[derive(Debug, Clone, Default, Args)]
struct Overrides {
    /// Supply voltage in volts
    #[arg(long)]
    vcc: Option<f64>,

    #[arg(long)]
    oversample_rate: Option<u32>,

    /// Output sample clock in hertz
    #[arg(long)]
    sclk: Option<u32>,

    #[arg(long)]
    cic_stages: Option<u32>,

    /// Stimulus amplitude as a fraction of half the supply
    #[arg(long)]
    scale: Option<f64>,

    #[arg(long)]
    start_freq: Option<u32>,

    #[arg(long)]
    end_freq: Option<u32>,

    /// Number of frequency points, bounds included
    #[arg(long)]
    num_freq: Option<usize>,

    /// Periods observed at every frequency
    #[arg(long)]
    num_per: Option<u32>,

    #[arg(long, value_enum)]
    spacing: Option<CliSpacing>,

    #[arg(long, value_enum)]
    polarity: Option<CliPolarity>,

    /// Also write the phase series
    #[arg(long, action = ArgAction::SetTrue)]
    phase: bool,

    /// Record a VCD waveform trace to FILE
    #[arg(long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Directory receiving the result series
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSpacing {
    Linear,
    Log,
}

impl From<CliSpacing> for Spacing {
    fn from(value: CliSpacing) -> Self {
        match value {
            CliSpacing::Linear => Spacing::Linear,
            CliSpacing::Log => Spacing::Logarithmic,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPolarity {
    Unsigned,
    Signed,
}

impl From<CliPolarity> for Polarity {
    fn from(value: CliPolarity) -> Self {
        match value {
            CliPolarity::Unsigned => Polarity::Unsigned,
            CliPolarity::Signed => Polarity::Signed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Pretty,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Pretty => LogFormat::Pretty,
            CliLogFormat::Json => LogFormat::StructuredJson,
        }
    }
}

impl Overrides {
    /// Answer an environment lookup from the command line, if the matching
    /// flag was given.
    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            env::VCC => self.vcc.map(|v| v.to_string()),
            env::OVERSAMPLE_RATE => self.oversample_rate.map(|v| v.to_string()),
            env::SCLK => self.sclk.map(|v| v.to_string()),
            env::CIC_STAGES => self.cic_stages.map(|v| v.to_string()),
            env::SCALE => self.scale.map(|v| v.to_string()),
            env::START_FREQ => self.start_freq.map(|v| v.to_string()),
            env::END_FREQ => self.end_freq.map(|v| v.to_string()),
            env::NUM_FREQ => self.num_freq.map(|v| v.to_string()),
            env::NUM_PER => self.num_per.map(|v| v.to_string()),
            env::LOG => self
                .spacing
                .map(|v| Spacing::from(v).is_logarithmic().to_string()),
            env::SIGNED => self
                .polarity
                .map(|v| (Polarity::from(v) == Polarity::Signed).to_string()),
            env::PHASE => self.phase.then(|| "true".to_owned()),
            env::TRACE => self.trace.as_ref().map(|p| p.display().to_string()),
            env::OUTPUT_DIR => self.output_dir.as_ref().map(|p| p.display().to_string()),
            _ => None,
        }
    }

    fn apply(&self, config: &mut RunConfig) {
        let harness = &mut config.harness;
        if let Some(vcc) = self.vcc {
            harness.vcc = vcc;
        }
        if let Some(ratio) = self.oversample_rate {
            harness.oversample_ratio = ratio;
        }
        if let Some(sclk) = self.sclk {
            harness.sample_clock_hz = sclk;
        }
        if let Some(stages) = self.cic_stages {
            harness.cic_stages = stages;
        }
        if let Some(scale) = self.scale {
            harness.scale = scale;
        }

        let sweep = &mut config.sweep;
        if let Some(start) = self.start_freq {
            sweep.start_freq = start;
        }
        if let Some(end) = self.end_freq {
            sweep.end_freq = end;
        }
        if let Some(steps) = self.num_freq {
            sweep.num_steps = steps;
        }
        if let Some(periods) = self.num_per {
            sweep.num_periods = periods;
        }
        if let Some(spacing) = self.spacing {
            sweep.spacing = spacing.into();
        }
        if let Some(polarity) = self.polarity {
            sweep.polarity = polarity.into();
        }
        if self.phase {
            sweep.emit_phase = true;
        }

        if let Some(trace) = &self.trace {
            config.output.trace = Some(trace.clone());
        }
        if let Some(directory) = &self.output_dir {
            config.output.directory = directory.clone();
        }
    }
}

fn parse_reset_window(raw: &str) -> std::result::Result<ResetWindow, String> {
    let (start, end) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got {}", raw))?;
    let start = start
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("invalid reset start {}: {}", start, err))?;
    let end = end
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("invalid reset end {}: {}", end, err))?;
    ResetWindow::new(start, end).map_err(|err| err.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli, |key| std::env::var(key).ok())?;
    init_tracing(SERVICE_NAME, &config.logging).context("failed to initialise tracing")?;

    let sweep = FrequencySweep::new(config.harness, config.sweep.clone())
        .context("invalid frequency sweep")?;
    if cli.dry_run {
        print_plan(&sweep);
        return Ok(());
    }

    run(&config, &sweep)?;
    Ok(())
}

/// Merge the configuration source with command-line values. `env_lookup`
/// stands in for the process environment.
fn resolve_config<F>(cli: &Cli, env_lookup: F) -> Result<RunConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = RunConfig::from_path(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            cli.overrides.apply(&mut config);
            config
        }
        None => RunConfig::from_lookup(|key| cli.overrides.lookup(key).or_else(|| env_lookup(key)))
            .context("failed to read harness parameters from the environment")?,
    };

    if let Some(cycles) = cli.settle_cycles {
        config.sweep.settle_cycles = cycles;
    }
    if let Some(window) = cli.settle_reset {
        config.sweep.settle_reset = Some(window);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    if let Some(directory) = &cli.log_dir {
        config.logging.directory = Some(directory.clone());
    }
    if cli.no_summary {
        config.output.summary = false;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run(config: &RunConfig, sweep: &FrequencySweep) -> Result<SweepReport> {
    let started = Instant::now();
    let mut session = SimulationSession::new(SigmaDeltaAdc::from_config(&config.harness));
    if let Some(path) = &config.output.trace {
        session
            .open_trace(path)
            .with_context(|| format!("failed to open waveform trace {}", path.display()))?;
    }

    let directory = &config.output.directory;
    let mut sink = CsvResultSink::create(directory, config.sweep.emit_phase)
        .with_context(|| format!("failed to prepare result directory {}", directory.display()))?;

    let report = sweep
        .run(&mut session, &mut sink)
        .context("frequency sweep failed")?;
    session.finish().context("failed to close waveform trace")?;

    report.log_table();
    if config.output.summary {
        report
            .write_json(directory)
            .context("failed to write sweep summary")?;
    }

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        output_dir = %directory.display(),
        "testbench finished"
    );
    Ok(report)
}

fn print_plan(sweep: &FrequencySweep) {
    println!(
        "{:>12}  {:>10}  {:>8}",
        "frequency_hz", "per_len", "samples"
    );
    for timing in sweep.timings() {
        println!(
            "{:>12.2}  {:>10}  {:>8}",
            timing.frequency_hz, timing.per_len, timing.samples_per_period
        );
    }
}
