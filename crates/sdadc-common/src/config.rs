//! ---
//! sdadc_section: "01-core-functionality"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Shared primitives for the co-simulation harness."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::logging::LogFormat;

/// Environment variable names understood by [`RunConfig::from_env`].
pub mod env {
    pub const VCC: &str = "VCC";
    pub const OVERSAMPLE_RATE: &str = "OVERSAMPLE_RATE";
    pub const SCLK: &str = "SCLK";
    pub const CIC_STAGES: &str = "CIC_STAGES";
    pub const SCALE: &str = "SCALE";
    pub const START_FREQ: &str = "START_FREQ";
    pub const END_FREQ: &str = "END_FREQ";
    pub const NUM_FREQ: &str = "NUM_FREQ";
    pub const NUM_PER: &str = "NUM_PER";
    pub const LOG: &str = "LOG";
    pub const SIGNED: &str = "SIGNED";
    pub const PHASE: &str = "PHASE";
    pub const TRACE: &str = "TRACE";
    pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
}

pub const DEFAULT_SCALE: f64 = 0.99;
pub const DEFAULT_SETTLE_CYCLES: u64 = 32_768;

// Output codes are converted through f64, keep them exactly representable.
const MAX_FULL_SCALE: u64 = 1 << 52;

fn default_scale() -> f64 {
    DEFAULT_SCALE
}

fn default_settle_cycles() -> u64 {
    DEFAULT_SETTLE_CYCLES
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("tb_dumps")
}

fn default_trace_path() -> PathBuf {
    PathBuf::from("dump.vcd")
}

fn default_summary() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Spacing of the interior points of a frequency sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    #[default]
    Linear,
    Logarithmic,
}

impl Spacing {
    pub fn from_log_flag(log: bool) -> Self {
        if log {
            Spacing::Logarithmic
        } else {
            Spacing::Linear
        }
    }

    pub fn is_logarithmic(&self) -> bool {
        matches!(self, Spacing::Logarithmic)
    }
}

/// Interpretation of the converter's digital output word.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Unsigned,
    Signed,
}

impl Polarity {
    pub fn from_signed_flag(signed: bool) -> Self {
        if signed {
            Polarity::Signed
        } else {
            Polarity::Unsigned
        }
    }
}

/// Electrical and decimation parameters of the converter under test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HarnessConfig {
    /// Supply voltage in volts.
    pub vcc: f64,
    pub oversample_ratio: u32,
    /// Output sample clock in hertz.
    pub sample_clock_hz: u32,
    pub cic_stages: u32,
    /// Stimulus amplitude as a fraction of half the supply, strictly below one.
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl HarnessConfig {
    pub fn new(
        vcc: f64,
        oversample_ratio: u32,
        sample_clock_hz: u32,
        cic_stages: u32,
    ) -> Result<Self> {
        let config = Self {
            vcc,
            oversample_ratio,
            sample_clock_hz,
            cic_stages,
            scale: DEFAULT_SCALE,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_scale(mut self, scale: f64) -> Result<Self> {
        self.scale = scale;
        self.validate()?;
        Ok(self)
    }

    /// Rate at which the device is clocked: oversample ratio times sample clock.
    pub fn base_clock_hz(&self) -> u64 {
        u64::from(self.oversample_ratio) * u64::from(self.sample_clock_hz)
    }

    /// Output code corresponding to a full-supply input (`ratio ^ stages`).
    pub fn full_scale(&self) -> u64 {
        self.checked_full_scale().unwrap_or(MAX_FULL_SCALE)
    }

    /// Convert a raw output code back into volts.
    pub fn output_to_volts(&self, code: i64) -> f64 {
        self.vcc * code as f64 / self.full_scale() as f64
    }

    fn checked_full_scale(&self) -> Option<u64> {
        u64::from(self.oversample_ratio).checked_pow(self.cic_stages)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.vcc.is_finite() || self.vcc <= 0.0 {
            return Err(ConfigError::invalid(
                env::VCC,
                self.vcc,
                "supply voltage must be a positive number",
            ));
        }
        if self.oversample_ratio == 0 {
            return Err(ConfigError::invalid(
                env::OVERSAMPLE_RATE,
                self.oversample_ratio,
                "oversample ratio must be positive",
            ));
        }
        if self.sample_clock_hz == 0 {
            return Err(ConfigError::invalid(
                env::SCLK,
                self.sample_clock_hz,
                "sample clock must be positive",
            ));
        }
        if self.cic_stages == 0 {
            return Err(ConfigError::invalid(
                env::CIC_STAGES,
                self.cic_stages,
                "decimator needs at least one stage",
            ));
        }
        if !(self.scale > 0.0 && self.scale < 1.0) {
            return Err(ConfigError::invalid(
                env::SCALE,
                self.scale,
                "scale must lie strictly between 0 and 1",
            ));
        }
        match self.checked_full_scale() {
            Some(full) if full <= MAX_FULL_SCALE => Ok(()),
            _ => Err(ConfigError::invalid(
                env::CIC_STAGES,
                self.cic_stages,
                format!(
                    "{}^{} exceeds the representable output range",
                    self.oversample_ratio, self.cic_stages
                ),
            )),
        }
    }
}

/// Inclusive cycle window during which reset is held asserted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetWindow {
    pub start: u64,
    pub end: u64,
}

impl ResetWindow {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn contains(&self, cycle: u64) -> bool {
        cycle >= self.start && cycle <= self.end
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(ConfigError::invalid(
                "settle_reset",
                format!("{}..={}", self.start, self.end),
                "reset window start must not exceed its end",
            ));
        }
        Ok(())
    }
}

/// Frequency sweep request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    pub start_freq: u32,
    pub end_freq: u32,
    /// Number of frequency points, bounds included.
    pub num_steps: usize,
    /// Number of whole periods observed at every frequency.
    pub num_periods: u32,
    #[serde(default)]
    pub spacing: Spacing,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub emit_phase: bool,
    #[serde(default = "default_settle_cycles")]
    pub settle_cycles: u64,
    #[serde(default)]
    pub settle_reset: Option<ResetWindow>,
}

impl SweepConfig {
    pub fn new(start_freq: u32, end_freq: u32, num_steps: usize, num_periods: u32) -> Self {
        Self {
            start_freq,
            end_freq,
            num_steps,
            num_periods,
            spacing: Spacing::default(),
            polarity: Polarity::default(),
            emit_phase: false,
            settle_cycles: DEFAULT_SETTLE_CYCLES,
            settle_reset: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_freq == 0 {
            return Err(ConfigError::invalid(
                env::START_FREQ,
                self.start_freq,
                "start frequency must be positive",
            ));
        }
        if self.end_freq <= self.start_freq {
            return Err(ConfigError::invalid(
                env::END_FREQ,
                self.end_freq,
                format!(
                    "end frequency must exceed start frequency {}",
                    self.start_freq
                ),
            ));
        }
        if self.num_steps < 2 {
            return Err(ConfigError::invalid(
                env::NUM_FREQ,
                self.num_steps,
                "a sweep needs at least two frequency points",
            ));
        }
        if self.num_periods == 0 {
            return Err(ConfigError::invalid(
                env::NUM_PER,
                self.num_periods,
                "at least one period must be observed per frequency",
            ));
        }
        if let Some(window) = &self.settle_reset {
            window.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub trace: Option<PathBuf>,
    #[serde(default = "default_summary")]
    pub summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            trace: None,
            summary: default_summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// When set, a JSON log file is written here in addition to stdout.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Complete configuration of one harness run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub harness: HarnessConfig,
    pub sweep: SweepConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunConfig {
    pub const ENV_CONFIG_PATH: &'static str = "SDADC_CONFIG";

    /// Load and validate a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Every electrical and sweep parameter is required; `SCALE`, `PHASE`,
    /// `TRACE` and `OUTPUT_DIR` are optional. `TRACE` accepts either a boolean
    /// (enabling `dump.vcd`) or a file path.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = VarSource(lookup);

        let harness = HarnessConfig {
            vcc: vars.required(env::VCC)?,
            oversample_ratio: vars.required(env::OVERSAMPLE_RATE)?,
            sample_clock_hz: vars.required(env::SCLK)?,
            cic_stages: vars.required(env::CIC_STAGES)?,
            scale: vars.optional(env::SCALE)?.unwrap_or(DEFAULT_SCALE),
        };

        let sweep = SweepConfig {
            spacing: Spacing::from_log_flag(vars.flag(env::LOG)?),
            polarity: Polarity::from_signed_flag(vars.flag(env::SIGNED)?),
            emit_phase: vars.optional_flag(env::PHASE)?.unwrap_or(false),
            ..SweepConfig::new(
                vars.required(env::START_FREQ)?,
                vars.required(env::END_FREQ)?,
                vars.required(env::NUM_FREQ)?,
                vars.required(env::NUM_PER)?,
            )
        };

        let mut output = OutputConfig::default();
        if let Some(directory) = vars.raw(env::OUTPUT_DIR) {
            output.directory = PathBuf::from(directory);
        }
        output.trace = match vars.raw(env::TRACE) {
            None => None,
            Some(value) => match parse_flag(env::TRACE, &value) {
                Ok(true) => Some(default_trace_path()),
                Ok(false) => None,
                Err(_) => Some(PathBuf::from(value)),
            },
        };

        let config = Self {
            harness,
            sweep,
            output,
            logging: LoggingConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.harness.validate()?;
        self.sweep.validate()?;
        Ok(())
    }
}

impl FromStr for RunConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

struct VarSource<F>(F);

impl<F> VarSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_owned()))
    }

    fn optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.raw(key)
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|err| ConfigError::invalid(key, &value, err.to_string()))
            })
            .transpose()
    }

    fn flag(&self, key: &str) -> Result<bool> {
        self.optional_flag(key)?
            .ok_or_else(|| ConfigError::Missing(key.to_owned()))
    }

    fn optional_flag(&self, key: &str) -> Result<Option<bool>> {
        self.raw(key)
            .map(|value| parse_flag(key, &value))
            .transpose()
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            key,
            value,
            "expected a boolean (0/1, true/false, yes/no, on/off)",
        )),
    }
}
