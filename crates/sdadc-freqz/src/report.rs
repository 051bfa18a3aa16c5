//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use sdadc_common::{HarnessConfig, SweepConfig};
use serde::Serialize;
use tracing::info;

use crate::errors::Result;

pub const SUMMARY_FILE: &str = "summary.json";

/// Outcome of one frequency point. Non-finite gains or phases serialize as
/// `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementResult {
    pub frequency_hz: f64,
    pub gain_db: f64,
    pub phase_deg: f64,
    pub per_len: u64,
    pub samples_per_period: u64,
    /// Base clock cycles simulated for this point.
    pub cycles: u64,
    /// Valid output samples observed for this point.
    pub samples: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub generated_at: DateTime<Utc>,
    pub harness: HarnessConfig,
    pub sweep: SweepConfig,
    pub settle_cycles: u64,
    pub points: Vec<MeasurementResult>,
}

impl SweepReport {
    pub fn new(harness: HarnessConfig, sweep: SweepConfig, points: Vec<MeasurementResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            settle_cycles: sweep.settle_cycles,
            harness,
            sweep,
            points,
        }
    }

    /// Cycles simulated across all measurement windows, settling excluded.
    pub fn total_cycles(&self) -> u64 {
        self.points.iter().map(|point| point.cycles).sum()
    }

    pub fn total_samples(&self) -> u64 {
        self.points.iter().map(|point| point.samples).sum()
    }

    /// Points whose gain could not be computed.
    pub fn degenerate_points(&self) -> usize {
        self.points
            .iter()
            .filter(|point| !point.gain_db.is_finite())
            .count()
    }

    /// Write `summary.json` into `output_dir` and return its path.
    pub fn write_json(&self, output_dir: &Path) -> Result<PathBuf> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }
        let path = output_dir.join(SUMMARY_FILE);
        let envelope = ReportEnvelope {
            timestamp: self.generated_at.to_rfc3339(),
            total_cycles: self.total_cycles(),
            total_samples: self.total_samples(),
            report: self,
        };
        fs::write(&path, serde_json::to_string_pretty(&envelope)?)?;
        info!("Sweep summary written to {}", path.display());
        Ok(path)
    }

    /// Emit one log line per frequency point.
    pub fn log_table(&self) {
        for point in &self.points {
            info!(
                frequency_hz = point.frequency_hz,
                gain_db = point.gain_db,
                phase_deg = point.phase_deg,
                samples = point.samples,
                "frequency response"
            );
        }
        info!(
            points = self.points.len(),
            total_cycles = self.total_cycles(),
            total_samples = self.total_samples(),
            degenerate = self.degenerate_points(),
            "sweep totals"
        );
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a> {
    timestamp: String,
    total_cycles: u64,
    total_samples: u64,
    report: &'a SweepReport,
}
