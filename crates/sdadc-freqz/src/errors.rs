//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FreqzError>;

#[derive(Debug, Error)]
pub enum FreqzError {
    #[error("invalid frequency plan: {0}")]
    InvalidPlan(String),
    #[error(
        "{frequency_hz} Hz yields {samples_per_period} output samples per period \
         (period of {per_len} cycles, oversample ratio {oversample_ratio})"
    )]
    FrequencyTooHigh {
        frequency_hz: f64,
        per_len: u64,
        samples_per_period: u64,
        oversample_ratio: u32,
    },
    #[error("unable to create result file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("simulation error: {0}")]
    Sim(#[from] sdadc_sim::SimError),
    #[error("configuration error: {0}")]
    Config(#[from] sdadc_common::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
