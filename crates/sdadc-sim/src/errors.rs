//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime helpers and device models."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unable to open waveform trace {path}: {source}")]
    TraceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("waveform trace write failed: {0}")]
    TraceWrite(#[from] std::io::Error),
}
