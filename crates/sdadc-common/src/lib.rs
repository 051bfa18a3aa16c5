//! ---
//! sdadc_section: "01-core-functionality"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Shared primitives for the co-simulation harness."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
//! Shared primitives for the SD-ADC harness workspace.
//! This crate exposes the validated run configuration (environment or TOML
//! sourced) and the tracing bootstrap consumed by the simulation crates and
//! the testbench binary.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    HarnessConfig, LoggingConfig, OutputConfig, Polarity, ResetWindow, RunConfig, Spacing,
    SweepConfig,
};
pub use error::{ConfigError, Result};
pub use logging::{init_tracing, LogFormat};
