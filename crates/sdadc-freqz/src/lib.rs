//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "01-bootstrap"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement module exports."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
//! Frequency-response measurement of a clocked converter.
//!
//! [`FrequencySweep`] settles the device, drives one cosine tone per
//! frequency of a [`FrequencyPlan`], follows both channels with an
//! [`Envelope`] and turns them into gain and phase. Sample and result series
//! flow into a [`ResultSink`].

pub mod envelope;
pub mod errors;
pub mod plan;
pub mod report;
pub mod signal;
pub mod sink;
pub mod sweep;

pub use envelope::Envelope;
pub use errors::{FreqzError, Result};
pub use plan::{FrequencyPlan, PointTiming};
pub use report::{MeasurementResult, SweepReport};
pub use signal::SignalSynthesizer;
pub use sink::{CsvResultSink, MemorySink, ResultSink};
pub use sweep::{gain_db, phase_degrees, FrequencySweep};
