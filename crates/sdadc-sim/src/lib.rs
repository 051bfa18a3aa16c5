//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "01-bootstrap"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime module exports and shared types."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
//! Cycle-level simulation primitives for the SD-ADC harness.
//!
//! The harness talks to the converter exclusively through
//! [`DeviceUnderTest`]. [`SimulationStepper`] owns the device and the cycle
//! counter, [`WaveformTrace`] records a VCD side channel, and
//! [`SimulationSession`] bundles both for the measurement engine.

pub mod adc;
pub mod device;
pub mod errors;
pub mod session;
pub mod stepper;
pub mod trace;

pub use adc::SigmaDeltaAdc;
pub use device::DeviceUnderTest;
pub use errors::{Result, SimError};
pub use sdadc_common::Polarity;
pub use session::SimulationSession;
pub use stepper::SimulationStepper;
pub use trace::WaveformTrace;
