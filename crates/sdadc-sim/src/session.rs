//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime helpers and device models."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::path::Path;

use tracing::info;

use crate::device::DeviceUnderTest;
use crate::errors::Result;
use crate::stepper::SimulationStepper;
use crate::trace::WaveformTrace;

/// A device under simulation plus its optional waveform trace.
///
/// Exactly one session owns a device for the duration of a run. The
/// measurement engine borrows it mutably and hands it back when the sweep
/// completes.
#[derive(Debug)]
pub struct SimulationSession<D> {
    stepper: SimulationStepper<D>,
    trace: Option<WaveformTrace>,
}

impl<D: DeviceUnderTest> SimulationSession<D> {
    pub fn new(device: D) -> Self {
        Self {
            stepper: SimulationStepper::new(device),
            trace: None,
        }
    }

    /// Start dumping pin activity to `path`.
    pub fn open_trace(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let trace = WaveformTrace::create(path)?;
        info!(path = %trace.path().display(), "waveform tracing enabled");
        self.trace = Some(trace);
        Ok(())
    }

    pub fn tracing_enabled(&self) -> bool {
        self.trace.is_some()
    }

    pub fn stepper(&self) -> &SimulationStepper<D> {
        &self.stepper
    }

    pub fn stepper_mut(&mut self) -> &mut SimulationStepper<D> {
        &mut self.stepper
    }

    /// Write the current pin levels to the trace, if one is open.
    pub fn dump_trace(&mut self) -> Result<()> {
        match self.trace.as_mut() {
            Some(trace) => trace.dump(self.stepper.device()),
            None => Ok(()),
        }
    }

    /// Close the trace and release the device.
    pub fn finish(self) -> Result<D> {
        if let Some(trace) = self.trace {
            trace.finish()?;
        }
        Ok(self.stepper.into_device())
    }
}
