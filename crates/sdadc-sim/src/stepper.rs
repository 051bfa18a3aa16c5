//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime helpers and device models."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use sdadc_common::ResetWindow;
use tracing::trace;

use crate::device::DeviceUnderTest;

/// Advances a device one clock edge at a time and counts full cycles.
///
/// The stepper is the only writer of the device's pins and the sole owner of
/// the cycle counter, which increments on every transition to the active
/// (high) clock level.
#[derive(Debug)]
pub struct SimulationStepper<D> {
    device: D,
    cycles: u64,
}

impl<D: DeviceUnderTest> SimulationStepper<D> {
    pub fn new(device: D) -> Self {
        Self { device, cycles: 0 }
    }

    /// Flip the clock and evaluate the device. Two calls make one cycle.
    pub fn toggle(&mut self) {
        self.device.toggle_clock();
        if self.device.clock_high() {
            self.cycles += 1;
        }
    }

    /// Whether the clock currently sits at its active level.
    pub fn rising(&self) -> bool {
        self.device.clock_high()
    }

    /// Hold reset asserted while the cycle counter lies in
    /// `[window_start, window_end]`. Only acts while the clock is high, so
    /// call it right after a [`toggle`](Self::toggle) landing on the active
    /// edge.
    pub fn apply_reset(&mut self, window_start: u64, window_end: u64) {
        if !self.device.clock_high() {
            return;
        }
        let window = ResetWindow {
            start: window_start,
            end: window_end,
        };
        let asserted = window.contains(self.cycles);
        if asserted != self.device.reset_asserted() {
            trace!(cycle = self.cycles, asserted, "reset transition");
        }
        self.device.set_reset(asserted);
    }

    pub fn release_reset(&mut self) {
        self.device.set_reset(false);
    }

    pub fn drive(&mut self, volts: f64) {
        self.device.drive_input(volts);
    }

    /// Full clock cycles since the last [`reset_cycles`](Self::reset_cycles).
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn reset_cycles(&mut self) {
        self.cycles = 0;
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}
