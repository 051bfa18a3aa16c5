//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime helpers and device models."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use sdadc_common::Polarity;

/// Pin-level capabilities the harness needs from a clocked converter.
///
/// Implementations wrap whatever actually simulates the hardware (a
/// behavioral model, a generated RTL model behind FFI, ...). The harness only
/// drives inputs and observes outputs; it never inspects internal state.
///
/// Sequential state advances inside [`toggle_clock`](Self::toggle_clock) when
/// the clock transitions to its active (high) level, sampling whatever input
/// and reset values were driven beforehand.
pub trait DeviceUnderTest {
    /// Drive the analog input pin, in volts.
    fn drive_input(&mut self, volts: f64);

    /// Value currently driven onto the analog input pin.
    fn driven_input(&self) -> f64;

    fn set_reset(&mut self, asserted: bool);

    fn reset_asserted(&self) -> bool;

    /// Flip the clock pin and evaluate the device.
    fn toggle_clock(&mut self);

    fn clock_high(&self) -> bool;

    /// Whether a conversion result is presented this cycle.
    fn is_output_valid(&self) -> bool;

    /// Current output word under the requested interpretation.
    fn read_output(&self, polarity: Polarity) -> i64;
}

impl<D: DeviceUnderTest + ?Sized> DeviceUnderTest for Box<D> {
    fn drive_input(&mut self, volts: f64) {
        (**self).drive_input(volts)
    }

    fn driven_input(&self) -> f64 {
        (**self).driven_input()
    }

    fn set_reset(&mut self, asserted: bool) {
        (**self).set_reset(asserted)
    }

    fn reset_asserted(&self) -> bool {
        (**self).reset_asserted()
    }

    fn toggle_clock(&mut self) {
        (**self).toggle_clock()
    }

    fn clock_high(&self) -> bool {
        (**self).clock_high()
    }

    fn is_output_valid(&self) -> bool {
        (**self).is_output_valid()
    }

    fn read_output(&self, polarity: Polarity) -> i64 {
        (**self).read_output(polarity)
    }
}
