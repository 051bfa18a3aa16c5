//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use std::f64::consts::PI;

use sdadc_common::HarnessConfig;

/// Biased, scaled cosine stimulus referenced to the device's base clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSynthesizer {
    base_clock_hz: f64,
    offset: f64,
    swing: f64,
}

impl SignalSynthesizer {
    pub fn new(vcc: f64, scale: f64, base_clock_hz: u64) -> Self {
        Self {
            base_clock_hz: base_clock_hz as f64,
            offset: vcc / 2.0,
            swing: scale * vcc / 2.0,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.vcc, config.scale, config.base_clock_hz())
    }

    /// Stimulus voltage after `cycle` base clock cycles at `frequency_hz`.
    pub fn sample(&self, cycle: u64, frequency_hz: f64) -> f64 {
        let phase = 2.0 * PI * frequency_hz * cycle as f64 / self.base_clock_hz;
        self.offset + self.swing * phase.cos()
    }

    /// Lowest and highest voltage the stimulus can reach.
    pub fn bounds(&self) -> (f64, f64) {
        (self.offset - self.swing, self.offset + self.swing)
    }
}
