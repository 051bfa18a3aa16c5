//! ---
//! sdadc_section: "11-simulation"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Simulation runtime helpers and device models."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use sdadc_common::{HarnessConfig, Polarity};

use crate::device::DeviceUnderTest;

/// First-order sigma-delta loop: adder, integrator, comparator, 1-bit DAC.
#[derive(Debug, Clone, Copy, Default)]
struct Modulator {
    integrator: f64,
    feedback: f64,
}

impl Modulator {
    fn tick(&mut self, input: f64, vcc: f64) -> bool {
        self.integrator += input - self.feedback;
        let bit = self.integrator > 0.0;
        self.feedback = if bit { vcc } else { 0.0 };
        bit
    }
}

/// Behavioral sigma-delta converter: a first-order modulator feeding an
/// N-stage CIC decimator that emits one word every `oversample_ratio` rising
/// edges.
///
/// The decimator gain is `oversample_ratio ^ stages`, so the unsigned word
/// scaled by `vcc / ratio^stages` tracks the input voltage. The signed word
/// is the unsigned one re-centred around mid-supply. Reset is synchronous and
/// active high.
#[derive(Debug, Clone)]
pub struct SigmaDeltaAdc {
    vcc: f64,
    ratio: u64,
    half_scale: i64,
    clk: bool,
    rst: bool,
    input: f64,
    bit: bool,
    modulator: Modulator,
    integrators: Vec<i64>,
    combs: Vec<i64>,
    decimation_phase: u64,
    valid: bool,
    output: i64,
}

impl SigmaDeltaAdc {
    pub fn new(vcc: f64, oversample_ratio: u32, stages: u32) -> Self {
        let ratio = u64::from(oversample_ratio.max(1));
        let stages = stages.max(1);
        let full_scale = ratio.saturating_pow(stages);
        Self {
            vcc,
            ratio,
            half_scale: (full_scale / 2) as i64,
            clk: false,
            rst: false,
            input: 0.0,
            bit: false,
            modulator: Modulator::default(),
            integrators: vec![0; stages as usize],
            combs: vec![0; stages as usize],
            decimation_phase: 0,
            valid: false,
            output: 0,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.vcc, config.oversample_ratio, config.cic_stages)
    }

    fn posedge(&mut self) {
        if self.rst {
            self.clear();
            return;
        }

        self.bit = self.modulator.tick(self.input, self.vcc);

        let mut acc = i64::from(self.bit);
        for integrator in &mut self.integrators {
            *integrator = integrator.wrapping_add(acc);
            acc = *integrator;
        }

        self.decimation_phase += 1;
        if self.decimation_phase < self.ratio {
            self.valid = false;
            return;
        }
        self.decimation_phase = 0;

        for delay in &mut self.combs {
            let previous = *delay;
            *delay = acc;
            acc = acc.wrapping_sub(previous);
        }
        self.output = acc;
        self.valid = true;
    }

    fn clear(&mut self) {
        self.bit = false;
        self.modulator = Modulator::default();
        self.integrators.iter_mut().for_each(|v| *v = 0);
        self.combs.iter_mut().for_each(|v| *v = 0);
        self.decimation_phase = 0;
        self.valid = false;
        self.output = 0;
    }
}

impl DeviceUnderTest for SigmaDeltaAdc {
    fn drive_input(&mut self, volts: f64) {
        self.input = volts;
    }

    fn driven_input(&self) -> f64 {
        self.input
    }

    fn set_reset(&mut self, asserted: bool) {
        self.rst = asserted;
    }

    fn reset_asserted(&self) -> bool {
        self.rst
    }

    fn toggle_clock(&mut self) {
        self.clk = !self.clk;
        if self.clk {
            self.posedge();
        }
    }

    fn clock_high(&self) -> bool {
        self.clk
    }

    fn is_output_valid(&self) -> bool {
        self.valid
    }

    fn read_output(&self, polarity: Polarity) -> i64 {
        match polarity {
            Polarity::Unsigned => self.output,
            Polarity::Signed => self.output - self.half_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(adc: &mut SigmaDeltaAdc) {
        adc.toggle_clock();
        adc.toggle_clock();
    }

    fn collect_outputs(adc: &mut SigmaDeltaAdc, cycles: usize) -> Vec<i64> {
        let mut words = Vec::new();
        for _ in 0..cycles {
            adc.toggle_clock();
            if adc.is_output_valid() {
                words.push(adc.read_output(Polarity::Unsigned));
            }
            adc.toggle_clock();
        }
        words
    }

    #[test]
    fn clock_alternates_levels() {
        let mut adc = SigmaDeltaAdc::new(2.5, 16, 2);
        assert!(!adc.clock_high());
        adc.toggle_clock();
        assert!(adc.clock_high());
        adc.toggle_clock();
        assert!(!adc.clock_high());
    }

    #[test]
    fn valid_pulses_once_per_decimation_period() {
        let mut adc = SigmaDeltaAdc::new(2.5, 8, 1);
        adc.drive_input(1.0);
        let mut valid_edges = Vec::new();
        for edge in 1..=40u64 {
            adc.toggle_clock();
            if adc.is_output_valid() {
                valid_edges.push(edge);
            }
            adc.toggle_clock();
        }
        assert_eq!(valid_edges, vec![8, 16, 24, 32, 40]);
    }

    #[test]
    fn mid_supply_input_settles_to_half_scale() {
        let mut adc = SigmaDeltaAdc::new(2.5, 16, 2);
        adc.drive_input(1.25);
        let words = collect_outputs(&mut adc, 16 * 10);
        assert_eq!(words.len(), 10);
        assert!(words[3..].iter().all(|&w| w == 128), "{:?}", words);
        assert_eq!(adc.read_output(Polarity::Signed), 0);
    }

    #[test]
    fn average_output_tracks_input_level() {
        let vcc = 3.3;
        let mut adc = SigmaDeltaAdc::new(vcc, 32, 2);
        adc.drive_input(vcc * 0.25);
        let words = collect_outputs(&mut adc, 32 * 200);
        let settled = &words[4..];
        let mean = settled.iter().sum::<i64>() as f64 / settled.len() as f64;
        let expected = 0.25 * 1024.0;
        assert!((mean - expected).abs() < 4.0, "mean {mean}");
    }

    #[test]
    fn reset_clears_state() {
        let mut adc = SigmaDeltaAdc::new(2.5, 4, 3);
        adc.drive_input(2.0);
        collect_outputs(&mut adc, 64);
        assert_ne!(adc.read_output(Polarity::Unsigned), 0);

        adc.set_reset(true);
        cycle(&mut adc);
        assert!(adc.reset_asserted());
        assert!(!adc.is_output_valid());
        assert_eq!(adc.read_output(Polarity::Unsigned), 0);
        assert_eq!(adc.read_output(Polarity::Signed), -32);

        adc.set_reset(false);
        let words = collect_outputs(&mut adc, 8);
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn from_config_uses_decimator_parameters() {
        let config = HarnessConfig::new(2.5, 4, 1_000, 2).unwrap();
        let mut adc = SigmaDeltaAdc::from_config(&config);
        adc.drive_input(1.25);
        let words = collect_outputs(&mut adc, 4 * 8);
        assert_eq!(*words.last().unwrap(), 8);
    }
}
