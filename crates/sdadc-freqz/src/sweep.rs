//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use sdadc_common::{HarnessConfig, SweepConfig};
use sdadc_sim::{DeviceUnderTest, SimulationSession};
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::errors::Result;
use crate::plan::{FrequencyPlan, PointTiming};
use crate::report::{MeasurementResult, SweepReport};
use crate::signal::SignalSynthesizer;
use crate::sink::ResultSink;

/// Frequency used to evaluate the constant warm-up stimulus.
const SETTLE_FREQUENCY_HZ: f64 = 1.0;

/// Gain in decibels between two peak-to-peak amplitudes. A zero input
/// amplitude yields a non-finite value.
pub fn gain_db(input_amplitude: f64, output_amplitude: f64) -> f64 {
    20.0 * (output_amplitude / input_amplitude).log10()
}

/// Phase offset in degrees between two unwrapped minimum indices.
pub fn phase_degrees(input_index: u64, output_index: u64, samples_per_period: u64) -> f64 {
    (output_index as f64 - input_index as f64) * 360.0 / samples_per_period as f64
}

/// Share of the sweep completed before `period` of `point` starts.
pub fn progress_percent(point: usize, period: u32, num_steps: usize, num_periods: u32) -> f64 {
    let done = point as f64 * f64::from(num_periods) + f64::from(period);
    100.0 * done / (num_steps as f64 * f64::from(num_periods))
}

/// Sample indices shared by every point of a run.
#[derive(Debug, Default)]
struct SeriesCursor {
    input: u64,
    output: u64,
}

/// Measures gain and phase of a device over a validated frequency plan.
///
/// Construction resolves the plan and the per-point measurement windows, so
/// every configuration problem surfaces before the device sees a single
/// clock edge.
#[derive(Debug, Clone)]
pub struct FrequencySweep {
    harness: HarnessConfig,
    sweep: SweepConfig,
    plan: FrequencyPlan,
    timings: Vec<PointTiming>,
    synth: SignalSynthesizer,
}

impl FrequencySweep {
    pub fn new(harness: HarnessConfig, sweep: SweepConfig) -> Result<Self> {
        harness.validate()?;
        sweep.validate()?;
        let plan = FrequencyPlan::from_config(&sweep)?;
        let timings = plan.timings(&harness)?;
        debug!(
            points = plan.len(),
            spacing = ?plan.spacing(),
            first_hz = plan.frequencies().first().copied().unwrap_or_default(),
            last_hz = plan.frequencies().last().copied().unwrap_or_default(),
            "frequency plan resolved"
        );
        Ok(Self {
            synth: SignalSynthesizer::from_config(&harness),
            harness,
            sweep,
            plan,
            timings,
        })
    }

    pub fn plan(&self) -> &FrequencyPlan {
        &self.plan
    }

    pub fn timings(&self) -> &[PointTiming] {
        &self.timings
    }

    /// Settle the device, then measure every frequency of the plan in order.
    pub fn run<D: DeviceUnderTest>(
        &self,
        session: &mut SimulationSession<D>,
        sink: &mut dyn ResultSink,
    ) -> Result<SweepReport> {
        info!(
            points = self.plan.len(),
            periods = self.sweep.num_periods,
            polarity = ?self.sweep.polarity,
            base_clock_hz = self.harness.base_clock_hz(),
            "starting frequency sweep"
        );
        self.settle(session);

        let mut cursor = SeriesCursor::default();
        let mut points = Vec::with_capacity(self.timings.len());
        for (index, timing) in self.timings.iter().enumerate() {
            let result = self.measure_point(index, timing, session, sink, &mut cursor)?;
            sink.record_gain(result.frequency_hz, result.gain_db)?;
            if self.sweep.emit_phase {
                sink.record_phase(result.frequency_hz, result.phase_deg)?;
            }
            points.push(result);
        }
        sink.finish()?;

        info!(
            percent = 100.0,
            input_samples = cursor.input,
            output_samples = cursor.output,
            "frequency sweep complete"
        );
        Ok(SweepReport::new(self.harness, self.sweep.clone(), points))
    }

    fn settle<D: DeviceUnderTest>(&self, session: &mut SimulationSession<D>) {
        let stepper = session.stepper_mut();
        if stepper.rising() {
            debug!("clock found high, parking it low before settling");
            stepper.toggle();
        }
        stepper.reset_cycles();
        stepper.drive(self.synth.sample(0, SETTLE_FREQUENCY_HZ));
        for _ in 0..self.sweep.settle_cycles {
            stepper.toggle();
            if let Some(window) = self.sweep.settle_reset {
                stepper.apply_reset(window.start, window.end);
            }
            stepper.toggle();
        }
        stepper.release_reset();
        debug!(cycles = stepper.cycles(), "device settled");
        stepper.reset_cycles();
    }

    fn measure_point<D: DeviceUnderTest>(
        &self,
        index: usize,
        timing: &PointTiming,
        session: &mut SimulationSession<D>,
        sink: &mut dyn ResultSink,
        cursor: &mut SeriesCursor,
    ) -> Result<MeasurementResult> {
        let frequency_hz = timing.frequency_hz;
        let num_steps = self.timings.len();
        let num_periods = self.sweep.num_periods;

        session.stepper_mut().reset_cycles();
        let mut input = Envelope::new();
        let mut output = Envelope::new();

        for period in 0..num_periods {
            debug!(
                frequency_hz,
                period,
                percent = progress_percent(index, period, num_steps, num_periods),
                "measuring period"
            );
            for _ in 0..timing.per_len {
                session.stepper_mut().toggle();
                let cycle = session.stepper().cycles();
                session
                    .stepper_mut()
                    .drive(self.synth.sample(cycle, frequency_hz));

                let device = session.stepper().device();
                if device.is_output_valid() {
                    let driven = device.driven_input();
                    let volts = self
                        .harness
                        .output_to_volts(device.read_output(self.sweep.polarity));
                    input.record(driven);
                    output.record(volts);
                    sink.record_input(cursor.input, driven)?;
                    sink.record_output(cursor.output, volts)?;
                    cursor.input += 1;
                    cursor.output += 1;
                }
                session.dump_trace()?;
                session.stepper_mut().toggle();
            }
        }

        let spp = timing.samples_per_period;
        let gain = gain_db(input.amplitude(), output.amplitude());
        let phase = phase_degrees(
            input.unwrapped_min_index(spp),
            output.unwrapped_min_index(spp),
            spp,
        );
        if !gain.is_finite() {
            warn!(
                frequency_hz,
                input_amplitude = input.amplitude(),
                output_amplitude = output.amplitude(),
                "degenerate amplitude, gain is not finite"
            );
        }

        let result = MeasurementResult {
            frequency_hz,
            gain_db: gain,
            phase_deg: phase,
            per_len: timing.per_len,
            samples_per_period: spp,
            cycles: session.stepper().cycles(),
            samples: output.samples(),
        };
        info!(
            point = index + 1,
            of = num_steps,
            percent = progress_percent(index + 1, 0, num_steps, num_periods),
            frequency_hz,
            gain_db = gain,
            phase_deg = phase,
            cycles = result.cycles,
            "frequency point measured"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FreqzError;
    use crate::sink::MemorySink;
    use sdadc_common::{Polarity, ResetWindow, Spacing};

    /// Latches its input on every rising edge and presents it, rescaled to
    /// full-scale codes, every `ratio` edges.
    #[derive(Debug, Default)]
    struct LatchingDevice {
        vcc: f64,
        ratio: u64,
        full_scale: f64,
        constant_output: Option<i64>,
        ignore_drive: bool,
        clk: bool,
        rst: bool,
        input: f64,
        phase: u64,
        valid: bool,
        output: i64,
        edges: u64,
        reset_edges: u64,
    }

    impl LatchingDevice {
        fn new(harness: &HarnessConfig) -> Self {
            Self {
                vcc: harness.vcc,
                ratio: u64::from(harness.oversample_ratio),
                full_scale: harness.full_scale() as f64,
                ..Self::default()
            }
        }
    }

    impl DeviceUnderTest for LatchingDevice {
        fn drive_input(&mut self, volts: f64) {
            if !self.ignore_drive {
                self.input = volts;
            }
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
            if !self.clk {
                return;
            }
            self.edges += 1;
            if self.rst {
                self.reset_edges += 1;
                self.phase = 0;
                self.valid = false;
                return;
            }
            self.phase += 1;
            self.valid = self.phase % self.ratio == 0;
            if self.valid {
                self.output = self
                    .constant_output
                    .unwrap_or_else(|| (self.input / self.vcc * self.full_scale).round() as i64);
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
                Polarity::Signed => self.output - (self.full_scale / 2.0) as i64,
            }
        }
    }

    fn harness() -> HarnessConfig {
        HarnessConfig::new(2.5, 8, 1_000, 4).unwrap()
    }

    fn sweep_config() -> SweepConfig {
        let mut sweep = SweepConfig::new(10, 100, 4, 3);
        sweep.settle_cycles = 64;
        sweep
    }

    #[test]
    fn gain_of_doubling_is_six_db() {
        assert!((gain_db(1.0, 2.0) - 6.0206).abs() < 1e-3);
        assert_eq!(gain_db(1.0, 1.0), 0.0);
        assert!(!gain_db(0.0, 1.0).is_finite());
        assert!(gain_db(0.0, 0.0).is_nan());
    }

    #[test]
    fn phase_scales_index_difference_to_degrees() {
        assert_eq!(phase_degrees(2, 5, 12), 90.0);
        assert_eq!(phase_degrees(5, 2, 12), -90.0);
        assert_eq!(phase_degrees(3, 3, 7), 0.0);
    }

    #[test]
    fn progress_counts_periods_across_points() {
        assert_eq!(progress_percent(0, 0, 4, 2), 0.0);
        assert_eq!(progress_percent(1, 1, 4, 2), 37.5);
        assert_eq!(progress_percent(4, 0, 4, 2), 100.0);
    }

    #[test]
    fn rejects_undersampled_frequency_before_touching_device() {
        let harness = harness();
        let sweep = SweepConfig::new(10, 1_500, 3, 2);
        let err = FrequencySweep::new(harness, sweep).unwrap_err();
        assert!(matches!(err, FreqzError::FrequencyTooHigh { .. }));
    }

    #[test]
    fn invalid_sweep_configuration_is_reported() {
        let err = FrequencySweep::new(harness(), SweepConfig::new(100, 10, 4, 3)).unwrap_err();
        assert!(matches!(err, FreqzError::Config(_)));
    }

    #[test]
    fn measures_every_point_with_exact_windows() {
        let harness = harness();
        let sweep = FrequencySweep::new(harness, sweep_config()).unwrap();
        assert_eq!(sweep.plan().frequencies(), &[10.0, 32.0, 54.0, 100.0]);

        let mut session = SimulationSession::new(LatchingDevice::new(&harness));
        let mut sink = MemorySink::new();
        let report = sweep.run(&mut session, &mut sink).unwrap();

        assert_eq!(report.points.len(), 4);
        assert_eq!(sink.gains.len(), 4);
        assert!(sink.phases.is_empty());
        assert!(sink.finished);

        for (point, timing) in report.points.iter().zip(sweep.timings()) {
            assert_eq!(point.cycles, timing.window_cycles(3));
            assert_eq!(point.per_len, timing.per_len);
            assert!(point.gain_db.abs() < 0.5, "gain {}", point.gain_db);
        }
        // 8 kHz base clock: 10 Hz -> 800 cycles per period, 100 output samples.
        assert_eq!(report.points[0].per_len, 800);
        assert_eq!(report.points[0].samples_per_period, 100);
        assert_eq!(report.points[0].samples, 300);

        let indices: Vec<u64> = sink.inputs.iter().map(|(index, _)| *index).collect();
        assert_eq!(indices, (0..sink.inputs.len() as u64).collect::<Vec<_>>());
        assert_eq!(sink.inputs.len() as u64, report.total_samples());
        assert_eq!(sink.outputs.len(), sink.inputs.len());

        let device = session.finish().unwrap();
        assert_eq!(device.edges, 64 + report.total_cycles());
        assert_eq!(device.reset_edges, 0);
    }

    #[test]
    fn phase_series_follows_flag() {
        let harness = harness();
        let mut config = sweep_config();
        config.emit_phase = true;
        config.spacing = Spacing::Logarithmic;
        let sweep = FrequencySweep::new(harness, config).unwrap();

        let mut session = SimulationSession::new(LatchingDevice::new(&harness));
        let mut sink = MemorySink::new();
        let report = sweep.run(&mut session, &mut sink).unwrap();

        assert_eq!(sink.phases.len(), 4);
        for ((freq, phase), point) in sink.phases.iter().zip(&report.points) {
            assert_eq!(*freq, point.frequency_hz);
            assert_eq!(*phase, point.phase_deg);
            assert!(phase.is_finite());
        }
    }

    #[test]
    fn constant_output_yields_non_finite_gain_and_continues() {
        let harness = harness();
        let sweep = FrequencySweep::new(harness, sweep_config()).unwrap();
        let mut device = LatchingDevice::new(&harness);
        device.constant_output = Some(12);

        let mut session = SimulationSession::new(device);
        let mut sink = MemorySink::new();
        let report = sweep.run(&mut session, &mut sink).unwrap();

        assert_eq!(report.points.len(), 4);
        assert_eq!(report.degenerate_points(), 4);
        assert!(sink.gains.iter().all(|(_, gain)| *gain == f64::NEG_INFINITY));
    }

    #[test]
    fn settle_reset_window_is_applied_then_released() {
        let harness = harness();
        let mut config = sweep_config();
        config.settle_reset = Some(ResetWindow::new(4, 9).unwrap());
        let sweep = FrequencySweep::new(harness, config).unwrap();

        let mut session = SimulationSession::new(LatchingDevice::new(&harness));
        let mut sink = MemorySink::new();
        sweep.run(&mut session, &mut sink).unwrap();

        let device = session.finish().unwrap();
        // Reset driven on cycles 4..=9 is sampled by the following six edges.
        assert_eq!(device.reset_edges, 6);
        assert!(!device.reset_asserted());
    }

    #[test]
    fn constant_input_yields_nan_gain_and_continues() {
        let harness = harness();
        let sweep = FrequencySweep::new(harness, sweep_config()).unwrap();
        let mut device = LatchingDevice::new(&harness);
        device.ignore_drive = true;

        let mut session = SimulationSession::new(device);
        let mut sink = MemorySink::new();
        let report = sweep.run(&mut session, &mut sink).unwrap();

        assert_eq!(report.points.len(), 4);
        assert_eq!(sink.gains.len(), 4);
        assert!(sink.finished);
        assert!(sink.inputs.iter().all(|(_, volts)| *volts == 0.0));
        assert!(sink.gains.iter().all(|(_, gain)| gain.is_nan()));
        assert_eq!(report.degenerate_points(), 4);
    }

    #[test]
    fn settles_from_high_clock_and_keeps_reset_window() {
        let harness = harness();
        let mut config = sweep_config();
        config.settle_reset = Some(ResetWindow::new(4, 9).unwrap());
        let sweep = FrequencySweep::new(harness, config).unwrap();

        let mut session = SimulationSession::new(LatchingDevice::new(&harness));
        session.stepper_mut().toggle();
        assert!(session.stepper().rising());
        let mut sink = MemorySink::new();
        let report = sweep.run(&mut session, &mut sink).unwrap();

        assert_eq!(report.points.len(), 4);
        for (point, timing) in report.points.iter().zip(sweep.timings()) {
            assert_eq!(point.cycles, timing.window_cycles(3));
        }
        assert!(!session.stepper().rising());
        let device = session.finish().unwrap();
        assert_eq!(device.reset_edges, 6);
        assert!(!device.reset_asserted());
        assert_eq!(device.edges, 1 + 64 + report.total_cycles());
    }
}
