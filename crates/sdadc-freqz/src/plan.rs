//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---
use serde::Serialize;
use sdadc_common::{HarnessConfig, Spacing, SweepConfig};

use crate::errors::{FreqzError, Result};

/// Ordered test frequencies of a sweep, bounds pinned exactly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyPlan {
    spacing: Spacing,
    frequencies: Vec<f64>,
}

/// Measurement window derived for one frequency of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointTiming {
    pub frequency_hz: f64,
    /// Base clock cycles in one period, truncated.
    pub per_len: u64,
    /// Output samples in one period, truncated.
    pub samples_per_period: u64,
}

impl FrequencyPlan {
    pub fn from_config(config: &SweepConfig) -> Result<Self> {
        match config.spacing {
            Spacing::Linear => Self::linear(config.start_freq, config.end_freq, config.num_steps),
            Spacing::Logarithmic => {
                Self::logarithmic(config.start_freq, config.end_freq, config.num_steps)
            }
        }
    }

    /// Interior points advance by the truncated step `(end - start) / num_steps`.
    pub fn linear(start: u32, end: u32, num_steps: usize) -> Result<Self> {
        check_bounds(start, end, num_steps)?;
        let step = u64::from(end - start) / num_steps as u64;
        let frequencies = pinned(start, end, num_steps, |i| {
            (u64::from(start) + i as u64 * step) as f64
        });
        Self::build(Spacing::Linear, frequencies)
    }

    /// Interior points advance by the factor `(end / start) ^ (1 / num_steps)`.
    pub fn logarithmic(start: u32, end: u32, num_steps: usize) -> Result<Self> {
        check_bounds(start, end, num_steps)?;
        let ratio = log_step(start, end, num_steps);
        let mut current = f64::from(start);
        let frequencies = pinned(start, end, num_steps, |_| {
            current *= ratio;
            current
        });
        Self::build(Spacing::Logarithmic, frequencies)
    }

    fn build(spacing: Spacing, frequencies: Vec<f64>) -> Result<Self> {
        if let Some(pair) = frequencies.windows(2).find(|pair| pair[1] <= pair[0]) {
            return Err(FreqzError::InvalidPlan(format!(
                "frequencies must be strictly increasing, found {} followed by {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self {
            spacing,
            frequencies,
        })
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.frequencies.iter().copied()
    }

    /// Measurement windows for every point, rejecting any frequency that
    /// leaves less than one output sample per period.
    pub fn timings(&self, harness: &HarnessConfig) -> Result<Vec<PointTiming>> {
        self.iter()
            .map(|frequency_hz| PointTiming::new(frequency_hz, harness))
            .collect()
    }
}

impl PointTiming {
    pub fn new(frequency_hz: f64, harness: &HarnessConfig) -> Result<Self> {
        let per_len = (harness.base_clock_hz() as f64 / frequency_hz).floor() as u64;
        let samples_per_period = per_len / u64::from(harness.oversample_ratio);
        if samples_per_period == 0 {
            return Err(FreqzError::FrequencyTooHigh {
                frequency_hz,
                per_len,
                samples_per_period,
                oversample_ratio: harness.oversample_ratio,
            });
        }
        Ok(Self {
            frequency_hz,
            per_len,
            samples_per_period,
        })
    }

    /// Cycles simulated for this point when observing `num_periods` periods.
    pub fn window_cycles(&self, num_periods: u32) -> u64 {
        self.per_len * u64::from(num_periods)
    }
}

/// Multiplicative step between adjacent logarithmic points.
pub fn log_step(start: u32, end: u32, num_steps: usize) -> f64 {
    (f64::from(end) / f64::from(start)).powf(1.0 / num_steps as f64)
}

fn check_bounds(start: u32, end: u32, num_steps: usize) -> Result<()> {
    if start == 0 {
        return Err(FreqzError::InvalidPlan(
            "start frequency must be positive".into(),
        ));
    }
    if end <= start {
        return Err(FreqzError::InvalidPlan(format!(
            "end frequency {} must exceed start frequency {}",
            end, start
        )));
    }
    if num_steps < 2 {
        return Err(FreqzError::InvalidPlan(format!(
            "a plan needs at least two points, got {}",
            num_steps
        )));
    }
    Ok(())
}

fn pinned<F>(start: u32, end: u32, num_steps: usize, mut interior: F) -> Vec<f64>
where
    F: FnMut(usize) -> f64,
{
    let mut frequencies = Vec::with_capacity(num_steps);
    frequencies.push(f64::from(start));
    for i in 1..num_steps - 1 {
        frequencies.push(interior(i));
    }
    frequencies.push(f64::from(end));
    frequencies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_plan_uses_truncated_step() {
        let plan = FrequencyPlan::linear(100, 1_000, 4).unwrap();
        // step = 900 / 4 = 225
        assert_eq!(plan.frequencies(), &[100.0, 325.0, 550.0, 1_000.0]);
        assert_eq!(plan.spacing(), Spacing::Linear);

        let plan = FrequencyPlan::linear(10, 20, 3).unwrap();
        // step = 10 / 3 = 3
        assert_eq!(plan.frequencies(), &[10.0, 13.0, 20.0]);
    }

    #[test]
    fn two_point_plans_are_just_the_bounds() {
        for plan in [
            FrequencyPlan::linear(5, 6, 2).unwrap(),
            FrequencyPlan::logarithmic(5, 6, 2).unwrap(),
        ] {
            assert_eq!(plan.frequencies(), &[5.0, 6.0]);
        }
    }

    #[test]
    fn log_plan_has_constant_ratio() {
        let plan = FrequencyPlan::logarithmic(220, 20_000, 40).unwrap();
        assert_eq!(plan.len(), 40);
        assert_eq!(plan.frequencies()[0], 220.0);
        assert_eq!(plan.frequencies()[39], 20_000.0);

        let expected = log_step(220, 20_000, 40);
        let freqs = plan.frequencies();
        for pair in freqs[..39].windows(2) {
            let ratio = pair[1] / pair[0];
            assert!((ratio - expected).abs() < 1e-9, "ratio {ratio}");
        }
        assert!(freqs.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(matches!(
            FrequencyPlan::linear(0, 10, 3),
            Err(FreqzError::InvalidPlan(_))
        ));
        assert!(matches!(
            FrequencyPlan::logarithmic(10, 10, 3),
            Err(FreqzError::InvalidPlan(_))
        ));
        assert!(matches!(
            FrequencyPlan::linear(10, 20, 1),
            Err(FreqzError::InvalidPlan(_))
        ));
    }

    #[test]
    fn linear_plan_with_zero_step_is_rejected() {
        // (12 - 10) / 5 truncates to zero, interior points would repeat.
        let err = FrequencyPlan::linear(10, 12, 5).unwrap_err();
        assert!(matches!(err, FreqzError::InvalidPlan(_)));
    }

    #[test]
    fn from_config_follows_spacing() {
        let mut sweep = SweepConfig::new(100, 10_000, 3, 4);
        assert_eq!(
            FrequencyPlan::from_config(&sweep).unwrap().frequencies()[1],
            100.0 + 3_300.0
        );
        sweep.spacing = Spacing::Logarithmic;
        let plan = FrequencyPlan::from_config(&sweep).unwrap();
        assert!((plan.frequencies()[1] - 100.0 * 100f64.powf(1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn timings_truncate_and_reject_undersampled_points() {
        let harness = HarnessConfig::new(2.5, 64, 48_000, 2).unwrap();
        let timing = PointTiming::new(1_000.0, &harness).unwrap();
        assert_eq!(timing.per_len, 3_072);
        assert_eq!(timing.samples_per_period, 48);
        assert_eq!(timing.window_cycles(32), 98_304);

        let timing = PointTiming::new(20_000.0, &harness).unwrap();
        assert_eq!(timing.per_len, 153);
        assert_eq!(timing.samples_per_period, 2);

        let err = PointTiming::new(48_001.0, &harness).unwrap_err();
        assert!(matches!(
            err,
            FreqzError::FrequencyTooHigh {
                samples_per_period: 0,
                ..
            }
        ));

        let plan = FrequencyPlan::linear(1_000, 60_000, 2).unwrap();
        assert!(plan.timings(&harness).is_err());
    }
}
