//! ---
//! sdadc_section: "08-measurement"
//! sdadc_subsection: "module"
//! sdadc_type: "source"
//! sdadc_scope: "code"
//! sdadc_description: "Frequency-response measurement routines."
//! sdadc_version: "v0.1.0"
//! sdadc_owner: "tbd"
//! ---

/// Running peak-to-peak tracker for one sampled channel.
///
/// Besides the extremes it remembers the sample index at which the current
/// minimum was first seen, which serves as the phase reference of the
/// channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    minimum: f64,
    maximum: f64,
    amplitude: f64,
    last_min_index: u64,
    samples: u64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            minimum: f64::MAX,
            maximum: 0.0,
            amplitude: 0.0,
            last_min_index: 0,
            samples: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn record(&mut self, sample: f64) {
        if sample < self.minimum {
            self.minimum = sample;
            self.last_min_index = self.samples;
        }
        if sample > self.maximum {
            self.maximum = sample;
        }
        self.amplitude = self.maximum - self.minimum;
        self.samples += 1;
    }

    /// Peak-to-peak amplitude; zero until something was recorded.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn last_min_index(&self) -> u64 {
        self.last_min_index
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Fold the minimum index into a single period of `samples_per_period`
    /// samples. An index equal to the period length is left as is.
    pub fn unwrapped_min_index(&self, samples_per_period: u64) -> u64 {
        let mut index = self.last_min_index;
        if samples_per_period == 0 {
            return index;
        }
        if index > samples_per_period {
            index -= ((index - 1) / samples_per_period) * samples_per_period;
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_envelope_has_no_amplitude() {
        let env = Envelope::new();
        assert_eq!(env.amplitude(), 0.0);
        assert_eq!(env.minimum(), f64::MAX);
        assert_eq!(env.maximum(), 0.0);
        assert_eq!(env.samples(), 0);
        assert_eq!(env.last_min_index(), 0);
    }

    #[test]
    fn tracks_extremes_and_first_minimum() {
        let mut env = Envelope::new();
        for sample in [1.0, 0.5, 2.0, 0.25, 3.0, 0.25, 1.0] {
            env.record(sample);
        }
        assert_eq!(env.minimum(), 0.25);
        assert_eq!(env.maximum(), 3.0);
        assert_eq!(env.amplitude(), 2.75);
        // Tie at index 5 does not move the reference.
        assert_eq!(env.last_min_index(), 3);
        assert_eq!(env.samples(), 7);
    }

    #[test]
    fn reset_and_replay_is_idempotent() {
        let samples = [0.9, 0.1, 0.7, 0.05, 0.6, 0.05];
        let mut env = Envelope::new();
        samples.iter().for_each(|&s| env.record(s));
        let first = (env.amplitude(), env.last_min_index());

        env.reset();
        assert_eq!(env, Envelope::new());
        samples.iter().for_each(|&s| env.record(s));
        assert_eq!((env.amplitude(), env.last_min_index()), first);
    }

    #[test]
    fn negative_samples_keep_zero_maximum() {
        let mut env = Envelope::new();
        env.record(-1.0);
        env.record(-0.5);
        assert_eq!(env.maximum(), 0.0);
        assert_eq!(env.amplitude(), 1.0);
    }

    #[test]
    fn unwrap_matches_repeated_subtraction() {
        for spp in 1..12u64 {
            for index in 0..100u64 {
                let env = Envelope {
                    last_min_index: index,
                    ..Envelope::new()
                };
                let mut expected = index;
                while expected > 0 && expected > spp {
                    expected -= spp;
                }
                assert_eq!(env.unwrapped_min_index(spp), expected, "{index} / {spp}");
            }
        }
    }
}
