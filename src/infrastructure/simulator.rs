// Simulated signal source - sine displacement with bounded noise
use crate::domain::cycle::{CycleTimeMapper, Frequency, SAMPLE_DEGREES};
use crate::domain::monitor::{FrequencyVariant, displacement};
use crate::domain::reading::Reading;
use rand::Rng;

/// One second of motion: `frequency` revolutions, nine samples each
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRecord {
    pub record_number: u32,
    pub planned: Vec<Reading>,
    pub actual: Vec<Reading>,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalSimulator {
    noise_ratio: f64,
}

impl SignalSimulator {
    pub fn new(noise_ratio: f64) -> Self {
        Self {
            noise_ratio: noise_ratio.clamp(0.0, 1.0),
        }
    }

    /// Generate record `record_number` (1-based). Record `n` covers seconds
    /// `n - 1 .. n`; `cycle` is the record number and `sub_cycle` the
    /// revolution inside it.
    pub fn generate<R: Rng>(
        &self,
        variant: FrequencyVariant,
        record_number: u32,
        rng: &mut R,
    ) -> GeneratedRecord {
        let frequency = Frequency::new(variant.frequency_hz()).unwrap_or_default();
        let mapper = CycleTimeMapper::new(frequency);
        let amplitude = variant.max_amplitude();
        let record_start = record_number.saturating_sub(1) as f64;
        let revolutions = variant.cycles_per_record().max(1);

        let capacity = SAMPLE_DEGREES.len() * revolutions as usize;
        let mut planned = Vec::with_capacity(capacity);
        let mut actual = Vec::with_capacity(capacity);

        for revolution in 1..=revolutions {
            for degree in SAMPLE_DEGREES {
                // Every degree here is sampled and every revolution is >= 1
                let Ok(offset) = mapper.time_for(degree, revolution) else {
                    continue;
                };
                let time = round_to(record_start + offset, 4);
                let planned_value = displacement(degree, amplitude);
                let actual_value = planned_value * self.noise_factor(rng);

                planned.push(Reading {
                    degree,
                    cycle: record_number,
                    sub_cycle: revolution,
                    value: round_to(planned_value, 2),
                    time,
                });
                actual.push(Reading {
                    degree,
                    cycle: record_number,
                    sub_cycle: revolution,
                    value: round_to(actual_value, 2),
                    time,
                });
            }
        }

        GeneratedRecord {
            record_number,
            planned,
            actual,
        }
    }

    fn noise_factor<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.noise_ratio == 0.0 {
            return 1.0;
        }
        rng.gen_range((1.0 - self.noise_ratio)..=(1.0 + self.noise_ratio))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_record_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let record = SignalSimulator::new(0.05).generate(FrequencyVariant::ThreeHz, 2, &mut rng);

        assert_eq!(record.planned.len(), 27);
        assert_eq!(record.actual.len(), 27);
        assert_eq!(record.planned[0].time, 1.0);
        assert_eq!(record.planned[26].time, 2.0);
        assert!(record.actual.iter().all(|r| r.cycle == 2));
        assert_eq!(record.actual.last().map(|r| r.sub_cycle), Some(3));
    }

    #[test]
    fn test_actual_stays_within_noise_band() {
        let mut rng = StdRng::seed_from_u64(11);
        let record = SignalSimulator::new(0.05).generate(FrequencyVariant::TwoHz, 1, &mut rng);

        for (planned, actual) in record.planned.iter().zip(&record.actual) {
            assert_eq!(planned.key(), actual.key());
            // Rounding to 2 decimals can push past the band by half a hundredth
            assert!((actual.value - planned.value).abs() <= planned.value.abs() * 0.05 + 0.01);
        }
    }

    #[test]
    fn test_noise_free_actual_equals_planned() {
        let mut rng = StdRng::seed_from_u64(3);
        let record = SignalSimulator::new(0.0).generate(FrequencyVariant::SevenHz, 1, &mut rng);
        assert_eq!(record.planned, record.actual);
        assert_eq!(record.planned[2].value, 8.3);
    }

    #[test]
    fn test_times_never_go_backwards() {
        let mut rng = StdRng::seed_from_u64(5);
        let record = SignalSimulator::new(0.05).generate(FrequencyVariant::FiveHz, 4, &mut rng);
        assert!(record.actual.windows(2).all(|w| w[0].time <= w[1].time));
    }
}
