// Cycle geometry - sampled degree positions and degree-to-time mapping
use super::error::ChartError;

/// Angular positions sampled per revolution. 360 closes the cycle and
/// coincides with 0 of the next one.
pub const SAMPLE_DEGREES: [i32; 9] = [0, 45, 90, 135, 180, 225, 270, 315, 360];

/// Fallback used when a monitor carries no usable frequency
pub const DEFAULT_FREQUENCY_HZ: f64 = 2.0;

/// Rotations per second, always finite and positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frequency(f64);

impl Frequency {
    pub fn new(hz: f64) -> Result<Self, ChartError> {
        if hz.is_finite() && hz > 0.0 {
            Ok(Self(hz))
        } else {
            Err(ChartError::InvalidFrequency(hz))
        }
    }

    /// Validate `hz`, substituting [`DEFAULT_FREQUENCY_HZ`] when it is missing or unusable
    pub fn or_default(hz: Option<f64>) -> Self {
        match hz.map(Self::new) {
            Some(Ok(frequency)) => frequency,
            Some(Err(e)) => {
                tracing::warn!("{}, falling back to {} Hz", e, DEFAULT_FREQUENCY_HZ);
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn hz(self) -> f64 {
        self.0
    }

    pub fn cycle_duration(self) -> f64 {
        1.0 / self.0
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self(DEFAULT_FREQUENCY_HZ)
    }
}

/// Index of `degree` within [`SAMPLE_DEGREES`]
pub fn position_index(degree: i32) -> Result<usize, ChartError> {
    SAMPLE_DEGREES
        .iter()
        .position(|&d| d == degree)
        .ok_or(ChartError::UnknownDegree(degree as f64))
}

/// Maps (degree, cycle) pairs onto elapsed seconds for one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleTimeMapper {
    frequency: Frequency,
}

impl CycleTimeMapper {
    pub fn new(frequency: Frequency) -> Self {
        Self { frequency }
    }

    pub fn from_hz(hz: f64) -> Result<Self, ChartError> {
        Ok(Self::new(Frequency::new(hz)?))
    }

    /// Offset of `degree` from the start of its cycle
    pub fn time_in_cycle(&self, degree: i32) -> Result<f64, ChartError> {
        let index = position_index(degree)?;
        let fraction = index as f64 / (SAMPLE_DEGREES.len() - 1) as f64;
        Ok(fraction * self.frequency.cycle_duration())
    }

    /// Absolute elapsed time of `degree` within the 1-based `cycle`
    pub fn time_for(&self, degree: i32, cycle: u32) -> Result<f64, ChartError> {
        if cycle == 0 {
            return Err(ChartError::InvalidCycle(cycle));
        }
        let offset = self.time_in_cycle(degree)?;
        Ok((cycle - 1) as f64 * self.frequency.cycle_duration() + offset)
    }
}

/// One-shot mapping for callers holding a raw frequency value
pub fn cycle_time(degree: i32, cycle: u32, frequency_hz: f64) -> Result<f64, ChartError> {
    CycleTimeMapper::from_hz(frequency_hz)?.time_for(degree, cycle)
}
