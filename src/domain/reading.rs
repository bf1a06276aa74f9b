// Reading domain models - boundary schema, resolved readings and chart points
use super::cycle::CycleTimeMapper;
use super::error::ChartError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Planned,
    Actual,
}

impl SeriesKind {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKind::Planned => "Planned",
            SeriesKind::Actual => "Actual",
        }
    }
}

/// A reading as it arrives from upstream JSON.
///
/// Optional fields resolve in one place, [`RawReading::resolve`]:
/// - `time` (alias `time_actual`) wins over the derived cycle time
/// - `sub_cycle` (alias `sub_cycle_number`) defaults to 1
/// - `cycle` defaults to 1
/// - `value` also accepts `dimension`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawReading {
    pub degree: f64,
    #[serde(default)]
    pub cycle: Option<u32>,
    #[serde(default, alias = "sub_cycle_number")]
    pub sub_cycle: Option<u32>,
    #[serde(alias = "dimension")]
    pub value: f64,
    #[serde(default, alias = "time_actual")]
    pub time: Option<f64>,
}

impl RawReading {
    /// Decode one point of a chart series
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ChartError> {
        Self::deserialize(value).map_err(|e| ChartError::MalformedPayload(e.to_string()))
    }

    pub fn resolve(&self, mapper: &CycleTimeMapper) -> Result<Reading, ChartError> {
        if self.degree.fract() != 0.0 || !self.degree.is_finite() {
            return Err(ChartError::UnknownDegree(self.degree));
        }
        let degree = self.degree as i32;
        let cycle = self.cycle.unwrap_or(1);
        let time = match self.time {
            Some(explicit) => {
                // Explicit times bypass the mapper but the degree must still be sampled
                super::cycle::position_index(degree)?;
                if cycle == 0 {
                    return Err(ChartError::InvalidCycle(cycle));
                }
                explicit
            }
            None => mapper.time_for(degree, cycle)?,
        };

        Ok(Reading {
            degree,
            cycle,
            sub_cycle: self.sub_cycle.unwrap_or(1),
            value: self.value,
            time,
        })
    }
}

/// Identity used to pair an actual reading with its planned counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadingKey {
    pub degree: i32,
    pub cycle: u32,
    pub sub_cycle: u32,
}

/// A validated, immutable measurement sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub degree: i32,
    pub cycle: u32,
    pub sub_cycle: u32,
    pub value: f64,
    pub time: f64,
}

impl Reading {
    pub fn key(&self) -> ReadingKey {
        ReadingKey {
            degree: self.degree,
            cycle: self.cycle,
            sub_cycle: self.sub_cycle,
        }
    }

    pub fn to_point(&self) -> ChartPoint {
        self.to_point_at(self.time)
    }

    /// Render at `x` instead of the reading's own time
    pub fn to_point_at(&self, x: f64) -> ChartPoint {
        ChartPoint {
            x,
            y: self.value,
            degree: self.degree,
            cycle: self.cycle,
            sub_cycle: self.sub_cycle,
        }
    }
}

/// What the charting surface draws
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    pub degree: i32,
    pub cycle: u32,
    pub sub_cycle: u32,
}

/// The server-computed chart blob: both series plus an optional frequency hint.
///
/// Series points stay undecoded so one bad point costs only itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartPayload {
    pub planned: Vec<serde_json::Value>,
    pub actual: Vec<serde_json::Value>,
    #[serde(default)]
    pub frequency_value: Option<f64>,
    #[serde(default)]
    pub frequency: Option<f64>,
}

impl ChartPayload {
    pub fn parse(json: &str) -> Result<Self, ChartError> {
        serde_json::from_str(json).map_err(|e| ChartError::MalformedPayload(e.to_string()))
    }

    /// `frequency_value` takes precedence over `frequency`
    pub fn frequency_hint(&self) -> Option<f64> {
        self.frequency_value.or(self.frequency)
    }
}

/// Result of polling a source from a cursor: the series length at poll time
/// and every reading at or after the cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingBatch {
    pub total: usize,
    pub readings: Vec<Reading>,
}

impl ReadingBatch {
    pub fn new(total: usize, readings: Vec<Reading>) -> Self {
        Self { total, readings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CycleTimeMapper {
        CycleTimeMapper::from_hz(2.0).unwrap()
    }

    #[test]
    fn test_explicit_time_wins() {
        let raw: RawReading =
            serde_json::from_str(r#"{"degree": 90, "cycle": 3, "value": 1.5, "time": 42.0}"#).unwrap();
        let reading = raw.resolve(&mapper()).unwrap();
        assert_eq!(reading.time, 42.0);
        assert_eq!(reading.sub_cycle, 1);
    }

    #[test]
    fn test_derived_time_and_aliases() {
        let raw: RawReading = serde_json::from_str(
            r#"{"degree": 180.0, "cycle": 2, "sub_cycle_number": 4, "dimension": -3.25}"#,
        )
        .unwrap();
        let reading = raw.resolve(&mapper()).unwrap();
        assert_eq!(reading.time, 0.75);
        assert_eq!(reading.sub_cycle, 4);
        assert_eq!(reading.value, -3.25);
    }

    #[test]
    fn test_unknown_degree_even_with_time() {
        let raw = RawReading {
            degree: 37.0,
            cycle: Some(1),
            sub_cycle: None,
            value: 0.0,
            time: Some(0.1),
        };
        assert_eq!(raw.resolve(&mapper()), Err(ChartError::UnknownDegree(37.0)));

        let fractional = RawReading { degree: 45.5, time: None, ..raw };
        assert_eq!(fractional.resolve(&mapper()), Err(ChartError::UnknownDegree(45.5)));
    }

    #[test]
    fn test_payload_missing_series() {
        let err = ChartPayload::parse(r#"{"planned": []}"#).unwrap_err();
        assert!(matches!(err, ChartError::MalformedPayload(_)));
        assert!(matches!(
            ChartPayload::parse("not json"),
            Err(ChartError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_bad_point_does_not_spoil_payload() {
        let payload = ChartPayload::parse(
            r#"{"planned": [{"degree": "ninety", "value": 1}, {"degree": 90}], "actual": [{"degree": 0, "value": 0}]}"#,
        )
        .unwrap();

        assert!(matches!(
            RawReading::from_value(&payload.planned[0]),
            Err(ChartError::MalformedPayload(_))
        ));
        assert!(matches!(
            RawReading::from_value(&payload.planned[1]),
            Err(ChartError::MalformedPayload(_))
        ));
        assert_eq!(RawReading::from_value(&payload.actual[0]).unwrap().degree, 0.0);
    }

    #[test]
    fn test_frequency_hint_precedence() {
        let payload = ChartPayload::parse(
            r#"{"planned": [], "actual": [], "frequency": 3, "frequency_value": 7}"#,
        )
        .unwrap();
        assert_eq!(payload.frequency_hint(), Some(7.0));
    }
}
