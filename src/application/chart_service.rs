// Chart service - Turns stored chart blobs into planned/actual point series
use crate::application::export::series_csv;
use crate::application::monitor_repository::MonitorRepository;
use crate::domain::cycle::{CycleTimeMapper, Frequency};
use crate::domain::monitor::{CycleRecordSummary, FrequencyVariant};
use crate::domain::reading::{ChartPayload, ChartPoint, RawReading, Reading, SeriesKind};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleChart {
    pub monitor_id: String,
    pub frequency_hz: f64,
    pub planned: Vec<ChartPoint>,
    pub actual: Vec<ChartPoint>,
    /// Points dropped for bad shape, unknown degrees or bad cycle indices
    pub discarded: usize,
}

impl CycleChart {
    pub fn empty(monitor_id: &str, frequency: Frequency) -> Self {
        Self {
            monitor_id: monitor_id.to_string(),
            frequency_hz: frequency.hz(),
            planned: Vec::new(),
            actual: Vec::new(),
            discarded: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.planned.is_empty() && self.actual.is_empty()
    }
}

/// Decode and resolve every point, discarding the ones that fail
pub fn resolve_series(
    raw: &[serde_json::Value],
    mapper: &CycleTimeMapper,
) -> (Vec<Reading>, usize) {
    let mut discarded = 0;
    let readings = raw
        .iter()
        .filter_map(|value| match RawReading::from_value(value).and_then(|r| r.resolve(mapper)) {
            Ok(reading) => Some(reading),
            Err(e) => {
                tracing::debug!("Discarding point: {}", e);
                discarded += 1;
                None
            }
        })
        .collect();
    (readings, discarded)
}

/// Build a chart from a JSON blob. A malformed blob yields an empty chart.
///
/// The frequency comes from the payload when it carries one, else from
/// `fallback_hz`, else the default.
pub fn build_chart(monitor_id: &str, json: &str, fallback_hz: Option<f64>) -> CycleChart {
    let payload = match ChartPayload::parse(json) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Chart for {} left empty: {}", monitor_id, e);
            return CycleChart::empty(monitor_id, Frequency::or_default(fallback_hz));
        }
    };

    let frequency = match payload.frequency_hint().map(Frequency::new) {
        Some(Ok(frequency)) => frequency,
        Some(Err(e)) => {
            tracing::warn!("Chart for {} carries {}", monitor_id, e);
            Frequency::or_default(fallback_hz)
        }
        None => Frequency::or_default(fallback_hz),
    };
    let mapper = CycleTimeMapper::new(frequency);
    let (planned, planned_discarded) = resolve_series(&payload.planned, &mapper);
    let (actual, actual_discarded) = resolve_series(&payload.actual, &mapper);

    CycleChart {
        monitor_id: monitor_id.to_string(),
        frequency_hz: frequency.hz(),
        planned: planned.iter().map(Reading::to_point).collect(),
        actual: actual.iter().map(Reading::to_point).collect(),
        discarded: planned_discarded + actual_discarded,
    }
}

fn log_discarded(chart: &CycleChart) {
    if chart.discarded > 0 {
        tracing::info!(
            "Chart for {}: {} points discarded",
            chart.monitor_id,
            chart.discarded
        );
    }
}

#[derive(Clone)]
pub struct ChartService {
    repository: Arc<dyn MonitorRepository>,
}

impl ChartService {
    pub fn new(repository: Arc<dyn MonitorRepository>) -> Self {
        Self { repository }
    }

    /// Chart of the latest record; `None` when the monitor does not exist
    pub async fn cycle_chart(&self, monitor_id: &str) -> anyhow::Result<Option<CycleChart>> {
        let Some(monitor) = self.repository.get_monitor(monitor_id).await? else {
            return Ok(None);
        };
        let fallback = Some(monitor.frequency_hz);

        let chart = match self.repository.load_chart_json(monitor_id).await? {
            Some(json) => build_chart(monitor_id, &json, fallback),
            None => CycleChart::empty(monitor_id, Frequency::or_default(fallback)),
        };
        log_discarded(&chart);
        Ok(Some(chart))
    }

    /// Retained records of a monitor, oldest first
    pub async fn records(
        &self,
        monitor_id: &str,
    ) -> anyhow::Result<Option<Vec<CycleRecordSummary>>> {
        if self.repository.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.repository.list_records(monitor_id).await?))
    }

    /// Chart of one retained record; `None` when the monitor or record is gone
    pub async fn record_chart(
        &self,
        monitor_id: &str,
        record_number: u32,
    ) -> anyhow::Result<Option<CycleChart>> {
        let Some(monitor) = self.repository.get_monitor(monitor_id).await? else {
            return Ok(None);
        };
        let Some(json) = self
            .repository
            .load_record_json(monitor_id, record_number)
            .await?
        else {
            return Ok(None);
        };

        let chart = build_chart(monitor_id, &json, Some(monitor.frequency_hz));
        log_discarded(&chart);
        Ok(Some(chart))
    }

    /// Every retained reading of the first monitor running `variant`.
    /// `None` when no monitor runs it.
    pub async fn variant_chart(
        &self,
        variant: FrequencyVariant,
    ) -> anyhow::Result<Option<CycleChart>> {
        let monitors = self.repository.list_monitors().await?;
        let Some(monitor) = monitors.into_iter().find(|m| m.variant == variant) else {
            return Ok(None);
        };

        let planned = self
            .repository
            .readings_since(&monitor.id, SeriesKind::Planned, 0)
            .await?;
        let actual = self
            .repository
            .readings_since(&monitor.id, SeriesKind::Actual, 0)
            .await?;

        Ok(Some(CycleChart {
            monitor_id: monitor.id,
            frequency_hz: monitor.frequency_hz,
            planned: planned.readings.iter().map(Reading::to_point).collect(),
            actual: actual.readings.iter().map(Reading::to_point).collect(),
            discarded: 0,
        }))
    }

    pub async fn export_csv(&self, monitor_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .cycle_chart(monitor_id)
            .await?
            .map(|chart| series_csv(&chart.planned, &chart.actual)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_chart_derives_times() {
        let json = r#"{
            "frequency_value": 2,
            "planned": [{"degree": 0, "value": 0.0}, {"degree": 360, "value": 0.0}],
            "actual": [{"degree": 90, "cycle": 2, "value": 49.5}]
        }"#;
        let chart = build_chart("m1", json, None);

        assert_eq!(chart.frequency_hz, 2.0);
        assert_eq!(chart.planned.iter().map(|p| p.x).collect::<Vec<_>>(), vec![0.0, 0.5]);
        assert_eq!(chart.actual[0].x, 0.625);
        assert_eq!(chart.discarded, 0);
    }

    #[test]
    fn test_unknown_degrees_do_not_abort() {
        let json = r#"{
            "planned": [],
            "actual": [
                {"degree": 0, "value": 1.0},
                {"degree": 37, "value": 2.0},
                {"degree": 45, "value": 3.0}
            ]
        }"#;
        let chart = build_chart("m1", json, Some(1.0));

        assert_eq!(chart.actual.len(), 2);
        assert_eq!(chart.discarded, 1);
        assert_eq!(chart.actual[1].degree, 45);
    }

    #[test]
    fn test_misshapen_points_are_discarded_individually() {
        let json = r#"{
            "planned": [{"degree": "zero", "value": 0.0}, {"degree": 0, "value": 0.0}],
            "actual": [{"degree": 45}, {"degree": 45, "value": 3.0}, "oops"]
        }"#;
        let chart = build_chart("m1", json, Some(2.0));

        assert_eq!(chart.planned.len(), 1);
        assert_eq!(chart.actual.len(), 1);
        assert_eq!(chart.actual[0].y, 3.0);
        assert_eq!(chart.discarded, 3);
    }

    #[test]
    fn test_malformed_payload_yields_empty_chart() {
        let chart = build_chart("m1", r#"{"actual": []}"#, Some(3.0));
        assert!(chart.is_empty());
        assert_eq!(chart.frequency_hz, 3.0);
    }

    #[test]
    fn test_invalid_frequency_falls_back_to_default() {
        let json = r#"{"frequency_value": 0, "planned": [], "actual": [{"degree": 360, "value": 0}]}"#;
        let chart = build_chart("m1", json, None);

        assert_eq!(chart.frequency_hz, 2.0);
        assert_eq!(chart.actual[0].x, 0.5);
    }
}
