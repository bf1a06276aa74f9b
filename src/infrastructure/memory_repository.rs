// In-memory monitor repository backed by the signal simulator
use crate::application::monitor_repository::{GenerationOutcome, MonitorRepository};
use crate::domain::monitor::{
    ConnectionOutcome, CycleRecordSummary, FrequencyVariant, MonitorStatus, PlcLink,
};
use crate::domain::reading::{Reading, ReadingBatch, SeriesKind};
use crate::infrastructure::simulator::{GeneratedRecord, SignalSimulator};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;

/// One series with its oldest readings dropped. Offsets count every reading
/// ever appended, trimmed ones included.
#[derive(Default)]
struct History {
    trimmed: usize,
    readings: VecDeque<Reading>,
}

impl History {
    fn total(&self) -> usize {
        self.trimmed + self.readings.len()
    }

    fn since(&self, offset: usize) -> ReadingBatch {
        let from = offset
            .saturating_sub(self.trimmed)
            .min(self.readings.len());
        ReadingBatch::new(self.total(), self.readings.range(from..).copied().collect())
    }

    /// Drop readings of records numbered below `first_kept`
    fn trim_before(&mut self, first_kept: u32) {
        while self.readings.front().is_some_and(|r| r.cycle < first_kept) {
            self.readings.pop_front();
            self.trimmed += 1;
        }
    }
}

struct StoredRecord {
    record_number: u32,
    generated_at: DateTime<Utc>,
    points: usize,
    chart_json: String,
}

struct MonitorRecord {
    variant: FrequencyVariant,
    live: watch::Sender<bool>,
    plc: PlcLink,
    total_records: u32,
    last_generated: Option<Instant>,
    planned: History,
    actual: History,
    records: VecDeque<StoredRecord>,
}

impl MonitorRecord {
    fn new(variant: FrequencyVariant, plc: PlcLink) -> Self {
        Self {
            variant,
            live: watch::channel(false).0,
            plc,
            total_records: 0,
            last_generated: None,
            planned: History::default(),
            actual: History::default(),
            records: VecDeque::new(),
        }
    }

    fn status(&self, id: &str) -> MonitorStatus {
        MonitorStatus::new(
            id.to_string(),
            self.variant,
            *self.live.borrow(),
            self.total_records,
        )
        .with_plc(self.plc.clone())
    }

    fn series(&self, kind: SeriesKind) -> &History {
        match kind {
            SeriesKind::Planned => &self.planned,
            SeriesKind::Actual => &self.actual,
        }
    }

    /// Store `record` and keep only the newest `retained` records
    fn append(&mut self, record: GeneratedRecord, retained: u32) -> Result<()> {
        self.records.push_back(StoredRecord {
            record_number: record.record_number,
            generated_at: Utc::now(),
            points: record.planned.len() + record.actual.len(),
            chart_json: chart_json(self.variant, &record)?,
        });
        self.total_records = record.record_number;
        self.planned.readings.extend(record.planned);
        self.actual.readings.extend(record.actual);

        let first_kept = self.total_records.saturating_sub(retained.max(1)) + 1;
        self.planned.trim_before(first_kept);
        self.actual.trim_before(first_kept);
        while self
            .records
            .front()
            .is_some_and(|r| r.record_number < first_kept)
        {
            self.records.pop_front();
        }
        Ok(())
    }
}

/// Chart blob for one record. Times are left out and re-derived from the
/// degree and revolution when the chart is built.
fn chart_json(variant: FrequencyVariant, record: &GeneratedRecord) -> Result<String> {
    let points = |readings: &[Reading]| -> Vec<serde_json::Value> {
        readings
            .iter()
            .map(|r| {
                serde_json::json!({
                    "degree": r.degree,
                    "cycle": r.sub_cycle,
                    "value": r.value,
                })
            })
            .collect()
    };

    let payload = serde_json::json!({
        "frequency_value": variant.frequency_hz(),
        "planned": points(&record.planned),
        "actual": points(&record.actual),
    });
    serde_json::to_string(&payload).context("Failed to encode chart payload")
}

pub struct InMemoryRepository {
    monitors: RwLock<BTreeMap<String, MonitorRecord>>,
    simulator: SignalSimulator,
    min_interval: Duration,
    retained_records: u32,
    rng: Mutex<StdRng>,
}

impl InMemoryRepository {
    pub fn new(simulator: SignalSimulator, min_interval: Duration, retained_records: u32) -> Self {
        Self::with_rng(simulator, min_interval, retained_records, StdRng::from_entropy())
    }

    pub fn with_rng(
        simulator: SignalSimulator,
        min_interval: Duration,
        retained_records: u32,
        rng: StdRng,
    ) -> Self {
        Self {
            monitors: RwLock::new(BTreeMap::new()),
            simulator,
            min_interval,
            retained_records: retained_records.max(1),
            rng: Mutex::new(rng),
        }
    }

    /// Register a monitor; an existing id keeps its data
    pub async fn add_monitor(&self, id: &str, variant: FrequencyVariant, plc: PlcLink) {
        let mut monitors = self.monitors.write().await;
        monitors
            .entry(id.to_string())
            .or_insert_with(|| MonitorRecord::new(variant, plc));
        tracing::debug!("Registered monitor {} ({})", id, variant.label());
    }

    fn generate(&self, record: &MonitorRecord) -> GeneratedRecord {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.simulator
            .generate(record.variant, record.total_records + 1, &mut *rng)
    }
}

#[async_trait]
impl MonitorRepository for InMemoryRepository {
    async fn list_monitors(&self) -> Result<Vec<MonitorStatus>> {
        let monitors = self.monitors.read().await;
        Ok(monitors.iter().map(|(id, m)| m.status(id)).collect())
    }

    async fn get_monitor(&self, monitor_id: &str) -> Result<Option<MonitorStatus>> {
        let monitors = self.monitors.read().await;
        Ok(monitors.get(monitor_id).map(|m| m.status(monitor_id)))
    }

    async fn load_chart_json(&self, monitor_id: &str) -> Result<Option<String>> {
        let monitors = self.monitors.read().await;
        Ok(monitors
            .get(monitor_id)
            .and_then(|m| m.records.back())
            .map(|r| r.chart_json.clone()))
    }

    async fn list_records(&self, monitor_id: &str) -> Result<Vec<CycleRecordSummary>> {
        let monitors = self.monitors.read().await;
        let monitor = monitors
            .get(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;

        Ok(monitor
            .records
            .iter()
            .map(|r| CycleRecordSummary {
                record_number: r.record_number,
                generated_at: r.generated_at,
                points: r.points,
            })
            .collect())
    }

    async fn load_record_json(&self, monitor_id: &str, record_number: u32) -> Result<Option<String>> {
        let monitors = self.monitors.read().await;
        let monitor = monitors
            .get(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;

        Ok(monitor
            .records
            .iter()
            .find(|r| r.record_number == record_number)
            .map(|r| r.chart_json.clone()))
    }

    async fn readings_since(
        &self,
        monitor_id: &str,
        kind: SeriesKind,
        offset: usize,
    ) -> Result<ReadingBatch> {
        let monitors = self.monitors.read().await;
        let monitor = monitors
            .get(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;

        Ok(monitor.series(kind).since(offset))
    }

    async fn toggle_live(&self, monitor_id: &str) -> Result<bool> {
        let monitors = self.monitors.read().await;
        let monitor = monitors
            .get(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;

        let live = !*monitor.live.borrow();
        monitor.live.send_replace(live);
        Ok(live)
    }

    async fn subscribe_live(&self, monitor_id: &str) -> Result<watch::Receiver<bool>> {
        let monitors = self.monitors.read().await;
        let monitor = monitors
            .get(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;
        Ok(monitor.live.subscribe())
    }

    async fn generate_next(&self, monitor_id: &str) -> Result<GenerationOutcome> {
        let mut monitors = self.monitors.write().await;
        let monitor = monitors
            .get_mut(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;

        if !*monitor.live.borrow() {
            return Ok(GenerationOutcome::NotLive);
        }

        let now = Instant::now();
        if let Some(last) = monitor.last_generated {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_interval {
                return Ok(GenerationOutcome::too_soon(self.min_interval - elapsed));
            }
        }

        let record = self.generate(monitor);
        monitor.append(record, self.retained_records)?;
        monitor.last_generated = Some(now);

        Ok(GenerationOutcome::Generated {
            total_records: monitor.total_records,
        })
    }

    async fn toggle_connection(&self, monitor_id: &str) -> Result<ConnectionOutcome> {
        let mut monitors = self.monitors.write().await;
        let monitor = monitors
            .get_mut(monitor_id)
            .with_context(|| format!("Unknown monitor {}", monitor_id))?;
        Ok(monitor.plc.toggle())
    }
}
