// Repository trait for monitor readings and run control
use crate::domain::monitor::{ConnectionOutcome, CycleRecordSummary, MonitorStatus};
use crate::domain::reading::{ReadingBatch, SeriesKind};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;

/// Outcome of asking a monitor for its next simulated record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Generated { total_records: u32 },
    NotLive,
    TooSoon { wait_ms: u64 },
}

impl GenerationOutcome {
    pub fn too_soon(wait: Duration) -> Self {
        GenerationOutcome::TooSoon {
            wait_ms: wait.as_millis() as u64,
        }
    }
}

#[async_trait]
pub trait MonitorRepository: Send + Sync {
    /// List every known monitor
    async fn list_monitors(&self) -> anyhow::Result<Vec<MonitorStatus>>;

    async fn get_monitor(&self, monitor_id: &str) -> anyhow::Result<Option<MonitorStatus>>;

    /// The server-computed chart blob for the latest record, as JSON text
    async fn load_chart_json(&self, monitor_id: &str) -> anyhow::Result<Option<String>>;

    /// Retained records, oldest first
    async fn list_records(&self, monitor_id: &str) -> anyhow::Result<Vec<CycleRecordSummary>>;

    /// Chart blob of one record; `None` once it is no longer retained
    async fn load_record_json(
        &self,
        monitor_id: &str,
        record_number: u32,
    ) -> anyhow::Result<Option<String>>;

    /// Readings of one series at or after `offset`, with the series length.
    ///
    /// Offsets and `total` count every reading ever appended, so they stay
    /// valid when old readings are dropped from the front.
    async fn readings_since(
        &self,
        monitor_id: &str,
        kind: SeriesKind,
        offset: usize,
    ) -> anyhow::Result<ReadingBatch>;

    /// Flip live mode, returning the new state
    async fn toggle_live(&self, monitor_id: &str) -> anyhow::Result<bool>;

    /// Observe the live flag of a monitor
    async fn subscribe_live(&self, monitor_id: &str) -> anyhow::Result<watch::Receiver<bool>>;

    /// Append the next simulated record if the monitor is live and due
    async fn generate_next(&self, monitor_id: &str) -> anyhow::Result<GenerationOutcome>;

    /// Connect or disconnect the simulated PLC link
    async fn toggle_connection(&self, monitor_id: &str) -> anyhow::Result<ConnectionOutcome>;
}
