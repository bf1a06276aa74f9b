// Monitor service - Use cases for listing monitors, the dashboard and live mode
use crate::application::monitor_repository::{GenerationOutcome, MonitorRepository};
use crate::domain::dashboard::DashboardSummary;
use crate::domain::monitor::{ConnectionOutcome, MonitorStatus};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct MonitorService {
    repository: Arc<dyn MonitorRepository>,
}

impl MonitorService {
    pub fn new(repository: Arc<dyn MonitorRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_monitors(&self) -> anyhow::Result<Vec<MonitorStatus>> {
        self.repository.list_monitors().await
    }

    pub async fn dashboard(&self) -> anyhow::Result<DashboardSummary> {
        let monitors = self.repository.list_monitors().await?;
        Ok(DashboardSummary::from_monitors(&monitors))
    }

    /// Flip live mode; `None` when the monitor is unknown
    pub async fn toggle_live(&self, monitor_id: &str) -> anyhow::Result<Option<bool>> {
        if self.repository.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }
        let live = self.repository.toggle_live(monitor_id).await?;
        tracing::info!(
            "Live mode {} for {}",
            if live { "started" } else { "stopped" },
            monitor_id
        );
        Ok(Some(live))
    }

    /// Generate the next record now; `None` when the monitor is unknown
    pub async fn generate_next(
        &self,
        monitor_id: &str,
    ) -> anyhow::Result<Option<GenerationOutcome>> {
        if self.repository.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.repository.generate_next(monitor_id).await?))
    }

    /// Flip the simulated PLC link; `None` when the monitor is unknown
    pub async fn toggle_connection(
        &self,
        monitor_id: &str,
    ) -> anyhow::Result<Option<ConnectionOutcome>> {
        if self.repository.get_monitor(monitor_id).await?.is_none() {
            return Ok(None);
        }
        let outcome = self.repository.toggle_connection(monitor_id).await?;
        match &outcome {
            ConnectionOutcome::Connected { address } => {
                tracing::info!("{} connected to PLC at {} (simulated)", monitor_id, address)
            }
            ConnectionOutcome::Disconnected => tracing::info!("{} disconnected from PLC", monitor_id),
            ConnectionOutcome::MissingAddress => {
                tracing::warn!("{} has no PLC address to connect to", monitor_id)
            }
        }
        Ok(Some(outcome))
    }

    /// Keep every live monitor producing records at `period`
    pub async fn run_live_generation(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let monitors = match self.repository.list_monitors().await {
                Ok(monitors) => monitors,
                Err(e) => {
                    tracing::warn!("Listing monitors for generation failed: {}", e);
                    continue;
                }
            };

            for monitor in monitors.iter().filter(|m| m.is_live) {
                match self.repository.generate_next(&monitor.id).await {
                    Ok(GenerationOutcome::Generated { total_records }) => {
                        tracing::debug!("{} generated record {}", monitor.id, total_records);
                    }
                    Ok(outcome) => {
                        tracing::trace!("{} skipped generation: {:?}", monitor.id, outcome);
                    }
                    Err(e) => {
                        tracing::error!("Generation for {} failed: {}", monitor.id, e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monitor::{CycleRecordSummary, FrequencyVariant};
    use crate::domain::reading::{ReadingBatch, SeriesKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::watch;

    /// Repository with fixed monitors that counts generation calls.
    /// Generation for `broken` always fails.
    struct CountingRepository {
        monitors: Vec<MonitorStatus>,
        generated: Mutex<HashMap<String, u32>>,
    }

    impl CountingRepository {
        fn new(monitors: &[(&str, bool)]) -> Arc<Self> {
            Arc::new(Self {
                monitors: monitors
                    .iter()
                    .map(|(id, live)| {
                        MonitorStatus::new(id.to_string(), FrequencyVariant::TwoHz, *live, 0)
                    })
                    .collect(),
                generated: Mutex::new(HashMap::new()),
            })
        }

        fn generated(&self, id: &str) -> u32 {
            self.generated.lock().unwrap().get(id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl MonitorRepository for CountingRepository {
        async fn list_monitors(&self) -> anyhow::Result<Vec<MonitorStatus>> {
            Ok(self.monitors.clone())
        }

        async fn get_monitor(&self, monitor_id: &str) -> anyhow::Result<Option<MonitorStatus>> {
            Ok(self.monitors.iter().find(|m| m.id == monitor_id).cloned())
        }

        async fn load_chart_json(&self, _monitor_id: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn list_records(&self, _monitor_id: &str) -> anyhow::Result<Vec<CycleRecordSummary>> {
            Ok(vec![])
        }

        async fn load_record_json(
            &self,
            _monitor_id: &str,
            _record_number: u32,
        ) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn readings_since(
            &self,
            _monitor_id: &str,
            _kind: SeriesKind,
            _offset: usize,
        ) -> anyhow::Result<ReadingBatch> {
            Ok(ReadingBatch::default())
        }

        async fn toggle_live(&self, _monitor_id: &str) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn subscribe_live(&self, _monitor_id: &str) -> anyhow::Result<watch::Receiver<bool>> {
            Ok(watch::channel(false).1)
        }

        async fn generate_next(&self, monitor_id: &str) -> anyhow::Result<GenerationOutcome> {
            let mut generated = self.generated.lock().unwrap();
            let count = generated.entry(monitor_id.to_string()).or_default();
            *count += 1;
            if monitor_id == "broken" {
                anyhow::bail!("store unavailable");
            }
            Ok(GenerationOutcome::Generated {
                total_records: *count,
            })
        }

        async fn toggle_connection(&self, _monitor_id: &str) -> anyhow::Result<ConnectionOutcome> {
            Ok(ConnectionOutcome::Disconnected)
        }
    }

    #[tokio::test]
    async fn test_unknown_monitor_is_none() {
        let repository = CountingRepository::new(&[("a", true)]);
        let service = MonitorService::new(repository.clone());

        assert_eq!(service.toggle_live("nope").await.unwrap(), None);
        assert_eq!(service.generate_next("nope").await.unwrap(), None);
        assert_eq!(service.toggle_connection("nope").await.unwrap(), None);
        assert_eq!(repository.generated("nope"), 0);

        assert_eq!(service.toggle_live("a").await.unwrap(), Some(true));
        assert_eq!(
            service.generate_next("a").await.unwrap(),
            Some(GenerationOutcome::Generated { total_records: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_loop_only_drives_live_monitors() {
        let repository = CountingRepository::new(&[("broken", true), ("idle", false), ("live", true)]);
        let service = MonitorService::new(repository.clone());

        let task = tokio::spawn(service.run_live_generation(Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        task.abort();

        // Ticks at 0 s, 1 s and 2 s; the failing monitor does not stop the loop
        assert_eq!(repository.generated("live"), 3);
        assert_eq!(repository.generated("broken"), 3);
        assert_eq!(repository.generated("idle"), 0);
    }

    #[tokio::test]
    async fn test_dashboard_counts_monitors() {
        let repository = CountingRepository::new(&[("a", false), ("b", true)]);
        let summary = MonitorService::new(repository).dashboard().await.unwrap();

        assert_eq!(summary.total_monitors, 2);
        assert_eq!(summary.monitors_per_variant[&FrequencyVariant::TwoHz], 2);
        assert!(summary.is_any_monitor_live);
    }
}
