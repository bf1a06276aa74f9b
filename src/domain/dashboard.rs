// Dashboard domain model
use super::monitor::{FrequencyVariant, MonitorStatus};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_monitors: usize,
    pub monitors_per_variant: BTreeMap<FrequencyVariant, usize>,
    pub is_any_monitor_live: bool,
    pub connected_monitors: usize,
}

impl DashboardSummary {
    pub fn from_monitors(monitors: &[MonitorStatus]) -> Self {
        let mut monitors_per_variant: BTreeMap<FrequencyVariant, usize> =
            FrequencyVariant::ALL.iter().map(|v| (*v, 0)).collect();
        for monitor in monitors {
            *monitors_per_variant.entry(monitor.variant).or_default() += 1;
        }

        Self {
            total_monitors: monitors.len(),
            monitors_per_variant,
            is_any_monitor_live: monitors.iter().any(|m| m.is_live),
            connected_monitors: monitors.iter().filter(|m| m.plc.is_connected).count(),
        }
    }
}
