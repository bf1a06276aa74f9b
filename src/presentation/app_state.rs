// Application state for HTTP handlers
use crate::application::chart_service::ChartService;
use crate::application::live_service::LiveChartService;
use crate::application::monitor_service::MonitorService;

#[derive(Clone)]
pub struct AppState {
    pub monitor_service: MonitorService,
    pub chart_service: ChartService,
    pub live_service: LiveChartService,
}
