use crate::application::live_service::LiveSettings;
use crate::domain::monitor::{DEFAULT_PLC_PORT, FrequencyVariant, PlcLink};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveConfig {
    #[serde(default = "default_tick_ms")]
    pub ingest_interval_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub commit_interval_ms: u64,
    #[serde(default = "default_trailing_seconds")]
    pub trailing_seconds: f64,
    #[serde(default = "default_lead_margin")]
    pub lead_margin: f64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ingest_interval_ms: default_tick_ms(),
            commit_interval_ms: default_tick_ms(),
            trailing_seconds: default_trailing_seconds(),
            lead_margin: default_lead_margin(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl LiveConfig {
    pub fn to_settings(&self) -> LiveSettings {
        LiveSettings {
            ingest_interval: Duration::from_millis(self.ingest_interval_ms.max(1)),
            commit_interval: Duration::from_millis(self.commit_interval_ms.max(1)),
            trailing_seconds: self.trailing_seconds,
            lead_margin: self.lead_margin,
            channel_capacity: self.channel_capacity.max(1),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorConfig {
    #[serde(default = "default_generation_interval_ms")]
    pub generation_interval_ms: u64,
    /// Relative spread of actual values around the planned curve
    #[serde(default = "default_noise_ratio")]
    pub noise_ratio: f64,
    /// Records kept per monitor; older readings and chart blobs are dropped
    #[serde(default = "default_retained_records")]
    pub retained_records: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            generation_interval_ms: default_generation_interval_ms(),
            noise_ratio: default_noise_ratio(),
            retained_records: default_retained_records(),
        }
    }
}

impl SimulatorConfig {
    pub fn generation_interval(&self) -> Duration {
        Duration::from_millis(self.generation_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    pub id: String,
    pub variant: FrequencyVariant,
    #[serde(default)]
    pub plc_ip_address: Option<String>,
    #[serde(default = "default_plc_port")]
    pub plc_port: u16,
}

impl MonitorConfig {
    pub fn plc_link(&self) -> PlcLink {
        PlcLink::new(self.plc_ip_address.clone(), self.plc_port)
    }
}

impl AppConfig {
    /// Configured monitors, or one per frequency variant when none are listed
    pub fn monitors_or_default(&self) -> Vec<MonitorConfig> {
        if !self.monitors.is_empty() {
            return self.monitors.clone();
        }
        FrequencyVariant::ALL
            .iter()
            .map(|variant| MonitorConfig {
                id: format!("monitor-{}", variant.code()),
                variant: *variant,
                plc_ip_address: None,
                plc_port: DEFAULT_PLC_PORT,
            })
            .collect()
    }
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_tick_ms() -> u64 {
    125
}

fn default_trailing_seconds() -> f64 {
    crate::domain::window::TRAILING_SECONDS
}

fn default_lead_margin() -> f64 {
    crate::domain::window::LEAD_MARGIN
}

fn default_channel_capacity() -> usize {
    100
}

fn default_generation_interval_ms() -> u64 {
    1000
}

fn default_noise_ratio() -> f64 {
    0.05
}

fn default_retained_records() -> u32 {
    300
}

fn default_plc_port() -> u16 {
    DEFAULT_PLC_PORT
}

/// Load `config/monitor.*` (optional) with `VIBRATION__SECTION__KEY` overrides
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(
            config::Environment::with_prefix("VIBRATION")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = parse("");
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert_eq!(config.live.ingest_interval_ms, 125);
        assert_eq!(config.live.trailing_seconds, 5.0);
        assert_eq!(config.live.lead_margin, 0.5);
        assert_eq!(config.simulator.generation_interval_ms, 1000);
        assert_eq!(config.simulator.retained_records, 300);
        assert_eq!(config.monitors_or_default().len(), 4);
    }

    #[test]
    fn test_overrides_and_monitors() {
        let config = parse(
            r#"
            [live]
            commit_interval_ms = 250
            trailing_seconds = 10.0

            [[monitors]]
            id = "press-line-1"
            variant = "7hz"
            plc_ip_address = "192.168.0.40"
            "#,
        );

        let settings = config.live.to_settings();
        assert_eq!(settings.commit_interval, Duration::from_millis(250));
        assert_eq!(settings.ingest_interval, Duration::from_millis(125));
        assert_eq!(settings.trailing_seconds, 10.0);
        assert_eq!(
            config.monitors_or_default(),
            vec![MonitorConfig {
                id: "press-line-1".to_string(),
                variant: FrequencyVariant::SevenHz,
                plc_ip_address: Some("192.168.0.40".to_string()),
                plc_port: DEFAULT_PLC_PORT,
            }]
        );
        assert_eq!(
            config.monitors[0].plc_link().ip_address.as_deref(),
            Some("192.168.0.40")
        );
    }
}
