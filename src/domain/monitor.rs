// Monitor domain model - frequency variants, PLC link and record history
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLC_PORT: u16 = 44818;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FrequencyVariant {
    #[serde(rename = "2hz")]
    TwoHz,
    #[serde(rename = "3hz")]
    ThreeHz,
    #[serde(rename = "5hz")]
    FiveHz,
    #[serde(rename = "7hz")]
    SevenHz,
}

impl FrequencyVariant {
    pub const ALL: [FrequencyVariant; 4] = [
        FrequencyVariant::TwoHz,
        FrequencyVariant::ThreeHz,
        FrequencyVariant::FiveHz,
        FrequencyVariant::SevenHz,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FrequencyVariant::TwoHz => "2hz",
            FrequencyVariant::ThreeHz => "3hz",
            FrequencyVariant::FiveHz => "5hz",
            FrequencyVariant::SevenHz => "7hz",
        }
    }

    pub fn label(&self) -> String {
        format!("{} Hz", self.frequency_hz())
    }

    pub fn frequency_hz(&self) -> f64 {
        match self {
            FrequencyVariant::TwoHz => 2.0,
            FrequencyVariant::ThreeHz => 3.0,
            FrequencyVariant::FiveHz => 5.0,
            FrequencyVariant::SevenHz => 7.0,
        }
    }

    /// Peak displacement in millimetres
    pub fn max_amplitude(&self) -> f64 {
        match self {
            FrequencyVariant::TwoHz => 50.0,
            FrequencyVariant::ThreeHz => 25.0,
            FrequencyVariant::FiveHz => 12.5,
            FrequencyVariant::SevenHz => 8.3,
        }
    }

    pub fn amplitude_threshold(&self) -> &'static str {
        match self {
            FrequencyVariant::TwoHz => "R",
            FrequencyVariant::ThreeHz => "R/2",
            FrequencyVariant::FiveHz => "R/4",
            FrequencyVariant::SevenHz => "R/6",
        }
    }

    pub fn dimension_range(&self) -> &'static str {
        match self {
            FrequencyVariant::TwoHz => "-50 to +50",
            FrequencyVariant::ThreeHz => "-25 to +25",
            FrequencyVariant::FiveHz => "-12.5 to +12.5",
            FrequencyVariant::SevenHz => "-8.3 to +8.3",
        }
    }

    pub fn movement_cycles(&self) -> u64 {
        match self {
            FrequencyVariant::TwoHz => 518_400,
            FrequencyVariant::ThreeHz => 1_166_400,
            FrequencyVariant::FiveHz => 3_240_000,
            FrequencyVariant::SevenHz => 6_652_800,
        }
    }

    /// Revolutions packed into one generated record (one second of motion)
    pub fn cycles_per_record(&self) -> u32 {
        self.frequency_hz() as u32
    }
}

/// Planned displacement at `degree` for a sine of peak `amplitude`
pub fn displacement(degree: i32, amplitude: f64) -> f64 {
    amplitude * (degree as f64).to_radians().sin()
}

/// Result of flipping the simulated PLC connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionOutcome {
    Connected { address: String },
    Disconnected,
    MissingAddress,
}

/// Simulated Ethernet/IP link to the controller driving a monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlcLink {
    pub ip_address: Option<String>,
    pub port: u16,
    pub is_connected: bool,
}

impl PlcLink {
    pub fn new(ip_address: Option<String>, port: u16) -> Self {
        Self {
            ip_address: ip_address.filter(|ip| !ip.trim().is_empty()),
            port,
            is_connected: false,
        }
    }

    /// Connect when disconnected, disconnect when connected. Connecting
    /// needs an address.
    pub fn toggle(&mut self) -> ConnectionOutcome {
        if self.is_connected {
            self.is_connected = false;
            return ConnectionOutcome::Disconnected;
        }
        match &self.ip_address {
            Some(ip) => {
                self.is_connected = true;
                ConnectionOutcome::Connected {
                    address: format!("{}:{}", ip, self.port),
                }
            }
            None => ConnectionOutcome::MissingAddress,
        }
    }
}

impl Default for PlcLink {
    fn default() -> Self {
        Self::new(None, DEFAULT_PLC_PORT)
    }
}

/// One retained generated record, without its points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecordSummary {
    pub record_number: u32,
    pub generated_at: DateTime<Utc>,
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub id: String,
    pub variant: FrequencyVariant,
    pub frequency_hz: f64,
    pub amplitude_threshold: &'static str,
    pub dimension_range: &'static str,
    pub movement_cycles: u64,
    pub is_live: bool,
    pub total_records: u32,
    pub plc: PlcLink,
}

impl MonitorStatus {
    pub fn new(id: String, variant: FrequencyVariant, is_live: bool, total_records: u32) -> Self {
        Self {
            id,
            variant,
            frequency_hz: variant.frequency_hz(),
            amplitude_threshold: variant.amplitude_threshold(),
            dimension_range: variant.dimension_range(),
            movement_cycles: variant.movement_cycles(),
            is_live,
            total_records,
            plc: PlcLink::default(),
        }
    }

    pub fn with_plc(mut self, plc: PlcLink) -> Self {
        self.plc = plc;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_codes_round_trip_through_serde() {
        for variant in FrequencyVariant::ALL {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, format!("\"{}\"", variant.code()));
        }
        let parsed: FrequencyVariant = serde_json::from_str("\"5hz\"").unwrap();
        assert_eq!(parsed, FrequencyVariant::FiveHz);
    }

    #[test]
    fn test_displacement_follows_sine() {
        assert_eq!(displacement(0, 50.0), 0.0);
        assert!((displacement(90, 50.0) - 50.0).abs() < 1e-9);
        assert!((displacement(270, 8.3) + 8.3).abs() < 1e-9);
        assert!(displacement(360, 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_carries_envelope() {
        let status = MonitorStatus::new("press-a".to_string(), FrequencyVariant::SevenHz, false, 0);
        assert_eq!(status.frequency_hz, 7.0);
        assert_eq!(status.amplitude_threshold, "R/6");
        assert_eq!(status.movement_cycles, 6_652_800);
        assert_eq!(status.plc.port, DEFAULT_PLC_PORT);
        assert!(!status.plc.is_connected);
    }

    #[test]
    fn test_plc_toggle_needs_address() {
        let mut link = PlcLink::new(Some("  ".to_string()), DEFAULT_PLC_PORT);
        assert_eq!(link.toggle(), ConnectionOutcome::MissingAddress);
        assert!(!link.is_connected);

        let mut link = PlcLink::new(Some("192.168.1.20".to_string()), 502);
        assert_eq!(
            link.toggle(),
            ConnectionOutcome::Connected {
                address: "192.168.1.20:502".to_string()
            }
        );
        assert!(link.is_connected);
        assert_eq!(link.toggle(), ConnectionOutcome::Disconnected);
        assert!(!link.is_connected);
    }
}
