//! Configuration types consumed by the service manager and the simulator.
//!
//! Reading and writing these from disk or a settings UI is the caller's
//! business; the manager snapshots a configuration when it starts or restarts
//! a service, so later edits take effect only on the next apply.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Reserved identifier of the built-in synthetic source. Exactly one source
/// with this id exists after [`normalize_sources`].
pub const SIMULATOR_SOURCE_ID: &str = "SIMULATOR";

pub const SUPPORTED_BAUD_RATES: [u32; 8] =
    [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

pub const DEFAULT_BAUD_RATE: u32 = 4800;

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_true() -> bool {
    true
}

// ── Sources ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    Serial {
        port: String,
        #[serde(default = "default_baud")]
        baud: u32,
    },
    Udp {
        port: u16,
    },
    Simulator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: SourceKind,
}

impl SourceConfig {
    pub fn simulator() -> Self {
        SourceConfig {
            id: SIMULATOR_SOURCE_ID.to_string(),
            name: "Simulator".to_string(),
            enabled: false,
            kind: SourceKind::Simulator,
        }
    }

    /// Origin tag used for log callbacks and record source ids.
    pub fn source_tag(&self) -> String {
        match self.kind {
            SourceKind::Serial { .. } => format!("SERIAL:{}", self.id),
            SourceKind::Udp { .. } => format!("UDP:{}", self.id),
            SourceKind::Simulator => SIMULATOR_SOURCE_ID.to_string(),
        }
    }
}

// ── Outputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputKind {
    Serial {
        port: String,
        #[serde(default = "default_baud")]
        baud: u32,
    },
    Udp {
        host: String,
        port: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: OutputKind,
    /// Forward every source. When true the allow-list is ignored.
    #[serde(default = "default_true")]
    pub multiplex_all: bool,
    /// Source ids forwarded when `multiplex_all` is false.
    #[serde(default)]
    pub allowed_sources: Vec<String>,
}

impl OutputConfig {
    /// Multiplex filter: does a frame from `source_id` go to this output?
    pub fn accepts(&self, source_id: &str) -> bool {
        self.multiplex_all || self.allowed_sources.iter().any(|id| id == source_id)
    }
}

// ── Simulator ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AisTargetConfig {
    pub name: String,
    pub callsign: String,
    pub mmsi: u32,
    /// ITU ship type code (30 fishing, 35 military, 36 sailing, 60 passenger).
    pub ship_type: u8,
    /// Meters.
    pub length: u16,
    /// Meters.
    pub width: u16,
    pub latitude: f64,
    pub longitude: f64,
    /// Knots.
    pub speed: f64,
    /// Degrees.
    pub course: f64,
    pub enabled: bool,
    /// Position-report period, milliseconds.
    pub report_period_ms: u64,
}

impl Default for AisTargetConfig {
    fn default() -> Self {
        AisTargetConfig {
            name: String::new(),
            callsign: String::new(),
            mmsi: 0,
            ship_type: 36,
            length: 10,
            width: 3,
            latitude: 0.0,
            longitude: 0.0,
            speed: 0.0,
            course: 0.0,
            enabled: true,
            report_period_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enable_gps: bool,
    pub enable_wind: bool,
    pub enable_water: bool,
    pub enable_ais: bool,

    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Knots.
    pub base_speed: f64,
    /// Degrees.
    pub base_course: f64,

    /// Meters.
    pub min_depth: f64,
    pub max_depth: f64,
    /// Degrees Celsius.
    pub min_water_temp: f64,
    pub max_water_temp: f64,

    /// Emission periods, milliseconds.
    pub gps_period_ms: u64,
    pub wind_period_ms: u64,
    pub water_period_ms: u64,

    pub ais_targets: Vec<AisTargetConfig>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            enable_gps: true,
            enable_wind: true,
            enable_water: true,
            enable_ais: true,
            // Rade de Marseille
            start_latitude: 43.2965,
            start_longitude: 5.3698,
            base_speed: 10.0,
            base_course: 90.0,
            min_depth: 5.0,
            max_depth: 50.0,
            min_water_temp: 15.0,
            max_water_temp: 25.0,
            gps_period_ms: 1000,
            wind_period_ms: 1000,
            water_period_ms: 1000,
            ais_targets: Vec::new(),
        }
    }
}

/// The three stock traffic targets, placed around the given start position.
pub fn default_ais_targets(start_latitude: f64, start_longitude: f64) -> Vec<AisTargetConfig> {
    vec![
        AisTargetConfig {
            name: "ZIGOMAR".to_string(),
            callsign: "FAF9142".to_string(),
            mmsi: 227_000_001,
            ship_type: 36,
            length: 6,
            width: 2,
            latitude: start_latitude + 0.015,
            longitude: start_longitude + 0.015,
            speed: 3.5,
            course: 45.0,
            ..AisTargetConfig::default()
        },
        AisTargetConfig {
            name: "YAMATO".to_string(),
            callsign: "JD0001".to_string(),
            mmsi: 431_000_001,
            ship_type: 35,
            length: 263,
            width: 39,
            latitude: start_latitude,
            longitude: start_longitude - 0.05,
            speed: 21.0,
            course: 270.0,
            ..AisTargetConfig::default()
        },
        AisTargetConfig {
            name: "TITANIC".to_string(),
            callsign: "MUC".to_string(),
            mmsi: 232_000_001,
            ship_type: 60,
            length: 269,
            width: 28,
            latitude: start_latitude - 0.03,
            longitude: start_longitude,
            speed: 19.0,
            course: 180.0,
            ..AisTargetConfig::default()
        },
    ]
}

// ── Normalization ────────────────────────────────────────────────────────────

/// Deduplicate source ids (last one wins) and make sure the reserved
/// "SIMULATOR" entry exists, disabled by default.
pub fn normalize_sources(sources: &mut Vec<SourceConfig>) {
    let mut deduped: Vec<SourceConfig> = Vec::with_capacity(sources.len());
    for source in sources.drain(..) {
        if let Some(existing) = deduped.iter_mut().find(|s| s.id == source.id) {
            warn!("duplicate source id {:?}, keeping the later entry", source.id);
            *existing = source;
        } else {
            deduped.push(source);
        }
    }
    if !deduped.iter().any(|s| s.id == SIMULATOR_SOURCE_ID) {
        deduped.push(SourceConfig::simulator());
    }
    *sources = deduped;
}

/// Clamp a configured baud rate to the supported set.
pub fn effective_baud(baud: u32) -> u32 {
    if SUPPORTED_BAUD_RATES.contains(&baud) {
        baud
    } else {
        warn!("unsupported baud rate {baud}, falling back to {DEFAULT_BAUD_RATE}");
        DEFAULT_BAUD_RATE
    }
}
