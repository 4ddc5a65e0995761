//! AIS stage: synthetic traffic targets.
//!
//! Each enabled target dead-reckons along its own speed and course, emits a
//! Message 1 position report on its configured period and a Message 5 static
//! report every 60 s. The own-vessel snapshot is never touched. One sequence
//! id, cycling 1..=9 per message, is shared by all targets.

use crate::codec::ais::{aivdm_lines, position_report, static_report};
use crate::config::{AisTargetConfig, SimulatorConfig};

use super::dead_reckon;

const STATIC_INTERVAL_MS: f64 = 60_000.0;

pub(super) struct AisStage {
    ships: Vec<ShipState>,
    sequence_id: u8,
}

struct ShipState {
    target: AisTargetConfig,
    latitude: f64,
    longitude: f64,
    since_report_ms: f64,
    since_static_ms: f64,
}

impl ShipState {
    fn new(target: &AisTargetConfig) -> Self {
        ShipState {
            latitude: target.latitude,
            longitude: target.longitude,
            target: target.clone(),
            since_report_ms: 0.0,
            since_static_ms: 0.0,
        }
    }
}

impl AisStage {
    pub(super) fn new(config: &SimulatorConfig) -> Self {
        let mut stage = AisStage {
            ships: Vec::new(),
            sequence_id: 0,
        };
        stage.reseed(config);
        stage
    }

    /// Rebuild per-target state from the configured target list. Emission
    /// timers restart; the sequence counter keeps cycling.
    pub(super) fn reseed(&mut self, config: &SimulatorConfig) {
        self.ships = config.ais_targets.iter().map(ShipState::new).collect();
    }

    fn next_sequence(&mut self) -> u8 {
        self.sequence_id = self.sequence_id % 9 + 1;
        self.sequence_id
    }

    pub(super) fn advance(&mut self, dt: f64, config: &SimulatorConfig, pending: &mut Vec<String>) {
        if !config.enable_ais {
            return;
        }
        let mut sequence_id = self.sequence_id;
        for ship in &mut self.ships {
            if !ship.target.enabled {
                continue;
            }

            let (d_lat, d_lon) =
                dead_reckon(ship.latitude, ship.target.speed, ship.target.course, dt);
            ship.latitude += d_lat;
            ship.longitude += d_lon;

            ship.since_report_ms += dt * 1000.0;
            ship.since_static_ms += dt * 1000.0;

            if ship.since_report_ms >= ship.target.report_period_ms as f64 {
                sequence_id = sequence_id % 9 + 1;
                let bits = position_report(
                    ship.target.mmsi,
                    ship.target.speed,
                    ship.longitude,
                    ship.latitude,
                    ship.target.course,
                    ship.target.course,
                );
                pending.push(aivdm_lines(&bits, sequence_id));
                ship.since_report_ms = 0.0;
            }

            if ship.since_static_ms >= STATIC_INTERVAL_MS {
                sequence_id = sequence_id % 9 + 1;
                let bits = static_report(
                    ship.target.mmsi,
                    &ship.target.callsign,
                    &ship.target.name,
                    ship.target.ship_type,
                    ship.target.length,
                    ship.target.width,
                );
                pending.push(aivdm_lines(&bits, sequence_id));
                ship.since_static_ms = 0.0;
            }
        }
        self.sequence_id = sequence_id;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::verify_checksum;

    fn single_target_config(report_period_ms: u64) -> SimulatorConfig {
        SimulatorConfig {
            enable_gps: false,
            enable_wind: false,
            enable_water: false,
            enable_ais: true,
            ais_targets: vec![AisTargetConfig {
                name: "ZIGOMAR".to_string(),
                callsign: "FAF9142".to_string(),
                mmsi: 227_000_001,
                ship_type: 36,
                length: 6,
                width: 2,
                latitude: 43.31,
                longitude: 5.38,
                speed: 3.5,
                course: 45.0,
                enabled: true,
                report_period_ms,
            }],
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn position_and_static_reports_split_on_schedule() {
        let config = single_target_config(10_000);
        let mut ais = AisStage::new(&config);
        let mut pending = Vec::new();
        for _ in 0..650 {
            ais.advance(0.1, &config, &mut pending);
        }

        let position_groups: Vec<&String> =
            pending.iter().filter(|g| !g.contains("\r\n")).collect();
        let static_groups: Vec<&String> = pending.iter().filter(|g| g.contains("\r\n")).collect();
        assert!(position_groups.len() >= 6, "got {}", position_groups.len());
        assert!(!static_groups.is_empty());

        for group in &pending {
            for line in group.split("\r\n") {
                assert!(line.starts_with("!AIVDM"));
                assert!(verify_checksum(line).is_ok());
            }
        }
        // Static reports always arrive as a two-fragment group.
        assert_eq!(static_groups[0].split("\r\n").count(), 2);
    }

    #[test]
    fn sequence_ids_cycle_one_through_nine() {
        let config = single_target_config(100);
        let mut ais = AisStage::new(&config);
        let mut pending = Vec::new();
        for _ in 0..120 {
            ais.advance(0.1, &config, &mut pending);
        }
        assert!(pending.len() >= 10);
        let ids: Vec<u8> = pending
            .iter()
            .map(|g| g.split(',').nth(3).unwrap().parse().unwrap())
            .collect();
        assert!(ids.iter().all(|id| (1..=9).contains(id)));
        assert_eq!(ids[0], 1);
        assert_eq!(ids[9], 1, "counter wraps after 9");
    }

    #[test]
    fn disabled_targets_and_module_are_silent() {
        let mut config = single_target_config(100);
        config.ais_targets[0].enabled = false;
        let mut ais = AisStage::new(&config);
        let mut pending = Vec::new();
        for _ in 0..50 {
            ais.advance(0.1, &config, &mut pending);
        }
        assert!(pending.is_empty());

        let mut config = single_target_config(100);
        config.enable_ais = false;
        let mut ais = AisStage::new(&config);
        for _ in 0..50 {
            ais.advance(0.1, &config, &mut pending);
        }
        assert!(pending.is_empty());
    }

    #[test]
    fn targets_dead_reckon_along_their_course() {
        let config = single_target_config(1_000);
        let mut ais = AisStage::new(&config);
        let mut pending = Vec::new();
        let start = (ais.ships[0].latitude, ais.ships[0].longitude);
        for _ in 0..100 {
            ais.advance(0.1, &config, &mut pending);
        }
        // Course 45°: both coordinates increase.
        assert!(ais.ships[0].latitude > start.0);
        assert!(ais.ships[0].longitude > start.1);
    }
}
