//! GPS stage: position/speed validity and periodic RMC emission.

use chrono::Utc;

use crate::codec::emit;
use crate::config::SimulatorConfig;
use crate::navdata::NavData;

use super::Kinematics;

#[derive(Default)]
pub(super) struct GpsStage {
    since_emit_ms: f64,
}

impl GpsStage {
    pub(super) fn advance(
        &mut self,
        dt: f64,
        config: &SimulatorConfig,
        kin: &Kinematics,
        pending: &mut Vec<String>,
    ) {
        self.since_emit_ms += dt * 1000.0;
        if config.enable_gps && self.since_emit_ms >= config.gps_period_ms as f64 {
            pending.push(emit::rmc(
                kin.latitude,
                kin.longitude,
                kin.sog,
                kin.cog,
                Utc::now(),
            ));
            self.since_emit_ms = 0.0;
        }
    }

    pub(super) fn fold(&self, data: &mut NavData, config: &SimulatorConfig) {
        if config.enable_gps {
            data.has_position = true;
            data.has_speed = true;
            data.gps_valid = true;
        }
    }
}
