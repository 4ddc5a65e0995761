//! Wind stage: oscillating relative wind and periodic MWV emission.
//!
//! The wind veers at 2°/s and its speed ramps at 0.1 kn/s within [0, 30] kn.
//! Every 60 s both the veer direction and the ramp direction flip; hitting a
//! speed clamp flips the ramp immediately.

use crate::codec::emit::seal;
use crate::config::SimulatorConfig;
use crate::navdata::NavData;

const SWING_INTERVAL_SECS: f64 = 60.0;
const ANGLE_RATE_DEG_PER_SEC: f64 = 2.0;
const SPEED_RATE_KNOTS_PER_SEC: f64 = 0.1;
const MAX_WIND_KNOTS: f64 = 30.0;

pub(super) struct WindStage {
    angle: f64,
    speed: f64,
    clockwise: bool,
    increasing: bool,
    swing_timer: f64,
    since_emit_ms: f64,
}

impl Default for WindStage {
    fn default() -> Self {
        WindStage {
            angle: 0.0,
            speed: 0.0,
            clockwise: true,
            increasing: true,
            swing_timer: 0.0,
            since_emit_ms: 0.0,
        }
    }
}

impl WindStage {
    pub(super) fn advance(&mut self, dt: f64, config: &SimulatorConfig, pending: &mut Vec<String>) {
        self.since_emit_ms += dt * 1000.0;
        if !config.enable_wind {
            return;
        }

        self.swing_timer += dt;
        if self.swing_timer >= SWING_INTERVAL_SECS {
            self.swing_timer = 0.0;
            self.clockwise = !self.clockwise;
            self.increasing = !self.increasing;
        }

        let direction = if self.clockwise { 1.0 } else { -1.0 };
        self.angle += direction * ANGLE_RATE_DEG_PER_SEC * dt;
        if self.angle < 0.0 {
            self.angle += 360.0;
        }
        if self.angle >= 360.0 {
            self.angle -= 360.0;
        }

        let ramp = if self.increasing { 1.0 } else { -1.0 };
        self.speed += ramp * SPEED_RATE_KNOTS_PER_SEC * dt;
        if self.speed < 0.0 {
            self.speed = 0.0;
            self.increasing = true;
        }
        if self.speed > MAX_WIND_KNOTS {
            self.speed = MAX_WIND_KNOTS;
            self.increasing = false;
        }

        if self.since_emit_ms >= config.wind_period_ms as f64 {
            pending.push(mwv(self.angle, self.speed));
            self.since_emit_ms = 0.0;
        }
    }

    pub(super) fn fold(&self, data: &mut NavData, config: &SimulatorConfig) {
        if config.enable_wind {
            data.wind_angle = self.angle;
            data.wind_speed = self.speed;
            data.has_wind = true;
        }
    }
}

fn mwv(angle: f64, speed: f64) -> String {
    seal(&format!("IIMWV,{angle:.1},R,{speed:.1},N,A"))
}
