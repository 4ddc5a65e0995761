//! Base motion stage: own-vessel ground track.
//!
//! Holds the current (lat, lon, SOG, COG) and a variation target refreshed
//! every 60 s to base·(1 ± 10%). Current values approach the target
//! exponentially and the position integrates by dead reckoning. The base
//! stage never emits sentences.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimulatorConfig;
use crate::navdata::NavData;

use super::{dead_reckon, Kinematics};

const VARIATION_INTERVAL_SECS: f64 = 60.0;
/// Fraction of the remaining target difference applied per second.
const APPROACH_RATE: f64 = 0.1;

pub(super) struct BaseStage {
    latitude: f64,
    longitude: f64,
    sog: f64,
    cog: f64,
    target_sog: f64,
    target_cog: f64,
    variation_timer: f64,
    rng: StdRng,
}

fn wrap_degrees(mut angle: f64) -> f64 {
    if angle < 0.0 {
        angle += 360.0;
    }
    if angle >= 360.0 {
        angle -= 360.0;
    }
    angle
}

impl BaseStage {
    pub(super) fn new(config: &SimulatorConfig) -> Self {
        BaseStage {
            latitude: config.start_latitude,
            longitude: config.start_longitude,
            sog: config.base_speed,
            cog: config.base_course,
            target_sog: config.base_speed,
            target_cog: config.base_course,
            variation_timer: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    pub(super) fn advance(&mut self, dt: f64, config: &SimulatorConfig) {
        self.variation_timer += dt;
        if self.variation_timer >= VARIATION_INTERVAL_SECS {
            self.variation_timer = 0.0;
            self.target_sog = config.base_speed * (1.0 + self.rng.gen_range(-0.10..=0.10));
            self.target_cog =
                wrap_degrees(config.base_course * (1.0 + self.rng.gen_range(-0.10..=0.10)));
        }

        self.sog += (self.target_sog - self.sog) * dt * APPROACH_RATE;

        // Shortest arc towards the target course.
        let mut cog_diff = self.target_cog - self.cog;
        if cog_diff > 180.0 {
            cog_diff -= 360.0;
        }
        if cog_diff < -180.0 {
            cog_diff += 360.0;
        }
        self.cog = wrap_degrees(self.cog + cog_diff * dt * APPROACH_RATE);

        let (d_lat, d_lon) = dead_reckon(self.latitude, self.sog, self.cog, dt);
        self.latitude += d_lat;
        self.longitude += d_lon;
    }

    /// Base provides the raw track; validity flags belong to the stages
    /// wrapping it.
    pub(super) fn fold(&self, data: &mut NavData) {
        data.latitude = self.latitude;
        data.longitude = self.longitude;
        data.speed_over_ground = self.sog;
        data.course_over_ground = self.cog;
    }

    pub(super) fn kinematics(&self) -> Kinematics {
        Kinematics {
            latitude: self.latitude,
            longitude: self.longitude,
            sog: self.sog,
            cog: self.cog,
        }
    }

    pub(super) fn set_position(&mut self, latitude: f64, longitude: f64) {
        self.latitude = latitude;
        self.longitude = longitude;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn eastbound_track_advances_longitude_only() {
        let config = SimulatorConfig {
            base_speed: 10.0,
            base_course: 90.0,
            ..SimulatorConfig::default()
        };
        let mut base = BaseStage::new(&config);
        let start = base.kinematics();
        for _ in 0..100 {
            base.advance(0.1, &config);
        }
        let end = base.kinematics();
        assert!(end.longitude > start.longitude);
        assert!((end.latitude - start.latitude).abs() < 1e-6);

        // 10 kn for 10 s is 10/360 NM; at ~43°N one minute of longitude
        // spans cos(lat) NM.
        let expected_d_lon = (10.0 * 10.0 / 3600.0) / (60.0 * start.latitude.to_radians().cos());
        assert!((end.longitude - start.longitude - expected_d_lon).abs() < 1e-6);
    }

    #[test]
    fn course_wraps_through_north() {
        let config = SimulatorConfig {
            base_course: 350.0,
            ..SimulatorConfig::default()
        };
        let mut base = BaseStage::new(&config);
        base.target_cog = 10.0;
        base.advance(1.0, &config);
        // Shortest arc is +20°, so the course moves up through 360, not down.
        assert!(base.cog > 350.0 || base.cog < 10.0);
    }

    #[test]
    fn speed_converges_toward_target() {
        let config = SimulatorConfig::default();
        let mut base = BaseStage::new(&config);
        base.target_sog = 20.0;
        let before = (20.0f64 - base.sog).abs();
        for _ in 0..100 {
            base.advance(0.1, &config);
        }
        let after = (20.0f64 - base.sog).abs();
        assert!(after < before);
    }
}
