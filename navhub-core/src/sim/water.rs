//! Water stage: depth and temperature envelopes, DBS/DPT/MTW/HDT/VHW
//! emission.
//!
//! Depth and water temperature swing across their configured envelopes on a
//! 60 s sinusoid. Speed through water mirrors SOG and heading mirrors COG.

use std::f64::consts::TAU;

use crate::codec::emit::seal;
use crate::config::SimulatorConfig;
use crate::navdata::NavData;

use super::Kinematics;

const CYCLE_SECS: f64 = 60.0;

const METERS_TO_FEET: f64 = 3.28084;
const METERS_TO_FATHOMS: f64 = 0.546807;
const KNOTS_TO_KPH: f64 = 1.852;

pub(super) struct WaterStage {
    depth: f64,
    temperature: f64,
    cycle_timer: f64,
    since_emit_ms: f64,
}

impl WaterStage {
    pub(super) fn new(config: &SimulatorConfig) -> Self {
        WaterStage {
            depth: config.min_depth,
            temperature: config.min_water_temp,
            cycle_timer: 0.0,
            since_emit_ms: 0.0,
        }
    }

    pub(super) fn advance(
        &mut self,
        dt: f64,
        config: &SimulatorConfig,
        kin: &Kinematics,
        pending: &mut Vec<String>,
    ) {
        self.since_emit_ms += dt * 1000.0;
        if !config.enable_water {
            return;
        }

        self.cycle_timer += dt;
        if self.cycle_timer >= CYCLE_SECS {
            self.cycle_timer -= CYCLE_SECS;
        }
        let factor = 0.5 * (1.0 + (TAU * self.cycle_timer / CYCLE_SECS).sin());
        self.depth = config.min_depth + (config.max_depth - config.min_depth) * factor;
        self.temperature =
            config.min_water_temp + (config.max_water_temp - config.min_water_temp) * factor;

        if self.since_emit_ms >= config.water_period_ms as f64 {
            pending.push(dbs(self.depth));
            pending.push(dpt(self.depth));
            pending.push(mtw(self.temperature));
            pending.push(hdt(kin.cog));
            pending.push(vhw(kin.cog, kin.sog));
            self.since_emit_ms = 0.0;
        }
    }

    pub(super) fn fold(&self, data: &mut NavData, config: &SimulatorConfig) {
        if config.enable_water {
            data.depth = self.depth;
            data.has_depth = true;
            data.water_temperature = self.temperature;
            data.has_water_temperature = true;
            // The bench vessel reads STW = SOG and heading = COG.
            data.speed_through_water = data.speed_over_ground;
            data.has_water_speed = true;
            data.heading = data.course_over_ground;
            data.has_heading = true;
        }
    }
}

fn dbs(depth: f64) -> String {
    let feet = depth * METERS_TO_FEET;
    let fathoms = depth * METERS_TO_FATHOMS;
    seal(&format!("IIDBS,{feet:.1},f,{depth:.1},M,{fathoms:.1},F"))
}

fn dpt(depth: f64) -> String {
    seal(&format!("IIDPT,{depth:.1},0.0,100.0"))
}

fn mtw(temperature: f64) -> String {
    seal(&format!("IIMTW,{temperature:.1},C"))
}

fn hdt(heading: f64) -> String {
    seal(&format!("IIHDT,{heading:.1},T"))
}

fn vhw(heading: f64, stw: f64) -> String {
    let kph = stw * KNOTS_TO_KPH;
    seal(&format!(
        "IIVHW,{heading:.1},T,{heading:.1},M,{stw:.1},N,{kph:.1},K"
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{decode_into, verify_checksum, DecoderOptions};
    use crate::navdata::NavData;

    fn watery_config() -> SimulatorConfig {
        SimulatorConfig {
            enable_gps: false,
            enable_wind: false,
            enable_ais: false,
            enable_water: true,
            min_depth: 5.0,
            max_depth: 50.0,
            min_water_temp: 15.0,
            max_water_temp: 25.0,
            water_period_ms: 1000,
            ..SimulatorConfig::default()
        }
    }

    #[test]
    fn depth_and_temperature_stay_inside_their_envelopes() {
        let config = watery_config();
        let mut water = WaterStage::new(&config);
        let kin = Kinematics::default();
        let mut pending = Vec::new();

        for _ in 0..900 {
            water.advance(0.1, &config, &kin, &mut pending);
            assert!(water.depth >= config.min_depth - 1e-9);
            assert!(water.depth <= config.max_depth + 1e-9);
            assert!(water.temperature >= config.min_water_temp - 1e-9);
            assert!(water.temperature <= config.max_water_temp + 1e-9);
        }
    }

    #[test]
    fn quarter_cycle_peaks_the_sinusoid() {
        let config = watery_config();
        let mut water = WaterStage::new(&config);
        let kin = Kinematics::default();
        let mut pending = Vec::new();
        for _ in 0..150 {
            water.advance(0.1, &config, &kin, &mut pending);
        }
        // sin(2π·15/60) = 1: depth at the top of the envelope.
        assert!((water.depth - config.max_depth).abs() < 0.01);
        assert!((water.temperature - config.max_water_temp).abs() < 0.01);
    }

    #[test]
    fn emits_the_five_water_sentences_per_period() {
        let config = watery_config();
        let mut water = WaterStage::new(&config);
        let kin = Kinematics {
            cog: 90.0,
            sog: 9.8,
            ..Kinematics::default()
        };
        let mut pending = Vec::new();
        for _ in 0..10 {
            water.advance(0.1, &config, &kin, &mut pending);
        }
        assert_eq!(pending.len(), 5);
        let types: Vec<&str> = pending.iter().map(|s| &s[3..6]).collect();
        assert_eq!(types, vec!["DBS", "DPT", "MTW", "HDT", "VHW"]);

        for line in &pending {
            assert!(verify_checksum(line).is_ok());
        }

        let mut data = NavData::new("check");
        for line in &pending {
            decode_into(line, &mut data, &DecoderOptions::default()).unwrap();
        }
        assert!(data.has_depth && data.has_water_temperature);
        assert!(data.has_heading && data.has_water_speed);
        assert!((data.speed_through_water - 9.8).abs() < 0.1);
    }
}
