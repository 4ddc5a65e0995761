//! The layered sentence simulator.
//!
//! The chain is an explicit ordered list of stage values with a single
//! interpreter: [`Simulator::advance`] steps every stage in order (base
//! motion first, so later stages see fresh kinematics), [`Simulator::snapshot`]
//! folds the stages into one navigation record (outer stages may override
//! flags set by inner ones), and [`Simulator::drain_sentences`] hands out the
//! frames queued since the last drain, inner stages first.

mod ais;
mod base;
mod gps;
mod water;
mod wind;

use std::sync::Mutex;

use crate::config::{default_ais_targets, SimulatorConfig, SIMULATOR_SOURCE_ID};
use crate::navdata::NavData;

use ais::AisStage;
use base::BaseStage;
use gps::GpsStage;
use water::WaterStage;
use wind::WindStage;

/// Own-vessel ground track produced by the base stage and consumed by the
/// emitting stages within one tick.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Kinematics {
    pub latitude: f64,
    pub longitude: f64,
    /// Knots.
    pub sog: f64,
    /// Degrees.
    pub cog: f64,
}

/// Flat-earth dead reckoning step: degrees moved for `dt` seconds at
/// `sog` knots on course `cog`.
pub(crate) fn dead_reckon(latitude: f64, sog: f64, cog: f64, dt: f64) -> (f64, f64) {
    let distance_nm = sog * dt / 3600.0;
    let cog_rad = cog.to_radians();
    let d_lat = distance_nm * cog_rad.cos() / 60.0;
    let d_lon = distance_nm * cog_rad.sin() / (60.0 * latitude.to_radians().cos());
    (d_lat, d_lon)
}

enum Stage {
    Base(BaseStage),
    Gps(GpsStage),
    Wind(WindStage),
    Water(WaterStage),
    Ais(AisStage),
}

struct ChainState {
    config: SimulatorConfig,
    stages: Vec<Stage>,
    pending: Vec<String>,
}

/// The simulator chain. Shared between the scheduler tick (write path) and
/// the broadcaster (read path); one internal mutex guards configuration and
/// physics together.
pub struct Simulator {
    inner: Mutex<ChainState>,
}

impl Simulator {
    pub fn new(mut config: SimulatorConfig) -> Self {
        if config.ais_targets.is_empty() {
            config.ais_targets =
                default_ais_targets(config.start_latitude, config.start_longitude);
        }
        let stages = vec![
            Stage::Base(BaseStage::new(&config)),
            Stage::Gps(GpsStage::default()),
            Stage::Wind(WindStage::default()),
            Stage::Water(WaterStage::new(&config)),
            Stage::Ais(AisStage::new(&config)),
        ];
        Simulator {
            inner: Mutex::new(ChainState {
                config,
                stages,
                pending: Vec::new(),
            }),
        }
    }

    /// Step the chain by `dt` seconds. Due sentences are queued for the next
    /// [`Self::drain_sentences`].
    pub fn advance(&self, dt: f64) {
        let mut inner = self.inner.lock().unwrap();
        let ChainState {
            config,
            stages,
            pending,
        } = &mut *inner;

        let mut kin = Kinematics::default();
        for stage in stages.iter_mut() {
            match stage {
                Stage::Base(base) => {
                    base.advance(dt, config);
                    kin = base.kinematics();
                }
                Stage::Gps(gps) => gps.advance(dt, config, &kin, pending),
                Stage::Wind(wind) => wind.advance(dt, config, pending),
                Stage::Water(water) => water.advance(dt, config, &kin, pending),
                Stage::Ais(ais) => ais.advance(dt, config, pending),
            }
        }
    }

    /// Compose the current navigation record, inner stages first.
    pub fn snapshot(&self) -> NavData {
        let inner = self.inner.lock().unwrap();
        let mut data = NavData::new(SIMULATOR_SOURCE_ID);
        for stage in &inner.stages {
            match stage {
                Stage::Base(base) => base.fold(&mut data),
                Stage::Gps(gps) => gps.fold(&mut data, &inner.config),
                Stage::Wind(wind) => wind.fold(&mut data, &inner.config),
                Stage::Water(water) => water.fold(&mut data, &inner.config),
                Stage::Ais(_) => {}
            }
        }
        data
    }

    /// Take every sentence queued since the last drain. Multi-line AIVDM
    /// groups come out as one CRLF-joined entry.
    pub fn drain_sentences(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().unwrap().pending)
    }

    pub fn config(&self) -> SimulatorConfig {
        self.inner.lock().unwrap().config.clone()
    }

    /// Replace the configuration. The vessel jumps to the configured start
    /// position only when that position changed; AIS target state is
    /// re-seeded from the new target list.
    pub fn set_config(&self, config: SimulatorConfig) {
        let mut inner = self.inner.lock().unwrap();
        let position_changed = config.start_latitude != inner.config.start_latitude
            || config.start_longitude != inner.config.start_longitude;
        inner.config = config;

        let ChainState { config, stages, .. } = &mut *inner;
        for stage in stages.iter_mut() {
            match stage {
                Stage::Base(base) if position_changed => {
                    base.set_position(config.start_latitude, config.start_longitude);
                }
                Stage::Ais(ais) => ais.reseed(config),
                _ => {}
            }
        }
    }

    /// Force the vessel position, e.g. from a real fix before switching over.
    pub fn set_position(&self, latitude: f64, longitude: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.config.start_latitude = latitude;
        inner.config.start_longitude = longitude;
        let ChainState { stages, .. } = &mut *inner;
        for stage in stages.iter_mut() {
            if let Stage::Base(base) = stage {
                base.set_position(latitude, longitude);
            }
        }
    }
}
