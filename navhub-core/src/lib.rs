//! # navhub-core
//!
//! The core of a marine navigation hub. Raw NMEA-0183 sentences come in from
//! serial ports and UDP listeners, get decoded into a unified navigation
//! state and fanned out to subscribers, while raw frames are multiplexed to
//! serial/UDP outputs with per-output source filtering. An internal layered
//! simulator produces the same sentence formats (GPS, wind, water, AIS
//! traffic) for bench use, driven by a 100 ms scheduler tick.
//!
//! The graphical dashboard, settings windows and the on-disk configuration
//! encoding live outside this crate; they attach through the log callback,
//! the bus subscription and the configuration surface on [`hub::NavHub`].

pub mod bus;
pub mod codec;
pub mod config;
pub mod error;
pub mod hub;
pub mod manager;
pub mod navdata;
pub mod scheduler;
pub mod services;
pub mod sim;

pub use bus::{MessageBus, SubscriberId};
pub use codec::DecoderOptions;
pub use config::{
    AisTargetConfig, OutputConfig, OutputKind, SimulatorConfig, SourceConfig, SourceKind,
    SIMULATOR_SOURCE_ID,
};
pub use error::{CodecError, ServiceError};
pub use hub::NavHub;
pub use manager::{LogCallback, ServiceManager};
pub use navdata::NavData;
pub use scheduler::Scheduler;
pub use sim::Simulator;
