//! Assembly of the core: bus + manager + simulator + scheduler.
//!
//! External collaborators (dashboards, settings UIs, plugin hosts) attach
//! through three surfaces: the sentence log callback, the navigation-record
//! subscription, and the configuration apply/query methods.

use std::sync::Arc;

use crate::bus::{MessageBus, SubscriberId};
use crate::codec::DecoderOptions;
use crate::config::{OutputConfig, SimulatorConfig, SourceConfig};
use crate::manager::{LogCallback, ServiceManager};
use crate::navdata::NavData;
use crate::scheduler::Scheduler;
use crate::sim::Simulator;

pub struct NavHub {
    bus: Arc<MessageBus>,
    manager: ServiceManager,
    simulator: Arc<Simulator>,
    scheduler: Scheduler,
}

impl NavHub {
    pub fn new(decoder: DecoderOptions, simulator_config: SimulatorConfig) -> Self {
        let bus = Arc::new(MessageBus::new());
        let manager = ServiceManager::new(bus.clone(), decoder);
        let simulator = Arc::new(Simulator::new(simulator_config));
        let scheduler = Scheduler::spawn(simulator.clone(), manager.clone(), bus.clone());
        NavHub {
            bus,
            manager,
            simulator,
            scheduler,
        }
    }

    pub fn with_defaults() -> Self {
        NavHub::new(DecoderOptions::default(), SimulatorConfig::default())
    }

    // ── Collaborator surfaces ────────────────────────────────────────────────

    pub fn set_log_callback(&self, callback: LogCallback) {
        self.manager.set_log_callback(callback);
    }

    pub fn subscribe(&self, callback: impl Fn(&NavData) + Send + 'static) -> SubscriberId {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn manager(&self) -> &ServiceManager {
        &self.manager
    }

    pub fn simulator(&self) -> &Arc<Simulator> {
        &self.simulator
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    // ── Configuration ────────────────────────────────────────────────────────

    pub fn load_sources(&self, sources: Vec<SourceConfig>) {
        self.manager.load_sources(sources);
    }

    pub fn load_outputs(&self, outputs: Vec<OutputConfig>) {
        self.manager.load_outputs(outputs);
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        self.simulator.config()
    }

    pub fn set_simulator_config(&self, config: SimulatorConfig) {
        self.simulator.set_config(config);
    }

    // ── Simulator drive ──────────────────────────────────────────────────────

    pub fn set_simulator_active(&self, active: bool) {
        self.scheduler.set_active(active);
    }

    pub fn simulator_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Stop the scheduler and every running service. Configurations survive.
    pub fn shutdown(&mut self) {
        self.scheduler.stop();
        self.manager.stop_all();
    }
}

impl Drop for NavHub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SIMULATOR_SOURCE_ID;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[test]
    fn hub_wires_simulator_to_bus_and_log() {
        let mut config = SimulatorConfig::default();
        config.gps_period_ms = 100;
        let mut hub = NavHub::new(DecoderOptions::default(), config);

        let mut sim_source = SourceConfig::simulator();
        sim_source.enabled = true;
        hub.load_sources(vec![sim_source]);

        let merged: Arc<Mutex<NavData>> = Arc::new(Mutex::new(NavData::default()));
        let seen = Arc::new(Mutex::new(0usize));
        {
            let merged = merged.clone();
            let seen = seen.clone();
            hub.subscribe(move |update| {
                merged.lock().unwrap().merge_from(update);
                *seen.lock().unwrap() += 1;
            });
        }

        hub.set_simulator_active(true);
        assert!(hub.simulator_active());

        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline && *seen.lock().unwrap() == 0 {
            std::thread::sleep(Duration::from_millis(20));
        }
        hub.shutdown();

        assert!(*seen.lock().unwrap() > 0);
        let merged = merged.lock().unwrap();
        assert_eq!(merged.source_id, SIMULATOR_SOURCE_ID);
        assert!(merged.has_position);
        drop(merged);
    }

    #[test]
    fn simulator_config_surface_round_trips() {
        let hub = NavHub::with_defaults();
        let mut config = hub.simulator_config();
        config.base_speed = 7.5;
        hub.set_simulator_config(config);
        assert_eq!(hub.simulator_config().base_speed, 7.5);
    }
}
