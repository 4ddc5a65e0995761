//! The periodic driver behind the simulator.
//!
//! One thread wakes every 100 ms. When the simulator is active it advances
//! the chain by 0.1 s; when the "SIMULATOR" source is also enabled it
//! publishes the snapshot on the bus and pushes the drained sentences through
//! the log callback and the multiplexer, as if they had arrived from a real
//! source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::bus::MessageBus;
use crate::config::SIMULATOR_SOURCE_ID;
use crate::manager::ServiceManager;
use crate::sim::Simulator;

const TICK: Duration = Duration::from_millis(100);
const TICK_SECS: f64 = 0.1;

pub struct Scheduler {
    active: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the driver thread. The simulator starts inactive.
    pub fn spawn(
        simulator: Arc<Simulator>,
        manager: ServiceManager,
        bus: Arc<MessageBus>,
    ) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let active = active.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    std::thread::sleep(TICK);
                    if !active.load(Ordering::SeqCst) {
                        continue;
                    }

                    simulator.advance(TICK_SECS);

                    if manager.is_source_enabled(SIMULATOR_SOURCE_ID) {
                        bus.publish(&simulator.snapshot());
                        for sentence in simulator.drain_sentences() {
                            manager.log_sentence(SIMULATOR_SOURCE_ID, &sentence);
                            manager.broadcast(&format!("{sentence}\r\n"), SIMULATOR_SOURCE_ID);
                        }
                    } else {
                        // Keep the queue bounded while nobody is listening.
                        let _ = simulator.drain_sentences();
                    }
                }
                debug!("scheduler tick thread exited");
            })
        };

        Scheduler {
            active,
            stop,
            worker: Some(worker),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stop the driver and join its thread.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::DecoderOptions;
    use crate::config::{SimulatorConfig, SourceConfig};
    use crate::navdata::NavData;
    use std::sync::Mutex;
    use std::time::Instant;

    #[test]
    fn tick_publishes_and_logs_when_simulator_source_is_enabled() {
        let bus = Arc::new(MessageBus::new());
        let manager = ServiceManager::new(bus.clone(), DecoderOptions::default());

        let mut sim_source = SourceConfig::simulator();
        sim_source.enabled = true;
        manager.load_sources(vec![sim_source]);
        assert!(manager.is_source_running(SIMULATOR_SOURCE_ID));

        let records: Arc<Mutex<Vec<NavData>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        bus.subscribe(move |data| sink.lock().unwrap().push(data.clone()));

        let logged: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let log_sink = logged.clone();
        manager.set_log_callback(Arc::new(move |tag, _| {
            log_sink.lock().unwrap().push(tag.to_string());
        }));

        let config = SimulatorConfig {
            gps_period_ms: 100,
            ..SimulatorConfig::default()
        };
        let simulator = Arc::new(Simulator::new(config));
        let mut scheduler = Scheduler::spawn(simulator, manager.clone(), bus.clone());
        scheduler.set_active(true);

        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if !records.lock().unwrap().is_empty() && !logged.lock().unwrap().is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        scheduler.stop();
        let records = records.lock().unwrap();
        assert!(!records.is_empty(), "snapshot should reach the bus");
        assert_eq!(records[0].source_id, SIMULATOR_SOURCE_ID);
        assert!(records[0].has_position);
        let logged = logged.lock().unwrap();
        assert!(!logged.is_empty(), "sentences should reach the log callback");
        assert!(logged.iter().all(|tag| tag == SIMULATOR_SOURCE_ID));

        drop(records);
        drop(logged);
        manager.stop_all();
    }

    #[test]
    fn inactive_scheduler_produces_nothing() {
        let bus = Arc::new(MessageBus::new());
        let manager = ServiceManager::new(bus.clone(), DecoderOptions::default());
        let mut sim_source = SourceConfig::simulator();
        sim_source.enabled = true;
        manager.load_sources(vec![sim_source]);

        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        bus.subscribe(move |_| *sink.lock().unwrap() += 1);

        let simulator = Arc::new(Simulator::new(SimulatorConfig::default()));
        let mut scheduler = Scheduler::spawn(simulator, manager.clone(), bus.clone());
        std::thread::sleep(Duration::from_millis(400));
        scheduler.stop();
        assert_eq!(*count.lock().unwrap(), 0);
        manager.stop_all();
    }
}
