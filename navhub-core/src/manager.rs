//! Service lifecycle and frame multiplexing.
//!
//! The manager is the sole owner of the running source and output services,
//! keyed by configuration id. Ingress callbacks run on the I/O worker thread
//! of the originating source and fan received frames out to eligible outputs,
//! so the maps are guarded by separate locks instead of one big mutex.
//!
//! Lock order (never the reverse): output configs → running outputs →
//! an output's send queue. The sources map is never taken on the ingress
//! path, which keeps stop-and-join free of self-deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

use crate::bus::MessageBus;
use crate::codec::{self, DecoderOptions};
use crate::config::{
    effective_baud, normalize_sources, OutputConfig, OutputKind, SourceConfig, SourceKind,
};
use crate::navdata::NavData;
use crate::services::serial::{SerialOutput, SerialSource};
use crate::services::udp::{UdpOutput, UdpSource};
use crate::services::{FrameCallback, Service, SimulatorSource};

/// Receives `(source_tag, sentence)` for every sentence observed or emitted.
pub type LogCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Clone)]
pub struct ServiceManager {
    shared: Arc<ManagerShared>,
}

struct ManagerShared {
    sources: Mutex<HashMap<String, Box<dyn Service>>>,
    outputs: Mutex<HashMap<String, Box<dyn Service>>>,
    source_configs: Mutex<Vec<SourceConfig>>,
    output_configs: Mutex<Vec<OutputConfig>>,
    log_callback: Mutex<Option<LogCallback>>,
    bus: Arc<MessageBus>,
    decoder: DecoderOptions,
}

impl ServiceManager {
    pub fn new(bus: Arc<MessageBus>, decoder: DecoderOptions) -> Self {
        ServiceManager {
            shared: Arc::new(ManagerShared {
                sources: Mutex::new(HashMap::new()),
                outputs: Mutex::new(HashMap::new()),
                source_configs: Mutex::new(Vec::new()),
                output_configs: Mutex::new(Vec::new()),
                log_callback: Mutex::new(None),
                bus,
                decoder,
            }),
        }
    }

    pub fn set_log_callback(&self, callback: LogCallback) {
        *self.shared.log_callback.lock().unwrap() = Some(callback);
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.shared.bus
    }

    // ── Configuration surface ────────────────────────────────────────────────

    /// Install the source configuration set (normalized: duplicate ids
    /// collapse, the reserved "SIMULATOR" entry is inserted if absent) and
    /// apply every entry.
    pub fn load_sources(&self, mut sources: Vec<SourceConfig>) {
        normalize_sources(&mut sources);
        *self.shared.source_configs.lock().unwrap() = sources.clone();
        for config in &sources {
            self.apply_source_config(config);
        }
    }

    /// Install the output configuration set and apply every entry.
    pub fn load_outputs(&self, outputs: Vec<OutputConfig>) {
        *self.shared.output_configs.lock().unwrap() = outputs.clone();
        for config in &outputs {
            self.apply_output_config(config);
        }
    }

    pub fn source_configs(&self) -> Vec<SourceConfig> {
        self.shared.source_configs.lock().unwrap().clone()
    }

    pub fn output_configs(&self) -> Vec<OutputConfig> {
        self.shared.output_configs.lock().unwrap().clone()
    }

    /// Insert or replace one source configuration without applying it.
    pub fn upsert_source(&self, config: SourceConfig) {
        let mut configs = self.shared.source_configs.lock().unwrap();
        if let Some(existing) = configs.iter_mut().find(|c| c.id == config.id) {
            *existing = config;
        } else {
            configs.push(config);
        }
    }

    /// Insert or replace one output configuration without applying it.
    pub fn upsert_output(&self, config: OutputConfig) {
        let mut configs = self.shared.output_configs.lock().unwrap();
        if let Some(existing) = configs.iter_mut().find(|c| c.id == config.id) {
            *existing = config;
        } else {
            configs.push(config);
        }
    }

    /// Remove a source configuration and stop its running service.
    pub fn remove_source(&self, id: &str) {
        self.shared
            .source_configs
            .lock()
            .unwrap()
            .retain(|c| c.id != id);
        self.stop_source(id);
    }

    /// Remove an output configuration and stop its running service.
    pub fn remove_output(&self, id: &str) {
        self.shared
            .output_configs
            .lock()
            .unwrap()
            .retain(|c| c.id != id);
        self.stop_output(id);
    }

    pub fn is_source_enabled(&self, id: &str) -> bool {
        self.shared
            .source_configs
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.id == id && c.enabled)
    }

    // ── Apply ────────────────────────────────────────────────────────────────

    /// Re-apply the stored configuration for `id`. Unknown ids are a no-op.
    pub fn apply_source(&self, id: &str) {
        let config = {
            let configs = self.shared.source_configs.lock().unwrap();
            configs.iter().find(|c| c.id == id).cloned()
        };
        match config {
            Some(config) => self.apply_source_config(&config),
            None => debug!("apply for unknown source id {id:?} ignored"),
        }
    }

    /// Re-apply the stored configuration for output `id`.
    pub fn apply_output(&self, id: &str) {
        let config = {
            let configs = self.shared.output_configs.lock().unwrap();
            configs.iter().find(|c| c.id == id).cloned()
        };
        match config {
            Some(config) => self.apply_output_config(&config),
            None => debug!("apply for unknown output id {id:?} ignored"),
        }
    }

    /// Bring the running state for this source in line with `config`: any
    /// existing service is stopped and removed, and a fresh one is started
    /// when the configuration is enabled.
    pub fn apply_source_config(&self, config: &SourceConfig) {
        self.stop_source(&config.id);
        if !config.enabled {
            return;
        }

        let mut service: Box<dyn Service> = match &config.kind {
            SourceKind::Serial { port, baud } => Box::new(SerialSource::new(
                port.clone(),
                effective_baud(*baud),
                self.ingress_callback(config),
            )),
            SourceKind::Udp { port } => {
                Box::new(UdpSource::new(*port, self.ingress_callback(config)))
            }
            SourceKind::Simulator => Box::<SimulatorSource>::default(),
        };

        match service.start() {
            Ok(()) => {
                info!("source {:?} ({}) started", config.id, config.name);
                self.shared
                    .sources
                    .lock()
                    .unwrap()
                    .insert(config.id.clone(), service);
            }
            Err(e) => error!("failed to start source {:?}: {e}", config.id),
        }
    }

    /// Output counterpart of [`Self::apply_source_config`].
    pub fn apply_output_config(&self, config: &OutputConfig) {
        self.stop_output(&config.id);
        if !config.enabled {
            return;
        }

        let mut service: Box<dyn Service> = match &config.kind {
            OutputKind::Serial { port, baud } => {
                Box::new(SerialOutput::new(port.clone(), effective_baud(*baud)))
            }
            OutputKind::Udp { host, port } => Box::new(UdpOutput::new(host.clone(), *port)),
        };

        match service.start() {
            Ok(()) => {
                info!("output {:?} ({}) started", config.id, config.name);
                self.shared
                    .outputs
                    .lock()
                    .unwrap()
                    .insert(config.id.clone(), service);
            }
            Err(e) => error!("failed to start output {:?}: {e}", config.id),
        }
    }

    fn stop_source(&self, id: &str) {
        let service = self.shared.sources.lock().unwrap().remove(id);
        if let Some(mut service) = service {
            service.stop();
            info!("source {id:?} stopped");
        }
    }

    fn stop_output(&self, id: &str) {
        let service = self.shared.outputs.lock().unwrap().remove(id);
        if let Some(mut service) = service {
            service.stop();
            info!("output {id:?} stopped");
        }
    }

    /// Stop and drop every running service. Configurations are retained.
    pub fn stop_all(&self) {
        let sources: Vec<_> = self.shared.sources.lock().unwrap().drain().collect();
        for (id, mut service) in sources {
            service.stop();
            debug!("source {id:?} stopped");
        }
        let outputs: Vec<_> = self.shared.outputs.lock().unwrap().drain().collect();
        for (id, mut service) in outputs {
            service.stop();
            debug!("output {id:?} stopped");
        }
    }

    pub fn is_source_running(&self, id: &str) -> bool {
        self.shared
            .sources
            .lock()
            .unwrap()
            .get(id)
            .map(|s| s.is_running())
            .unwrap_or(false)
    }

    pub fn is_output_running(&self, id: &str) -> bool {
        self.shared
            .outputs
            .lock()
            .unwrap()
            .get(id)
            .map(|s| s.is_running())
            .unwrap_or(false)
    }

    // ── Ingress and fan-out ──────────────────────────────────────────────────

    fn ingress_callback(&self, config: &SourceConfig) -> FrameCallback {
        let weak = Arc::downgrade(&self.shared);
        let id = config.id.clone();
        let tag = config.source_tag();
        let serial_framing = matches!(config.kind, SourceKind::Serial { .. });
        Arc::new(move |bytes: &[u8], _origin: &str| {
            if let Some(shared) = weak.upgrade() {
                shared.ingest(&id, &tag, serial_framing, bytes);
            }
        })
    }

    /// Fan a raw frame out to every enabled output whose filter admits
    /// `source_id`. Best effort: enqueue only, never blocks on delivery.
    pub fn broadcast(&self, frame: &str, source_id: &str) {
        self.shared.broadcast(frame, source_id);
    }

    /// Invoke the configured log callback, if any.
    pub fn log_sentence(&self, source_tag: &str, sentence: &str) {
        self.shared.log_sentence(source_tag, sentence);
    }
}

impl ManagerShared {
    /// Ingress processing on the source's worker thread: frame the chunk,
    /// then per sentence (a) fan out the raw frame, (b) log it, (c) decode
    /// and publish on the bus.
    fn ingest(&self, id: &str, tag: &str, serial_framing: bool, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let sentences = if serial_framing {
            frame_serial(&text)
        } else {
            frame_datagram(&text)
        };

        for sentence in sentences {
            self.broadcast(&format!("{sentence}\r\n"), id);
            self.log_sentence(tag, &sentence);

            let mut record = NavData::new(tag);
            match codec::decode_into(&sentence, &mut record, &self.decoder) {
                Ok(true) => self.bus.publish(&record),
                Ok(false) => {}
                Err(e) => debug!("discarding sentence from {tag}: {e}"),
            }
        }
    }

    fn broadcast(&self, frame: &str, source_id: &str) {
        let eligible: Vec<String> = {
            let configs = self.output_configs.lock().unwrap();
            configs
                .iter()
                .filter(|c| c.enabled && c.accepts(source_id))
                .map(|c| c.id.clone())
                .collect()
        };
        if eligible.is_empty() {
            return;
        }
        let outputs = self.outputs.lock().unwrap();
        for id in eligible {
            if let Some(service) = outputs.get(&id) {
                if service.is_running() {
                    service.send(frame);
                }
            }
        }
    }

    fn log_sentence(&self, source_tag: &str, sentence: &str) {
        let callback = self.log_callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(source_tag, sentence);
        }
    }
}

impl Drop for ServiceManager {
    fn drop(&mut self) {
        // Only the last clone tears the services down.
        if Arc::strong_count(&self.shared) == 1 {
            self.stop_all();
        }
    }
}

/// Serial framing: CR/LF characters are stripped from the chunk, then every
/// `$`-delimited fragment becomes one sentence with `$` re-prepended.
fn frame_serial(text: &str) -> Vec<String> {
    let cleaned: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    cleaned
        .split('$')
        .filter(|fragment| !fragment.is_empty())
        .map(|fragment| format!("${fragment}"))
        .collect()
}

/// Datagram framing: one sentence per datagram, CR/LF stripped.
fn frame_datagram(text: &str) -> Vec<String> {
    let cleaned: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    if cleaned.is_empty() {
        Vec::new()
    } else {
        vec![cleaned]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SIMULATOR_SOURCE_ID;
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    fn manager() -> ServiceManager {
        ServiceManager::new(Arc::new(MessageBus::new()), DecoderOptions::default())
    }

    fn udp_source(id: &str, enabled: bool, port: u16) -> SourceConfig {
        SourceConfig {
            id: id.to_string(),
            name: format!("{id} listener"),
            enabled,
            kind: SourceKind::Udp { port },
        }
    }

    fn udp_output(id: &str, port: u16, multiplex_all: bool, allowed: &[&str]) -> OutputConfig {
        OutputConfig {
            id: id.to_string(),
            name: String::new(),
            enabled: true,
            kind: OutputKind::Udp {
                host: "127.0.0.1".to_string(),
                port,
            },
            multiplex_all,
            allowed_sources: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn free_port() -> u16 {
        let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    }

    #[test]
    fn serial_framing_splits_and_reprepends() {
        let frames = frame_serial("\r\n$GPRMC,1,2$IIMWV,3,4\r\n");
        assert_eq!(frames, vec!["$GPRMC,1,2", "$IIMWV,3,4"]);
        assert!(frame_serial("\r\n").is_empty());
    }

    #[test]
    fn datagram_framing_passes_through_one_sentence() {
        assert_eq!(
            frame_datagram("$GPRMC,1,2*00\r\n"),
            vec!["$GPRMC,1,2*00".to_string()]
        );
        assert!(frame_datagram("\r\n").is_empty());
    }

    #[test]
    fn load_sources_reserves_the_simulator_entry() {
        let manager = manager();
        manager.load_sources(Vec::new());
        let configs = manager.source_configs();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].id, SIMULATOR_SOURCE_ID);
        assert!(!manager.is_source_enabled(SIMULATOR_SOURCE_ID));
        // Disabled configurations start nothing.
        assert!(!manager.is_source_running(SIMULATOR_SOURCE_ID));
    }

    #[test]
    fn apply_cycle_restarts_a_source() {
        let manager = manager();
        let port = free_port();

        manager.load_sources(vec![udp_source("S1", true, port)]);
        assert!(manager.is_source_running("S1"));

        // Disable: the entry disappears from the running set.
        manager.upsert_source(udp_source("S1", false, port));
        manager.apply_source("S1");
        assert!(!manager.is_source_running("S1"));

        // Re-enable on another port: a fresh service is started.
        let port2 = free_port();
        manager.upsert_source(udp_source("S1", true, port2));
        manager.apply_source("S1");
        assert!(manager.is_source_running("S1"));

        manager.stop_all();
        assert!(!manager.is_source_running("S1"));
    }

    #[test]
    fn remove_stops_the_service_and_drops_the_config() {
        let manager = manager();
        let port = free_port();
        manager.load_sources(vec![udp_source("S1", true, port)]);
        assert!(manager.is_source_running("S1"));

        manager.remove_source("S1");
        assert!(!manager.is_source_running("S1"));
        assert!(!manager.source_configs().iter().any(|c| c.id == "S1"));

        let out_port = free_port();
        manager.upsert_output(udp_output("O1", out_port, true, &[]));
        manager.apply_output("O1");
        assert!(manager.is_output_running("O1"));
        manager.remove_output("O1");
        assert!(!manager.is_output_running("O1"));
    }

    #[test]
    fn apply_for_unknown_id_is_a_no_op() {
        let manager = manager();
        manager.apply_source("missing");
        manager.apply_output("missing");
        assert!(!manager.is_source_running("missing"));
    }

    #[test]
    fn broadcast_honors_the_multiplex_filter() {
        let manager = manager();
        let port_all = free_port();
        let port_filtered = free_port();

        let rx_all = UdpSocket::bind(("127.0.0.1", port_all)).unwrap();
        rx_all.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let rx_filtered = UdpSocket::bind(("127.0.0.1", port_filtered)).unwrap();
        rx_filtered
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();

        manager.load_outputs(vec![
            udp_output("O1", port_all, true, &[]),
            udp_output("O2", port_filtered, false, &["S1"]),
        ]);

        manager.broadcast("$GPRMC,frame*00\r\n", "S2");

        let mut buf = [0u8; 128];
        let (n, _) = rx_all.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"$GPRMC,frame*00\r\n");
        assert!(rx_filtered.recv_from(&mut buf).is_err(), "O2 must filter S2");

        manager.stop_all();
    }

    #[test]
    fn disabled_output_receives_nothing() {
        let manager = manager();
        let port = free_port();
        let rx = UdpSocket::bind(("127.0.0.1", port)).unwrap();
        rx.set_read_timeout(Some(Duration::from_millis(300))).unwrap();

        let mut output = udp_output("O1", port, true, &[]);
        output.enabled = false;
        manager.load_outputs(vec![output]);
        assert!(!manager.is_output_running("O1"));

        manager.broadcast("$frame*00\r\n", "S1");
        let mut buf = [0u8; 64];
        assert!(rx.recv_from(&mut buf).is_err());
    }

    #[test]
    fn ingress_publishes_decoded_records_and_logs() {
        let bus = Arc::new(MessageBus::new());
        let manager = ServiceManager::new(bus.clone(), DecoderOptions::default());

        let records: Arc<Mutex<Vec<NavData>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = records.clone();
        bus.subscribe(move |data| sink.lock().unwrap().push(data.clone()));

        let logged: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let log_sink = logged.clone();
        manager.set_log_callback(Arc::new(move |tag, sentence| {
            log_sink
                .lock()
                .unwrap()
                .push((tag.to_string(), sentence.to_string()));
        }));

        let listen_port = free_port();
        manager.load_sources(vec![udp_source("U1", true, listen_port)]);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(
                b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,,,A*67\r\n",
                ("127.0.0.1", listen_port),
            )
            .unwrap();
        // A corrupted sentence must be logged but never published.
        sender
            .send_to(
                b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,,,A*66\r\n",
                ("127.0.0.1", listen_port),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline && logged.lock().unwrap().len() < 2 {
            std::thread::sleep(Duration::from_millis(10));
        }

        let logged = logged.lock().unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0].0, "UDP:U1");
        assert!(logged[0].1.starts_with("$GPRMC"));

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1, "checksum failures are not published");
        assert_eq!(records[0].source_id, "UDP:U1");
        assert!(records[0].gps_valid);
        assert!((records[0].latitude - 48.1173).abs() < 1e-4);

        drop(records);
        drop(logged);
        manager.stop_all();
    }

    #[test]
    fn ingested_frames_fan_out_to_eligible_outputs() {
        let manager = manager();
        let listen_port = free_port();
        let out_port = free_port();

        let rx = UdpSocket::bind(("127.0.0.1", out_port)).unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        manager.load_sources(vec![udp_source("U1", true, listen_port)]);
        manager.load_outputs(vec![udp_output("O1", out_port, false, &["U1"])]);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(b"$IIMTW,19.5,C*1E\r\n", ("127.0.0.1", listen_port))
            .unwrap();

        let mut buf = [0u8; 128];
        let (n, _) = rx.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"$IIMTW,19.5,C*1E\r\n");

        manager.stop_all();
    }
}
