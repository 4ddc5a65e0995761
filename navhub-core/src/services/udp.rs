//! UDP source and output workers.
//!
//! The source binds an unconnected listener and treats every datagram as one
//! frame. The output keeps an unconnected socket with a single resolved
//! remote endpoint and drains its send queue one datagram per frame.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};

use crate::error::ServiceError;

use super::{FrameCallback, SendQueue, Service, READ_POLL};

/// Receive buffer size; one NMEA sentence per datagram is assumed, 4 KiB
/// absorbs oversized senders.
const RECV_BUFFER: usize = 4096;

// ── Source ───────────────────────────────────────────────────────────────────

/// Listens on `0.0.0.0:<port>` and delivers one callback per datagram with
/// the peer address as origin tag.
pub struct UdpSource {
    port: u16,
    on_data: FrameCallback,
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl UdpSource {
    pub fn new(port: u16, on_data: FrameCallback) -> Self {
        UdpSource {
            port,
            on_data,
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Service for UdpSource {
    fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let socket =
            UdpSocket::bind(("0.0.0.0", self.port)).map_err(|source| ServiceError::UdpBind {
                port: self.port,
                source,
            })?;
        socket.set_read_timeout(Some(READ_POLL))?;

        self.stop.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let port = self.port;
        let on_data = self.on_data.clone();
        let running = self.running.clone();
        let stop = self.stop.clone();
        self.worker = Some(std::thread::spawn(move || {
            let mut buf = vec![0u8; RECV_BUFFER];
            while !stop.load(Ordering::SeqCst) {
                match socket.recv_from(&mut buf) {
                    Ok((n, peer)) => on_data(&buf[..n], &peer.to_string()),
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                        continue;
                    }
                    Err(e) => {
                        error!("UDP receive error on port {port}: {e}");
                        break;
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            debug!("UDP source worker on port {port} exited");
        }));
        info!("UDP source listening on 0.0.0.0:{}", self.port);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for UdpSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

/// Sends queued frames to one resolved `(host, port)` endpoint, one datagram
/// per frame, in FIFO order.
pub struct UdpOutput {
    host: String,
    port: u16,
    queue: Arc<SendQueue>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl UdpOutput {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        UdpOutput {
            host: host.into(),
            port,
            queue: SendQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn resolve(&self) -> Result<SocketAddr, ServiceError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ServiceError::Resolve {
                host: self.host.clone(),
                port: self.port,
            })
    }
}

impl Service for UdpOutput {
    fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let target = self.resolve()?;
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(ServiceError::UdpOpen)?;

        self.queue = SendQueue::new();
        self.running.store(true, Ordering::SeqCst);

        let queue = self.queue.clone();
        let running = self.running.clone();
        self.worker = Some(std::thread::spawn(move || {
            while let Some(frame) = queue.pop() {
                if let Err(e) = socket.send_to(frame.as_bytes(), target) {
                    warn!("UDP send to {target} failed, dropping frame: {e}");
                }
            }
            running.store(false, Ordering::SeqCst);
        }));
        info!("UDP output sending to {}:{}", self.host, self.port);
        Ok(())
    }

    fn stop(&mut self) {
        self.queue.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn send(&self, frame: &str) {
        if self.running.load(Ordering::SeqCst) {
            self.queue.push(frame.to_string());
        }
    }
}

impl Drop for UdpOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
