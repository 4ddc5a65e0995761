//! Serial source and output workers.
//!
//! Ports are opened 8N1, no flow control, at the configured baud rate. The
//! read timeout doubles as the stop-flag poll interval, so `stop` returns
//! within one poll period.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;

use super::{FrameCallback, SendQueue, Service, READ_POLL};

fn open_port(path: &str, baud: u32) -> Result<Box<dyn SerialPort>, ServiceError> {
    serialport::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_POLL)
        .open()
        .map_err(|source| ServiceError::SerialOpen {
            port: path.to_string(),
            source,
        })
}

// ── Source ───────────────────────────────────────────────────────────────────

/// Reads raw byte chunks off a tty and hands them to the ingress callback.
pub struct SerialSource {
    path: String,
    baud: u32,
    on_data: FrameCallback,
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SerialSource {
    pub fn new(path: impl Into<String>, baud: u32, on_data: FrameCallback) -> Self {
        SerialSource {
            path: path.into(),
            baud,
            on_data,
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Service for SerialSource {
    fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let mut port = open_port(&self.path, self.baud)?;

        self.stop.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);

        let path = self.path.clone();
        let on_data = self.on_data.clone();
        let running = self.running.clone();
        let stop = self.stop.clone();
        self.worker = Some(std::thread::spawn(move || {
            let mut buf = [0u8; 1024];
            while !stop.load(Ordering::SeqCst) {
                match port.read(&mut buf) {
                    Ok(0) => continue,
                    Ok(n) => on_data(&buf[..n], &path),
                    Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                        continue;
                    }
                    Err(e) => {
                        error!("serial read error on {path}: {e}");
                        break;
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            debug!("serial source worker on {path} exited");
        }));
        info!("serial source listening on {} @ {} baud", self.path, self.baud);
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

impl Drop for SerialSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

/// Drains a FIFO frame queue onto a tty. Failed writes drop the offending
/// frame and keep draining.
pub struct SerialOutput {
    path: String,
    baud: u32,
    queue: Arc<SendQueue>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SerialOutput {
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        SerialOutput {
            path: path.into(),
            baud,
            queue: SendQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl Service for SerialOutput {
    fn start(&mut self) -> Result<(), ServiceError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        let mut port = open_port(&self.path, self.baud)?;

        self.queue = SendQueue::new();
        self.running.store(true, Ordering::SeqCst);

        let path = self.path.clone();
        let queue = self.queue.clone();
        let running = self.running.clone();
        self.worker = Some(std::thread::spawn(move || {
            while let Some(frame) = queue.pop() {
                if let Err(e) = port.write_all(frame.as_bytes()) {
                    warn!("serial write error on {path}, dropping frame: {e}");
                }
            }
            running.store(false, Ordering::SeqCst);
        }));
        info!("serial output opened on {} @ {} baud", self.path, self.baud);
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

impl Drop for SerialOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
