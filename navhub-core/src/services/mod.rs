//! Source and output workers.
//!
//! Every service owns exactly one I/O worker thread. `start` opens the
//! underlying handle and spawns the worker; `stop` cancels the pending read
//! or write, closes the handle and joins the worker before returning. Both
//! are idempotent. A worker that hits a non-timeout transport error logs it
//! and stops itself; the manager restarts it on the next configuration apply.

pub mod serial;
pub mod udp;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::ServiceError;

/// How long a blocking read may sit before the worker re-checks its stop
/// flag. This is the cancellation latency of `stop`.
pub(crate) const READ_POLL: Duration = Duration::from_millis(100);

/// Receives raw transport chunks: `(bytes, origin)`. Origin is the port path
/// for serial reads and `"<remote-ip>:<remote-port>"` for UDP datagrams.
pub type FrameCallback = Arc<dyn Fn(&[u8], &str) + Send + Sync>;

/// A running input or output worker.
pub trait Service: Send {
    fn start(&mut self) -> Result<(), ServiceError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    /// Queue a frame for transmission. No-op for sources.
    fn send(&self, _frame: &str) {}
}

// ── Simulator placeholder ────────────────────────────────────────────────────

/// The "SIMULATOR" source owns no transport; it only reports running so the
/// multiplexer and the scheduler can check its state. Sentence production is
/// driven by the scheduler tick against the shared simulator chain.
#[derive(Default)]
pub struct SimulatorSource {
    running: AtomicBool,
}

impl Service for SimulatorSource {
    fn start(&mut self) -> Result<(), ServiceError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ── Output send queue ────────────────────────────────────────────────────────

/// FIFO frame queue shared between `send` callers and an output's drain
/// worker. Closing wakes the worker and discards frames that were queued but
/// not yet submitted; the in-flight write completes on the worker.
pub(crate) struct SendQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

struct QueueState {
    frames: VecDeque<String>,
    closed: bool,
}

impl SendQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(SendQueue {
            state: Mutex::new(QueueState {
                frames: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        })
    }

    /// Append a frame. Never blocks beyond the queue lock.
    pub(crate) fn push(&self, frame: String) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.frames.push_back(frame);
        self.available.notify_one();
    }

    /// Blocking pop; `None` once the queue is closed.
    pub(crate) fn pop(&self) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                return None;
            }
            if let Some(frame) = state.frames.pop_front() {
                return Some(frame);
            }
            state = self.available.wait(state).unwrap();
        }
    }

    pub(crate) fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.frames.clear();
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().unwrap().frames.len()
    }
}
