//! In-process fan-out of navigation records.
//!
//! An owned many-to-many hub: the service manager and the scheduler publish,
//! dashboards and other consumers subscribe. Delivery is synchronous on the
//! publisher's thread, in subscription order, under the bus lock, so every
//! subscriber observes the same total order of publications. Subscribers that
//! need asynchrony hand records off to their own queue.
//!
//! Contract: callbacks must not call `subscribe`/`unsubscribe` on the same
//! bus from within their own invocation.

use std::sync::Mutex;

use crate::navdata::NavData;

pub type SubscriberId = u64;

type Callback = Box<dyn Fn(&NavData) + Send>;

#[derive(Default)]
pub struct MessageBus {
    inner: Mutex<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Callback)>,
}

impl MessageBus {
    pub fn new() -> Self {
        MessageBus::default()
    }

    /// Register a subscriber; ids are monotonically increasing.
    pub fn subscribe(&self, callback: impl Fn(&NavData) + Send + 'static) -> SubscriberId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    /// Deliver `data` to every live subscriber, synchronously and in
    /// insertion order.
    pub fn publish(&self, data: &NavData) {
        let inner = self.inner.lock().unwrap();
        for (_, callback) in &inner.subscribers {
            callback(data);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }
}
