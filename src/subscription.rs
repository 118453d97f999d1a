//! Callback registry with disposable subscription handles.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slots<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Independent subscribers to a stream of `T`.
///
/// Callbacks run on the publishing thread, outside the registry lock, so they
/// may subscribe or unsubscribe while being called.
pub struct Registry<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T: 'static> Registry<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Register `callback`; it stays registered until the handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut slots = self.slots.lock();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.callbacks.push((id, Arc::new(callback)));
            id
        };

        let slots: Weak<Mutex<Slots<T>>> = Arc::downgrade(&self.slots);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(slots) = slots.upgrade() {
                    slots.lock().callbacks.retain(|(existing, _)| *existing != id);
                }
            })),
        }
    }

    /// Deliver `item` to every subscriber, in subscription order.
    pub fn publish(&self, item: &T) {
        self.publish_while(item, || true);
    }

    /// Like [`Registry::publish`], but stops before the next callback once
    /// `proceed` returns false.
    pub fn publish_while<P>(&self, item: &T, proceed: P)
    where
        P: Fn() -> bool,
    {
        let callbacks: Vec<Callback<T>> = self
            .slots
            .lock()
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            if !proceed() {
                return;
            }
            callback(item);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`; dropping it deregisters the callback.
#[must_use = "dropping a Subscription immediately deregisters its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Deregister now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the callback registered for the registry's whole lifetime.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
