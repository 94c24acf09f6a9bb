//! Typed, synchronous publish/subscribe.
//!
//! Registering a handler returns a [`Subscription`]; dropping the handle
//! unregisters the handler, so a forgotten cleanup cannot leak listeners.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Handler<E> = Box<dyn FnMut(&E) + Send>;

struct Listeners<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
}

pub struct EventChannel<E> {
    listeners: Arc<Mutex<Listeners<E>>>,
}

impl<E> Clone for EventChannel<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    /// Register a handler. It stays registered while the returned handle lives.
    ///
    /// Handlers run while the listener list is locked and must not call back
    /// into the same channel.
    pub fn on<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&E) + Send + 'static,
        E: 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.handlers.push((id, Box::new(handler)));

        let weak: Weak<Mutex<Listeners<E>>> = Arc::downgrade(&self.listeners);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners.lock().handlers.retain(|(h, _)| *h != id);
                }
            })),
        }
    }

    /// Call every handler, in registration order.
    pub fn emit(&self, event: &E) {
        let mut listeners = self.listeners.lock();
        for (_, handler) in listeners.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn remove_all_listeners(&self) {
        self.listeners.lock().handlers.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().handlers.len()
    }
}

/// Handle to a registered handler.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Keep the handler registered for as long as the channel exists.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(channel: &EventChannel<u32>) -> (Subscription, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = channel.on(move |e: &u32| sink.lock().push(*e));
        (sub, seen)
    }

    #[test]
    fn emit_reaches_all_handlers_in_order() {
        let channel = EventChannel::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let a = Arc::clone(&order);
        let b = Arc::clone(&order);
        let _s1 = channel.on(move |e: &u32| a.lock().push(("first", *e)));
        let _s2 = channel.on(move |e: &u32| b.lock().push(("second", *e)));

        channel.emit(&7);

        assert_eq!(*order.lock(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let channel = EventChannel::new();
        let (sub, seen) = recorder(&channel);
        channel.emit(&1);
        drop(sub);
        channel.emit(&2);
        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn detached_subscription_keeps_handler() {
        let channel = EventChannel::new();
        let (sub, seen) = recorder(&channel);
        sub.detach();
        channel.emit(&3);
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn remove_all_listeners_silences_channel() {
        let channel = EventChannel::new();
        let (_sub, seen) = recorder(&channel);
        channel.remove_all_listeners();
        channel.emit(&4);
        assert!(seen.lock().is_empty());
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn dropping_one_subscription_keeps_others() {
        let channel = EventChannel::new();
        let (first, first_seen) = recorder(&channel);
        let (_second, second_seen) = recorder(&channel);
        drop(first);
        channel.emit(&5);
        assert!(first_seen.lock().is_empty());
        assert_eq!(*second_seen.lock(), vec![5]);
    }

    #[test]
    fn subscription_outliving_channel_is_harmless() {
        let channel = EventChannel::new();
        let (sub, _) = recorder(&channel);
        drop(channel);
        drop(sub);
    }
}
