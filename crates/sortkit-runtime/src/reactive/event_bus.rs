#![forbid(unsafe_code)]

//! Event bus with RAII subscriptions.
//!
//! # Design
//!
//! [`EventBus<E>`] keeps its subscriber list in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Each subscriber is held weakly; the strong
//! reference lives in the [`Subscription`] guard returned to the caller, so
//! dropping the guard unsubscribes.
//!
//! # Failure Modes
//!
//! - **Re-entrant publish**: Publishing from within a subscriber callback is
//!   allowed. Callbacks are collected before any of them runs, so a callback
//!   registered during a publish only sees later events.
//! - **Subscriber leak**: Guards stored indefinitely keep their callbacks
//!   alive. Dead weak references are pruned lazily during `publish()`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, info_span};
use web_time::Instant;

type CallbackRc<E> = Rc<dyn Fn(&E)>;
type CallbackWeak<E> = Weak<dyn Fn(&E)>;

struct BusInner<E> {
    subscribers: Vec<CallbackWeak<E>>,
    published: u64,
}

/// A shared publish/subscribe channel.
///
/// Cloning an `EventBus` creates a new handle to the **same** subscriber
/// list.
///
/// # Invariants
///
/// 1. Subscribers are called in registration order.
/// 2. A dropped [`Subscription`] is never called again.
/// 3. `published` increments by exactly 1 per `publish()`.
pub struct EventBus<E> {
    inner: Rc<RefCell<BusInner<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                subscribers: Vec::new(),
                published: 0,
            })),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("subscriber_count", &inner.subscribers.len())
            .field("published", &inner.published)
            .finish()
    }
}

impl<E: 'static> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Dropping the returned guard unsubscribes it.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let strong: CallbackRc<E> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `event` to every live subscriber.
    pub fn publish(&self, event: &E) {
        let callbacks: Vec<CallbackRc<E>> = {
            let mut inner = self.inner.borrow_mut();
            inner.published += 1;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect()
        };

        if callbacks.is_empty() {
            return;
        }

        let subscribers = callbacks.len() as u64;
        let start = Instant::now();
        let _span = info_span!(
            "sortkit.event.publish",
            subscribers,
            duration_us = tracing::field::Empty
        )
        .entered();

        for callback in &callbacks {
            callback(event);
        }

        let duration_us = start.elapsed().as_micros() as u64;
        tracing::Span::current().record("duration_us", duration_us);
        debug!(message = "event delivered", subscribers, duration_us);
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Number of events published so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.inner.borrow().published
    }
}

/// RAII guard for a subscriber callback.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback `Rc` alive.
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&log);
        let _a = bus.subscribe(move |v| first.borrow_mut().push(("a", *v)));
        let second = Rc::clone(&log);
        let _b = bus.subscribe(move |v| second.borrow_mut().push(("b", *v)));

        bus.publish(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn dropped_subscription_is_not_called() {
        let bus = EventBus::<()>::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let sub = bus.subscribe(move |_| counter.set(counter.get() + 1));

        bus.publish(&());
        drop(sub);
        bus.publish(&());
        assert_eq!(calls.get(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn clones_share_subscribers() {
        let bus = EventBus::<i32>::new();
        let other = bus.clone();
        let seen = Rc::new(Cell::new(0));
        let sink = Rc::clone(&seen);
        let _sub = other.subscribe(move |v| sink.set(*v));
        bus.publish(&42);
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn publish_from_callback_is_allowed() {
        let bus = EventBus::<u8>::new();
        let inner_bus = bus.clone();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = bus.subscribe(move |v| {
            sink.borrow_mut().push(*v);
            if *v == 0 {
                inner_bus.publish(&1);
            }
        });
        bus.publish(&0);
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }
}
