#![forbid(unsafe_code)]

//! Explicit requery broadcast.
//!
//! # Design
//!
//! A [`RequeryBus`] is created by the application and handed to whoever
//! needs to take part, instead of living in a process-wide static. Calling
//! [`RequeryBus::requery`] asks every subscriber to re-evaluate whatever
//! derived state it owns (typically a command's "can execute").
//!
//! Cloning a bus yields another handle to the same subscriber list.
//! Subscribers are stored weakly; the strong reference lives in the
//! [`BusSubscription`] guard, so dropping the guard detaches the subscriber.
//!
//! # Invariants
//!
//! 1. Subscribers are called in registration order.
//! 2. No borrow is held while a subscriber runs; a subscriber may subscribe,
//!    drop guards or requery again.
//! 3. After [`RequeryBus::shutdown`], `subscribe` returns an inert guard and
//!    `requery` notifies nobody.
//!
//! # Failure Modes
//!
//! - **Guard leak**: a guard stored forever keeps its subscriber alive.
//!   Dead entries are pruned lazily on `requery()`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

type SubscriberRc = Rc<dyn Fn()>;
type SubscriberWeak = Weak<dyn Fn()>;

#[derive(Default)]
struct BusInner {
    subscribers: Vec<SubscriberWeak>,
    shut_down: bool,
}

/// Shared requery broadcast with an explicit lifecycle.
#[derive(Clone, Default)]
pub struct RequeryBus {
    inner: Rc<RefCell<BusInner>>,
}

impl fmt::Debug for RequeryBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("RequeryBus")
            .field("subscribers", &inner.subscribers.len())
            .field("shut_down", &inner.shut_down)
            .finish()
    }
}

impl RequeryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` until the returned guard is dropped.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> BusSubscription {
        let strong: SubscriberRc = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        if inner.shut_down {
            return BusSubscription { callback: None };
        }
        inner.subscribers.push(Rc::downgrade(&strong));
        BusSubscription {
            callback: Some(strong),
        }
    }

    /// Notify every live subscriber. Returns how many were called.
    pub fn requery(&self) -> usize {
        let callbacks: Vec<SubscriberRc> = {
            let mut inner = self.inner.borrow_mut();
            if inner.shut_down {
                return 0;
            }
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in &callbacks {
            cb();
        }
        callbacks.len()
    }

    /// Drop every subscriber and ignore later subscriptions and requeries.
    pub fn shutdown(&self) {
        let mut inner = self.inner.borrow_mut();
        let dropped = inner.subscribers.len();
        inner.subscribers.clear();
        inner.shut_down = true;
        debug!(subscribers = dropped, "requery bus shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.borrow().shut_down
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// RAII guard for a bus subscriber.
pub struct BusSubscription {
    callback: Option<SubscriberRc>,
}

impl BusSubscription {
    /// Whether this guard holds a live subscriber (false after shutdown).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }
}

impl fmt::Debug for BusSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusSubscription").finish_non_exhaustive()
    }
}
