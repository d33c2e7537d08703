#![forbid(unsafe_code)]

//! Fan-out of one observed path to many value listeners.
//!
//! A [`PathSubject`] wraps a single [`PathObserver`] and forwards every
//! change to its listeners together with the current terminal value, read
//! null-tolerantly (`None` when any intermediate hop is null).
//!
//! # Invariants
//!
//! 1. A listener is registered at most once (identity is `Rc::ptr_eq`).
//! 2. Removing a listener sends it exactly one final notification when
//!    [`SubjectConfig::notify_on_remove`] is set.
//! 3. After [`PathSubject::dispose`] no listener is ever called again. With
//!    [`SubjectConfig::flush_on_dispose`] every listener registered at
//!    dispose time is called exactly once first.
//! 4. Listeners run with no borrow held; they may add or remove listeners.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::SubjectConfig;
use crate::error::{PathError, Result};
use crate::notify::{Handle, Model};
use crate::observer::PathObserver;
use crate::path::TypedPath;

/// Value listener of a [`PathSubject`].
pub type Listener<V> = Rc<dyn Fn(Option<V>)>;

type Listeners<V> = Rc<RefCell<Vec<Listener<V>>>>;

pub struct PathSubject<R: Model, V: Clone + 'static> {
    root: Rc<R>,
    path: TypedPath<R, V>,
    config: SubjectConfig,
    listeners: Listeners<V>,
    observer: RefCell<Option<PathObserver>>,
    disposed: Cell<bool>,
}

impl<R: Model, V: Clone + 'static> PathSubject<R, V> {
    pub fn new(root: Rc<R>, path: TypedPath<R, V>) -> Result<Self> {
        Self::with_config(root, path, SubjectConfig::default())
    }

    pub fn with_config(root: Rc<R>, path: TypedPath<R, V>, config: SubjectConfig) -> Result<Self> {
        let listeners: Listeners<V> = Rc::default();
        let callback = {
            let listeners = Rc::clone(&listeners);
            let weak_root: Weak<R> = Rc::downgrade(&root);
            let path = path.clone();
            move || {
                let Some(root) = weak_root.upgrade() else {
                    return;
                };
                let value = path.read(&root);
                fan_out(&listeners, &value);
            }
        };
        let handle: Handle = root.clone();
        let observer = PathObserver::new(handle, path.path().clone(), callback)?;
        Ok(Self {
            root,
            path,
            config,
            listeners,
            observer: RefCell::new(Some(observer)),
            disposed: Cell::new(false),
        })
    }

    /// Register `listener`. Returns `false` if it is already registered or
    /// the subject is disposed.
    pub fn add(&self, listener: &Listener<V>) -> bool {
        if self.disposed.get() {
            return false;
        }
        {
            let mut listeners = self.listeners.borrow_mut();
            if listeners.iter().any(|l| Rc::ptr_eq(l, listener)) {
                return false;
            }
            listeners.push(Rc::clone(listener));
        }
        if self.config.replay_on_add {
            listener(self.current());
        }
        true
    }

    /// Unregister `listener`. Returns `false` if it was not registered.
    pub fn remove(&self, listener: &Listener<V>) -> bool {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            match listeners.iter().position(|l| Rc::ptr_eq(l, listener)) {
                Some(pos) => {
                    listeners.remove(pos);
                    true
                }
                None => false,
            }
        };
        if removed && self.config.notify_on_remove {
            listener(self.current());
        }
        removed
    }

    /// Current terminal value, `None` if any hop is null.
    #[must_use]
    pub fn current(&self) -> Option<V> {
        self.path.read(&self.root)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.path.key()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Subscribe again after [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self) -> Result<()> {
        match self.observer.borrow().as_ref() {
            Some(observer) => observer.subscribe(),
            None => Err(PathError::Disposed),
        }
    }

    /// Stop forwarding changes without dropping listeners.
    pub fn unsubscribe(&self) {
        if let Some(observer) = self.observer.borrow().as_ref() {
            observer.unsubscribe();
        }
    }

    /// Tear down the path subscription, then flush and drop all listeners.
    /// Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(observer) = self.observer.borrow_mut().take() {
            observer.dispose();
        }
        let remaining = std::mem::take(&mut *self.listeners.borrow_mut());
        debug!(
            path = self.path.key(),
            listeners = remaining.len(),
            flush = self.config.flush_on_dispose,
            "subject disposed"
        );
        if self.config.flush_on_dispose {
            let value = self.current();
            for listener in &remaining {
                listener(value.clone());
            }
        }
    }
}

fn fan_out<V: Clone>(listeners: &Listeners<V>, value: &Option<V>) {
    let snapshot: Vec<Listener<V>> = listeners.borrow().clone();
    for listener in &snapshot {
        // Skip listeners removed by an earlier listener of this round.
        let still_registered = listeners.borrow().iter().any(|l| Rc::ptr_eq(l, listener));
        if still_registered {
            listener(value.clone());
        }
    }
}

impl<R: Model, V: Clone + 'static> fmt::Debug for PathSubject<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathSubject")
            .field("path", &self.path.key())
            .field("listeners", &self.listener_count())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Leaf, Node};

    fn recorder() -> (Listener<i32>, Rc<RefCell<Vec<Option<i32>>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let listener: Listener<i32> = Rc::new(move |v| l.borrow_mut().push(v));
        (listener, log)
    }

    fn subject(root: &Rc<Node>) -> PathSubject<Node, i32> {
        PathSubject::new(Rc::clone(root), Node::leaf_value_path()).unwrap()
    }

    #[test]
    fn change_reaches_every_listener_once() {
        let root = Node::with_leaf(1);
        let subject = subject(&root);
        let (a, log_a) = recorder();
        let (b, log_b) = recorder();
        assert!(subject.add(&a));
        assert!(subject.add(&b));

        root.leaf().unwrap().set_value(4);
        assert_eq!(*log_a.borrow(), vec![Some(4)]);
        assert_eq!(*log_b.borrow(), vec![Some(4)]);
    }

    #[test]
    fn duplicate_add_is_ignored() {
        let root = Node::with_leaf(1);
        let subject = subject(&root);
        let (a, log) = recorder();
        assert!(subject.add(&a));
        assert!(!subject.add(&a));
        assert_eq!(subject.listener_count(), 1);

        root.leaf().unwrap().set_value(2);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn remove_notifies_once_then_stops() {
        let root = Node::with_leaf(1);
        let subject = subject(&root);
        let (a, log) = recorder();
        subject.add(&a);
        assert!(subject.remove(&a));
        assert_eq!(*log.borrow(), vec![Some(1)]);
        assert!(!subject.remove(&a));

        root.leaf().unwrap().set_value(2);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn remove_without_final_notification() {
        let root = Node::with_leaf(1);
        let subject = PathSubject::with_config(
            Rc::clone(&root),
            Node::leaf_value_path(),
            SubjectConfig::default().with_notify_on_remove(false),
        )
        .unwrap();
        let (a, log) = recorder();
        subject.add(&a);
        subject.remove(&a);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn replay_on_add_sends_current_value() {
        let root = Node::new(None);
        let subject = PathSubject::with_config(
            Rc::clone(&root),
            Node::leaf_value_path(),
            SubjectConfig::default().with_replay_on_add(true),
        )
        .unwrap();
        let (a, log) = recorder();
        subject.add(&a);
        assert_eq!(*log.borrow(), vec![None]);
    }

    #[test]
    fn null_intermediate_reads_none() {
        let root = Node::with_leaf(1);
        let subject = subject(&root);
        let (a, log) = recorder();
        subject.add(&a);
        root.set_leaf(None);
        root.set_leaf(Some(Leaf::new(8)));
        assert_eq!(*log.borrow(), vec![None, Some(8)]);
        assert_eq!(subject.current(), Some(8));
    }

    #[test]
    fn dispose_flushes_once_and_unsubscribes() {
        let root = Node::with_leaf(3);
        let subject = subject(&root);
        let (a, log_a) = recorder();
        let (b, log_b) = recorder();
        subject.add(&a);
        subject.add(&b);

        subject.dispose();
        subject.dispose();
        assert_eq!(*log_a.borrow(), vec![Some(3)]);
        assert_eq!(*log_b.borrow(), vec![Some(3)]);
        assert_eq!(subject.listener_count(), 0);
        assert_eq!(root.listener_count(), 0);
        assert!(!subject.add(&a));
        assert_eq!(subject.subscribe(), Err(PathError::Disposed));

        root.leaf().unwrap().set_value(9);
        assert_eq!(log_a.borrow().len(), 1);
    }

    #[test]
    fn listener_removing_another_mid_round() {
        let root = Node::with_leaf(1);
        let subject = Rc::new(subject(&root));
        let (b, log_b) = recorder();
        let victim = Rc::clone(&b);
        let s = Rc::downgrade(&subject);
        let a: Listener<i32> = Rc::new(move |_| {
            if let Some(subject) = s.upgrade() {
                subject.remove(&victim);
            }
        });
        subject.add(&a);
        subject.add(&b);

        root.leaf().unwrap().set_value(2);
        // Only the removal notification reaches `b`.
        assert_eq!(*log_b.borrow(), vec![Some(2)]);
    }

    #[test]
    fn unsubscribe_pauses_forwarding() {
        let root = Node::with_leaf(1);
        let subject = subject(&root);
        let (a, log) = recorder();
        subject.add(&a);
        subject.unsubscribe();
        root.leaf().unwrap().set_value(2);
        assert!(log.borrow().is_empty());
        subject.subscribe().unwrap();
        root.leaf().unwrap().set_value(3);
        assert_eq!(*log.borrow(), vec![Some(3)]);
    }
}
