#![forbid(unsafe_code)]

//! Path observers: one property path bound to one or more roots.
//!
//! # Design
//!
//! A [`PathObserver`] owns its roots (strongly), one node chain per
//! root, and the callback shared by all chains. Every accepted change on any
//! chain invokes the callback once.
//!
//! Roots come in two forms:
//!
//! - **closed-over**: [`PathObserver::new`] binds the path to a single
//!   captured instance;
//! - **explicit owners**: [`PathObserver::with_owners`] builds an independent
//!   chain per distinct owner, all reporting through the same callback.
//!
//! # Lifecycle
//!
//! ```text
//!   new ──auto_subscribe──▶ subscribed ◀──subscribe()── unsubscribed
//!                               │                           ▲
//!                               └──────unsubscribe()────────┘
//!   any state ──dispose()──▶ disposed (terminal; drop also unsubscribes)
//! ```
//!
//! # Invariants
//!
//! 1. Every root is validated before any listener is attached.
//! 2. `subscribe()` is all-or-nothing: a failure on any chain detaches
//!    every chain before the error is returned.
//! 3. Two observers are equal iff their [`ObservationKey`]s are equal.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tracing::debug;

use crate::config::ObserverConfig;
use crate::error::{PathError, Result};
use crate::node::{ChainShared, PathNode};
use crate::notify::{Handle, Model, identity};
use crate::path::PropertyPath;

/// Identity of an observation: canonical path key plus root identity set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationKey {
    path: String,
    roots: Vec<usize>,
}

impl ObservationKey {
    #[must_use]
    pub fn new(path: &PropertyPath, roots: &[Handle]) -> Self {
        let mut ids: Vec<usize> = roots.iter().map(identity).collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            path: path.key().to_owned(),
            roots: ids,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} root(s)", self.path, self.roots.len())
    }
}

/// Invokes a callback whenever the value at the end of a path may have
/// changed, on any of its roots.
pub struct PathObserver {
    path: PropertyPath,
    roots: Vec<Handle>,
    chains: Vec<Rc<PathNode>>,
    shared: Rc<ChainShared>,
    key: ObservationKey,
    subscribed: Cell<bool>,
    disposed: Cell<bool>,
}

impl PathObserver {
    /// Observe `path` on a single closed-over root and subscribe immediately.
    pub fn new(root: Handle, path: PropertyPath, callback: impl Fn() + 'static) -> Result<Self> {
        Self::with_config([root], path, callback, &ObserverConfig::default())
    }

    /// Observe `path` on each of `owners` and subscribe immediately.
    pub fn with_owners(
        owners: impl IntoIterator<Item = Handle>,
        path: PropertyPath,
        callback: impl Fn() + 'static,
    ) -> Result<Self> {
        Self::with_config(owners, path, callback, &ObserverConfig::default())
    }

    pub fn with_config(
        roots: impl IntoIterator<Item = Handle>,
        path: PropertyPath,
        callback: impl Fn() + 'static,
        config: &ObserverConfig,
    ) -> Result<Self> {
        Self::from_shared(roots, path, Rc::new(callback), config)
    }

    pub(crate) fn from_shared(
        owners: impl IntoIterator<Item = Handle>,
        path: PropertyPath,
        callback: Rc<dyn Fn()>,
        config: &ObserverConfig,
    ) -> Result<Self> {
        let mut roots: Vec<Handle> = Vec::new();
        for root in owners {
            if !roots.iter().any(|r| identity(r) == identity(&root)) {
                roots.push(root);
            }
        }
        if roots.is_empty() {
            return Err(PathError::NoOwners);
        }
        for root in &roots {
            validate_root(root, &path)?;
        }

        let shared = ChainShared::new(path.key().into(), callback);
        let chains = roots
            .iter()
            .map(|_| PathNode::chain(path.descriptors(), &shared))
            .collect();
        let key = ObservationKey::new(&path, &roots);
        let observer = Self {
            path,
            roots,
            chains,
            shared,
            key,
            subscribed: Cell::new(false),
            disposed: Cell::new(false),
        };
        if config.auto_subscribe {
            observer.subscribe()?;
        }
        Ok(observer)
    }

    /// Attach every chain. No-op while already subscribed.
    pub fn subscribe(&self) -> Result<()> {
        if self.disposed.get() {
            return Err(PathError::Disposed);
        }
        if self.subscribed.get() {
            return Ok(());
        }
        self.shared.set_active(true);
        for (chain, root) in self.chains.iter().zip(&self.roots) {
            if let Err(err) = chain.subscribe_for(root) {
                self.detach_all();
                debug!(path = %self.path, error = %err, "subscribe rolled back");
                return Err(err);
            }
        }
        self.subscribed.set(true);
        debug!(
            path = %self.path,
            roots = self.roots.len(),
            nodes = self.attached_nodes(),
            "observer subscribed"
        );
        Ok(())
    }

    /// Detach every chain. No-op while unsubscribed.
    pub fn unsubscribe(&self) {
        if !self.subscribed.get() {
            return;
        }
        self.detach_all();
        debug!(path = %self.path, roots = self.roots.len(), "observer unsubscribed");
    }

    /// Unsubscribe permanently. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.unsubscribe();
        debug!(path = %self.path, "observer disposed");
    }

    fn detach_all(&self) {
        self.shared.set_active(false);
        for chain in &self.chains {
            chain.unsubscribe_listener();
        }
        self.subscribed.set(false);
    }

    #[must_use]
    pub fn key(&self) -> &ObservationKey {
        &self.key
    }

    #[must_use]
    pub fn path_key(&self) -> &str {
        self.path.key()
    }

    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[must_use]
    pub fn roots(&self) -> &[Handle] {
        &self.roots
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.get()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Nodes currently holding a listener, across all chains.
    #[must_use]
    pub fn attached_nodes(&self) -> usize {
        self.chains.iter().map(|c| c.attached_count()).sum()
    }
}

fn validate_root(root: &Handle, path: &PropertyPath) -> Result<()> {
    let root: &dyn Model = &**root;
    if root.notifiable().is_none() {
        return Err(PathError::RootNotObservable {
            type_name: root.type_name(),
        });
    }
    if root.as_any().type_id() != path.root_type() {
        return Err(PathError::TypeMismatch {
            property: path.descriptors()[0].name(),
            expected: path.root_type_name(),
            found: root.type_name(),
        });
    }
    Ok(())
}

impl Drop for PathObserver {
    fn drop(&mut self) {
        self.detach_all();
    }
}

impl PartialEq for PathObserver {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PathObserver {}

impl Hash for PathObserver {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for PathObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathObserver")
            .field("path", &self.path.key())
            .field("roots", &self.roots.len())
            .field("subscribed", &self.subscribed.get())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
