#![forbid(unsafe_code)]

//! De-duplicating registry of observations sharing one callback.
//!
//! A command that depends on several paths registers each of them here; the
//! set makes sure observing the same path on the same owners twice does not
//! produce a second subscription (and therefore a second callback per
//! change). Optionally the set also listens on a [`RequeryBus`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::compile::{CompiledPath, CompiledRoot};
use crate::config::ObserverConfig;
use crate::error::{PathError, Result};
use crate::notify::Handle;
use crate::observer::{ObservationKey, PathObserver};
use crate::path::PropertyPath;
use crate::requery::{BusSubscription, RequeryBus};

pub struct ObservationSet {
    callback: Rc<dyn Fn()>,
    config: ObserverConfig,
    observers: HashMap<ObservationKey, PathObserver>,
    bus: Option<BusSubscription>,
}

impl ObservationSet {
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self::with_config(callback, ObserverConfig::default())
    }

    pub fn with_config(callback: impl Fn() + 'static, config: ObserverConfig) -> Self {
        Self {
            callback: Rc::new(callback),
            config,
            observers: HashMap::new(),
            bus: None,
        }
    }

    /// Observe `path` on `root`. Returns `Ok(false)` if already observed.
    pub fn observe(&mut self, root: Handle, path: PropertyPath) -> Result<bool> {
        self.observe_owners([root], path)
    }

    /// Observe `path` on every owner. Returns `Ok(false)` if already observed.
    pub fn observe_owners(
        &mut self,
        owners: impl IntoIterator<Item = Handle>,
        path: PropertyPath,
    ) -> Result<bool> {
        let owners: Vec<Handle> = owners.into_iter().collect();
        let key = ObservationKey::new(&path, &owners);
        if self.observers.contains_key(&key) {
            debug!(path = %path, roots = owners.len(), "observation already registered");
            return Ok(false);
        }
        let observer =
            PathObserver::from_shared(owners, path, Rc::clone(&self.callback), &self.config)?;
        self.observers.insert(key, observer);
        Ok(true)
    }

    /// Observe a closed-over compiled path.
    pub fn observe_compiled(&mut self, compiled: CompiledPath) -> Result<bool> {
        let root = match compiled.root() {
            CompiledRoot::Closed(root) => Rc::clone(root),
            CompiledRoot::Parameter { .. } => {
                return Err(PathError::RootKindMismatch {
                    expected: "a captured value",
                    found: "an owner parameter",
                });
            }
        };
        self.observe(root, compiled.into_path())
    }

    /// Adopt an externally built observer. An equal observer already in the
    /// set wins; `observer` is then dropped (and unsubscribed).
    pub fn insert(&mut self, observer: PathObserver) -> bool {
        if self.observers.contains_key(observer.key()) {
            debug!(path = observer.path_key(), "observation already registered");
            return false;
        }
        self.observers.insert(observer.key().clone(), observer);
        true
    }

    /// Dispose and forget the observation with `key`.
    pub fn remove(&mut self, key: &ObservationKey) -> bool {
        match self.observers.remove(key) {
            Some(observer) => {
                observer.dispose();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &ObservationKey) -> bool {
        self.observers.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObservationKey> {
        self.observers.keys()
    }

    /// Dispose every observation. A bus attachment is kept.
    pub fn clear(&mut self) {
        for (_, observer) in self.observers.drain() {
            observer.dispose();
        }
    }

    /// Subscribe every observation that is not yet subscribed.
    ///
    /// All or nothing: if one fails, those started by this call are
    /// unsubscribed again before the error is returned.
    pub fn subscribe(&self) -> Result<()> {
        let mut started: Vec<&PathObserver> = Vec::new();
        for observer in self.observers.values() {
            if observer.is_subscribed() {
                continue;
            }
            if let Err(err) = observer.subscribe() {
                for observer in started {
                    observer.unsubscribe();
                }
                debug!(path = observer.path_key(), "set subscribe rolled back");
                return Err(err);
            }
            started.push(observer);
        }
        Ok(())
    }

    /// Detach every observation; they stay registered and can be
    /// resubscribed.
    pub fn unsubscribe(&self) {
        for observer in self.observers.values() {
            observer.unsubscribe();
        }
    }

    /// Also invoke the callback on every requery broadcast of `bus`.
    /// Replaces a previous attachment.
    pub fn attach_bus(&mut self, bus: &RequeryBus) {
        let callback = Rc::clone(&self.callback);
        self.bus = Some(bus.subscribe(move || callback()));
    }

    pub fn detach_bus(&mut self) -> bool {
        self.bus.take().is_some()
    }

    #[must_use]
    pub fn is_bus_attached(&self) -> bool {
        self.bus.as_ref().is_some_and(BusSubscription::is_active)
    }
}

impl fmt::Debug for ObservationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationSet")
            .field("observations", &self.observers.len())
            .field("bus", &self.is_bus_attached())
            .finish()
    }
}
