#![forbid(unsafe_code)]

//! Change notification: the capability every observed object exposes.
//!
//! # Design
//!
//! An object takes part in path observation by implementing [`Model`]. Whether
//! it can actually be *observed* is a runtime capability:
//! [`Model::notifiable`] returns the object's [`Notifiable`] listener registry,
//! or `None` for plain data objects. Most models embed a [`ChangeNotifier`]
//! and return it from `notifiable()`.
//!
//! Listeners receive a [`PropertyChanged`] event naming the property that
//! changed. An event with no name means "every property may have changed".
//!
//! # Re-entrancy
//!
//! [`ChangeNotifier::emit`] snapshots the listener list and releases its
//! borrow before calling out, so a listener may add or remove listeners (on
//! this or any other notifier) and raise further changes synchronously. A
//! listener removed while a dispatch is in flight is skipped for the rest of
//! that dispatch.
//!
//! # Failure Modes
//!
//! - **Listener panics**: the panic propagates to the caller of `emit()`;
//!   listeners after it in the snapshot are not called for that event.
//! - **Listener leak**: listeners are strong references. Removing them is the
//!   registrant's job (path observers do it on unsubscribe and on drop).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Payload of a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    property: Option<&'static str>,
}

impl PropertyChanged {
    /// A change of one named property.
    #[must_use]
    pub const fn property(name: &'static str) -> Self {
        Self {
            property: Some(name),
        }
    }

    /// A change that may affect every property of the sender.
    #[must_use]
    pub const fn all() -> Self {
        Self { property: None }
    }

    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        self.property
    }

    /// Whether a listener interested in `name` must react to this event.
    #[must_use]
    pub fn affects(&self, name: &str) -> bool {
        self.property.is_none_or(|p| p == name)
    }
}

/// Identifies one registered listener on a [`Notifiable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Callback invoked for every change raised by a notifier.
pub type ChangeListener = Rc<dyn Fn(&PropertyChanged)>;

/// Capability to register and unregister change listeners.
pub trait Notifiable {
    /// Register `listener` and return the id needed to remove it.
    fn add_listener(&self, listener: ChangeListener) -> ListenerId;

    /// Remove a listener. Returns `false` if `id` is not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// Type-erased access used to downcast a `dyn Model` to its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Model> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An object that can appear as a hop in a property path.
pub trait Model: AsAny + 'static {
    /// The object's listener registry, or `None` if it cannot be observed.
    fn notifiable(&self) -> Option<&dyn Notifiable>;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Shared, dynamically typed reference to a model.
pub type Handle = Rc<dyn Model>;

/// Downcast a model to its concrete type.
#[must_use]
pub fn downcast<T: Model>(model: &dyn Model) -> Option<&T> {
    model.as_any().downcast_ref::<T>()
}

/// Address-based identity of a handle, stable while the handle is alive.
#[must_use]
pub fn identity(handle: &Handle) -> usize {
    Rc::as_ptr(handle) as *const () as usize
}

struct Entry {
    id: ListenerId,
    live: Rc<Cell<bool>>,
    listener: ChangeListener,
}

#[derive(Default)]
struct NotifierInner {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Ordered listener registry implementing [`Notifiable`].
///
/// # Invariants
///
/// 1. Listeners are notified in registration order.
/// 2. Ids are never reused by the same notifier.
/// 3. A removed listener is never called again, even by a dispatch that
///    started before the removal.
#[derive(Default)]
pub struct ChangeNotifier {
    inner: RefCell<NotifierInner>,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Raise a change of `property`.
    pub fn raise(&self, property: &'static str) {
        self.emit(PropertyChanged::property(property));
    }

    /// Raise an "all properties changed" notification.
    pub fn raise_all(&self) {
        self.emit(PropertyChanged::all());
    }

    /// Deliver `event` to every listener registered at the time of the call.
    pub fn emit(&self, event: PropertyChanged) {
        // Snapshot so listeners can mutate the registry while we dispatch.
        let snapshot: Vec<(Rc<Cell<bool>>, ChangeListener)> = {
            let inner = self.inner.borrow();
            inner
                .entries
                .iter()
                .map(|e| (Rc::clone(&e.live), Rc::clone(&e.listener)))
                .collect()
        };

        for (live, listener) in &snapshot {
            if live.get() {
                listener(&event);
            }
        }
    }

    /// Store `value` in `slot` and raise `property` if it differs from the
    /// previous value. Returns whether a change was raised.
    pub fn assign<T: PartialEq>(&self, slot: &RefCell<T>, property: &'static str, value: T) -> bool {
        {
            let mut current = slot.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.raise(property);
        true
    }

    /// [`assign`](Self::assign) for `Copy` values held in a `Cell`.
    pub fn assign_cell<T: Copy + PartialEq>(
        &self,
        slot: &Cell<T>,
        property: &'static str,
        value: T,
    ) -> bool {
        if slot.get() == value {
            return false;
        }
        slot.set(value);
        self.raise(property);
        true
    }

    /// Store `value` in `slot` and always raise `property`. Returns the
    /// previous value.
    pub fn replace<T>(&self, slot: &RefCell<T>, property: &'static str, value: T) -> T {
        let old = slot.replace(value);
        self.raise(property);
        old
    }
}

impl Notifiable for ChangeNotifier {
    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push(Entry {
            id,
            live: Rc::new(Cell::new(true)),
            listener,
        });
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                let entry = inner.entries.remove(pos);
                entry.live.set(false);
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(count: &Rc<Cell<u32>>) -> ChangeListener {
        let count = Rc::clone(count);
        Rc::new(move |_| count.set(count.get() + 1))
    }

    #[test]
    fn event_filtering() {
        let named = PropertyChanged::property("Value");
        assert!(named.affects("Value"));
        assert!(!named.affects("Other"));
        assert_eq!(named.name(), Some("Value"));

        let all = PropertyChanged::all();
        assert!(all.affects("Value"));
        assert!(all.affects("Other"));
        assert_eq!(all.name(), None);
    }

    #[test]
    fn raise_reaches_listeners() {
        let notifier = ChangeNotifier::new();
        let count = Rc::new(Cell::new(0u32));
        let _id = notifier.add_listener(counting(&count));

        notifier.raise("Value");
        notifier.raise_all();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn remove_stops_delivery() {
        let notifier = ChangeNotifier::new();
        let count = Rc::new(Cell::new(0u32));
        let id = notifier.add_listener(counting(&count));

        notifier.raise("Value");
        assert!(notifier.remove_listener(id));
        notifier.raise("Value");
        assert_eq!(count.get(), 1);
        assert_eq!(notifier.listener_count(), 0);

        // Second removal is a no-op.
        assert!(!notifier.remove_listener(id));
    }

    #[test]
    fn ids_not_reused() {
        let notifier = ChangeNotifier::new();
        let a = notifier.add_listener(Rc::new(|_| {}));
        notifier.remove_listener(a);
        let b = notifier.add_listener(Rc::new(|_| {}));
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn notification_order_is_registration_order() {
        let notifier = ChangeNotifier::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ['A', 'B', 'C'] {
            let log = Rc::clone(&log);
            notifier.add_listener(Rc::new(move |_| log.borrow_mut().push(tag)));
        }
        notifier.raise("Value");
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let notifier = Rc::new(ChangeNotifier::new());
        let count = Rc::new(Cell::new(0u32));
        let victim: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let n = Rc::clone(&notifier);
        let v = Rc::clone(&victim);
        notifier.add_listener(Rc::new(move |_| {
            if let Some(id) = v.take() {
                n.remove_listener(id);
            }
        }));
        victim.set(Some(notifier.add_listener(counting(&count))));

        notifier.raise("Value");
        assert_eq!(count.get(), 0);
        assert_eq!(notifier.listener_count(), 1);
    }

    #[test]
    fn reentrant_raise_and_add() {
        let notifier = Rc::new(ChangeNotifier::new());
        let count = Rc::new(Cell::new(0u32));

        let n = Rc::clone(&notifier);
        let c = Rc::clone(&count);
        notifier.add_listener(Rc::new(move |event| {
            if event.name() == Some("Outer") {
                n.add_listener(counting(&c));
                n.raise("Inner");
            }
        }));

        notifier.raise("Outer");
        // The listener added during dispatch saw the nested "Inner" event only.
        assert_eq!(count.get(), 1);
        assert_eq!(notifier.listener_count(), 2);
    }

    #[test]
    fn assign_raises_only_on_change() {
        let notifier = ChangeNotifier::new();
        let count = Rc::new(Cell::new(0u32));
        notifier.add_listener(counting(&count));
        let slot = RefCell::new(1);

        assert!(!notifier.assign(&slot, "Value", 1));
        assert!(notifier.assign(&slot, "Value", 2));
        assert_eq!(*slot.borrow(), 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn replace_always_raises() {
        let notifier = ChangeNotifier::new();
        let count = Rc::new(Cell::new(0u32));
        notifier.add_listener(counting(&count));
        let slot = RefCell::new("a");

        assert_eq!(notifier.replace(&slot, "Value", "a"), "a");
        assert_eq!(notifier.replace(&slot, "Value", "b"), "a");
        assert_eq!(count.get(), 2);
    }

    struct Plain;

    impl Model for Plain {
        fn notifiable(&self) -> Option<&dyn Notifiable> {
            None
        }
    }

    #[test]
    fn downcast_and_identity() {
        let handle: Handle = Rc::new(Plain);
        assert!(downcast::<Plain>(handle.as_ref()).is_some());
        assert!(handle.type_name().ends_with("Plain"));

        let same = Rc::clone(&handle);
        let other: Handle = Rc::new(Plain);
        assert_eq!(identity(&handle), identity(&same));
        assert_ne!(identity(&handle), identity(&other));
    }

    #[test]
    fn debug_format() {
        let notifier = ChangeNotifier::new();
        notifier.add_listener(Rc::new(|_| {}));
        let dbg = format!("{notifier:?}");
        assert!(dbg.contains("ChangeNotifier"));
        assert!(dbg.contains("listener_count: 1"));
    }
}
