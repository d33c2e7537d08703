#![forbid(unsafe_code)]

//! Small notifying fixtures for tests.
//!
//! Enabled for this crate's own tests and, through the `test-helpers`
//! feature, for downstream test crates.
//!
//! The fixture graph is two levels deep: a [`Node`] holding an optional
//! [`Leaf`], which holds an `i32`. Either type can be built *silent*, without
//! a notifier, to exercise the not-observable paths.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::descriptor::PropertyDescriptor;
use crate::notify::{ChangeNotifier, Model, Notifiable};
use crate::path::{PathBuilder, TypedPath};
use crate::registry::TypeRegistry;

/// Container with one nullable `Leaf` property.
#[derive(Debug, Default)]
pub struct Node {
    notifier: Option<ChangeNotifier>,
    leaf: RefCell<Option<Rc<Leaf>>>,
}

impl Node {
    pub const LEAF: &'static str = "Leaf";

    #[must_use]
    pub fn new(leaf: Option<Rc<Leaf>>) -> Rc<Self> {
        Rc::new(Self {
            notifier: Some(ChangeNotifier::new()),
            leaf: RefCell::new(leaf),
        })
    }

    #[must_use]
    pub fn with_leaf(value: i32) -> Rc<Self> {
        Self::new(Some(Leaf::new(value)))
    }

    /// Observable node whose leaf cannot be observed.
    #[must_use]
    pub fn with_silent_leaf() -> Rc<Self> {
        Self::new(Some(Leaf::silent(0)))
    }

    /// Node without a notifier.
    #[must_use]
    pub fn silent() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn leaf(&self) -> Option<Rc<Leaf>> {
        self.leaf.borrow().clone()
    }

    /// Replace the leaf and raise `Leaf`, even if the value is the same.
    pub fn set_leaf(&self, leaf: Option<Rc<Leaf>>) {
        match &self.notifier {
            Some(notifier) => {
                notifier.replace(&self.leaf, Self::LEAF, leaf);
            }
            None => {
                *self.leaf.borrow_mut() = leaf;
            }
        }
    }

    /// Raise `name` without changing anything.
    pub fn raise(&self, name: &'static str) {
        if let Some(notifier) = &self.notifier {
            notifier.raise(name);
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.notifier.as_ref().map_or(0, ChangeNotifier::listener_count)
    }

    /// `owner.Leaf.Value`
    #[must_use]
    pub fn leaf_value_path() -> TypedPath<Node, i32> {
        PathBuilder::<Node>::new()
            .then(Self::LEAF, Node::leaf_ref)
            .value(Leaf::VALUE, Leaf::value)
    }

    /// `owner.Leaf`
    #[must_use]
    pub fn leaf_path() -> TypedPath<Node, Rc<Leaf>> {
        PathBuilder::<Node>::new()
            .then(Self::LEAF, Node::leaf_ref)
            .finish()
            .expect("one hop")
    }

    fn leaf_ref(&self) -> Option<Rc<Leaf>> {
        self.leaf()
    }
}

impl Model for Node {
    fn notifiable(&self) -> Option<&dyn Notifiable> {
        self.notifier.as_ref().map(|n| n as &dyn Notifiable)
    }

    fn type_name(&self) -> &'static str {
        "Node"
    }
}

/// Terminal object holding an `i32` `Value`.
#[derive(Debug, Default)]
pub struct Leaf {
    notifier: Option<ChangeNotifier>,
    value: Cell<i32>,
}

impl Leaf {
    pub const VALUE: &'static str = "Value";

    #[must_use]
    pub fn new(value: i32) -> Rc<Self> {
        Rc::new(Self {
            notifier: Some(ChangeNotifier::new()),
            value: Cell::new(value),
        })
    }

    /// Leaf without a notifier.
    #[must_use]
    pub fn silent(value: i32) -> Rc<Self> {
        Rc::new(Self {
            notifier: None,
            value: Cell::new(value),
        })
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        self.value.get()
    }

    /// Set the value, raising `Value` only when it differs.
    pub fn set_value(&self, value: i32) {
        match &self.notifier {
            Some(notifier) => {
                notifier.assign_cell(&self.value, Self::VALUE, value);
            }
            None => self.value.set(value),
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.notifier.as_ref().map_or(0, ChangeNotifier::listener_count)
    }
}

impl Model for Leaf {
    fn notifiable(&self) -> Option<&dyn Notifiable> {
        self.notifier.as_ref().map(|n| n as &dyn Notifiable)
    }

    fn type_name(&self) -> &'static str {
        "Leaf"
    }
}

/// Registry with `Node.Leaf` and `Leaf.Value`.
#[must_use]
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for descriptor in [
        PropertyDescriptor::navigable::<Node, Leaf>(Node::LEAF, Node::leaf_ref),
        PropertyDescriptor::leaf::<Leaf>(Leaf::VALUE),
    ] {
        registry
            .register(descriptor)
            .expect("fixture properties are distinct");
    }
    registry
}

/// Shared call counter.
#[derive(Debug, Clone, Default)]
pub struct Counter(Rc<Cell<usize>>);

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that increments this counter.
    #[must_use]
    pub fn callback(&self) -> impl Fn() + 'static {
        let count = Rc::clone(&self.0);
        move || count.set(count.get() + 1)
    }

    #[must_use]
    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// Current count, then reset to zero.
    pub fn take(&self) -> usize {
        self.0.replace(0)
    }
}
