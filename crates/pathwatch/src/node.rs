#![forbid(unsafe_code)]

//! Live node chain mirroring the object graph reachable along a path.
//!
//! # Design
//!
//! One [`PathNode`] exists per hop. Node `i` listens on its current *source*
//! (the object holding property `i`) and, if it has a successor, reads its
//! property to find the successor's source. Nodes are built once and reused:
//! only their attachment changes.
//!
//! Ownership runs one way. The chain owns its successors; a node holds its
//! source weakly; the listener registered on the source holds the node
//! weakly. The object graph therefore never keeps a chain alive.
//!
//! # Invariants
//!
//! 1. A node is attached to at most one source. [`PathNode::subscribe_for`]
//!    always detaches the previous source (and the whole successor chain)
//!    before attaching.
//! 2. A successor is attached only while its predecessor is attached and its
//!    predecessor's property is non-null.
//! 3. No `RefCell` borrow is held while calling the user callback or any
//!    notifier, so handlers may re-enter the chain synchronously.
//! 4. Once the chain is deactivated, notifications neither invoke the
//!    callback nor re-attach successors.
//!
//! # Failure Modes
//!
//! - **Source cannot be observed**: `subscribe_for` returns
//!   `SourceNotObservable`. During a re-walk triggered by a notification the
//!   error has no caller to return to; it is logged at `warn` and the
//!   successor stays detached until a later change repopulates the hop.
//! - **Source dropped**: detaching becomes a no-op for that node.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::descriptor::PropertyDescriptor;
use crate::error::{PathError, Result};
use crate::notify::{Handle, ListenerId, Model, PropertyChanged};

/// State shared by every node of every chain of one observer.
pub(crate) struct ChainShared {
    key: Rc<str>,
    callback: Rc<dyn Fn()>,
    active: Cell<bool>,
}

impl ChainShared {
    pub(crate) fn new(key: Rc<str>, callback: Rc<dyn Fn()>) -> Rc<Self> {
        Rc::new(Self {
            key,
            callback,
            active: Cell::new(false),
        })
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.set(active);
    }
}

struct Attachment {
    source: Weak<dyn Model>,
    listener: ListenerId,
}

/// One hop of a live path.
pub(crate) struct PathNode {
    index: usize,
    descriptor: PropertyDescriptor,
    attached: RefCell<Option<Attachment>>,
    successor: Option<Rc<PathNode>>,
    shared: Rc<ChainShared>,
    this: Weak<PathNode>,
}

impl fmt::Debug for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathNode")
            .field("index", &self.index)
            .field("property", &self.descriptor.name())
            .field("attached", &self.is_attached())
            .field("successor", &self.successor)
            .finish()
    }
}

impl PathNode {
    /// Build the node chain for `descriptors` and return its head.
    pub(crate) fn chain(descriptors: &[PropertyDescriptor], shared: &Rc<ChainShared>) -> Rc<Self> {
        let mut next: Option<Rc<Self>> = None;
        for (index, descriptor) in descriptors.iter().enumerate().rev() {
            let successor = next.take();
            next = Some(Rc::new_cyclic(|this| Self {
                index,
                descriptor: descriptor.clone(),
                attached: RefCell::new(None),
                successor,
                shared: Rc::clone(shared),
                this: this.clone(),
            }));
        }
        next.expect("property paths have at least one hop")
    }

    /// Attach to `source`, then attach the successor chain to whatever this
    /// node's property currently holds.
    pub(crate) fn subscribe_for(&self, source: &Handle) -> Result<()> {
        self.unsubscribe_listener();

        let notifier = source
            .notifiable()
            .ok_or_else(|| PathError::SourceNotObservable {
                property: self.descriptor.name(),
                index: self.index,
                type_name: source.type_name(),
            })?;

        let node = self.this.clone();
        let listener = notifier.add_listener(Rc::new(move |event: &PropertyChanged| {
            if let Some(node) = node.upgrade() {
                node.on_changed(event);
            }
        }));
        *self.attached.borrow_mut() = Some(Attachment {
            source: Rc::downgrade(source),
            listener,
        });
        trace!(
            path = %self.shared.key,
            index = self.index,
            property = self.descriptor.name(),
            source = source.type_name(),
            "node attached"
        );

        self.subscribe_successor(source)
    }

    fn subscribe_successor(&self, source: &Handle) -> Result<()> {
        let Some(successor) = &self.successor else {
            return Ok(());
        };
        match self.descriptor.read(&**source)? {
            Some(value) => successor.subscribe_for(&value),
            None => {
                trace!(
                    path = %self.shared.key,
                    index = self.index,
                    property = self.descriptor.name(),
                    "hop is null, successor suspended"
                );
                Ok(())
            }
        }
    }

    /// Detach this node and every successor. No-op for detached nodes.
    pub(crate) fn unsubscribe_listener(&self) {
        let attachment = self.attached.borrow_mut().take();
        if let Some(attachment) = attachment {
            if let Some(source) = attachment.source.upgrade() {
                if let Some(notifier) = source.notifiable() {
                    notifier.remove_listener(attachment.listener);
                }
            }
            trace!(
                path = %self.shared.key,
                index = self.index,
                property = self.descriptor.name(),
                "node detached"
            );
        }
        if let Some(successor) = &self.successor {
            successor.unsubscribe_listener();
        }
    }

    fn on_changed(&self, event: &PropertyChanged) {
        if !self.descriptor.matches(event) || !self.shared.is_active() {
            return;
        }
        trace!(
            path = %self.shared.key,
            index = self.index,
            property = ?event.name(),
            "change accepted"
        );

        let callback = Rc::clone(&self.shared.callback);
        callback();

        // The callback may have disposed the observer.
        if !self.shared.is_active() {
            return;
        }
        self.resubscribe_successor();
    }

    /// Re-derive the successor chain after this node's property changed.
    fn resubscribe_successor(&self) {
        let Some(successor) = &self.successor else {
            return;
        };
        successor.unsubscribe_listener();
        let Some(source) = self.current_source() else {
            return;
        };
        if let Err(err) = self.subscribe_successor(&source) {
            successor.unsubscribe_listener();
            warn!(
                path = %self.shared.key,
                index = self.index,
                property = self.descriptor.name(),
                error = %err,
                "failed to re-attach path after change"
            );
        }
    }

    fn current_source(&self) -> Option<Handle> {
        self.attached
            .borrow()
            .as_ref()
            .and_then(|a| a.source.upgrade())
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.borrow().is_some()
    }

    /// Number of attached nodes from this one to the end of the chain.
    pub(crate) fn attached_count(&self) -> usize {
        let own = usize::from(self.is_attached());
        own + self
            .successor
            .as_ref()
            .map_or(0, |s| s.attached_count())
    }
}
