#![forbid(unsafe_code)]

//! Property-path observation over graphs of change-notifying models.
//!
//! # Role
//! `pathwatch` watches a chain of properties such as `owner.Complex.Value`
//! and invokes a callback whenever the value at the end of the chain may
//! have changed, including when an intermediate object is replaced. The
//! listener chain follows the live object graph as it changes.
//!
//! # Primary responsibilities
//! - **notify**: the [`Notifiable`] capability and the standard
//!   [`ChangeNotifier`] that models embed.
//! - **Path description**: typed [`PathBuilder`] calls, or text compiled
//!   against a [`TypeRegistry`] by the [`PathCompiler`].
//! - **Observation**: [`PathObserver`] (closed-over or explicit owners),
//!   [`ObservationSet`] for de-duplication, [`PathSubject`] for fan-out.
//! - **Requery**: an explicit [`RequeryBus`] for "re-evaluate now"
//!   broadcasts.
//!
//! # Example
//! ```ignore
//! let path = PathBuilder::<Owner>::new()
//!     .then("Child", |o: &Owner| o.child())
//!     .value("Count", |c: &Child| c.count());
//! let observer = PathObserver::new(owner.clone(), path.into_path(), || refresh())?;
//! ```
//!
//! Everything is single-threaded (`Rc`/`RefCell`); dispatch is synchronous
//! and re-entrant.

pub mod compile;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod expr;
mod node;
pub mod notify;
pub mod observer;
pub mod path;
pub mod registry;
pub mod requery;
pub mod set;
pub mod subject;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use compile::{CompiledPath, CompiledRoot, PathCompiler};
pub use config::{ObserverConfig, SubjectConfig};
pub use descriptor::PropertyDescriptor;
pub use error::{PathError, Result};
pub use expr::{Expr, Scope, parse};
pub use notify::{
    AsAny, ChangeListener, ChangeNotifier, Handle, ListenerId, Model, Notifiable, PropertyChanged,
    downcast, identity,
};
pub use observer::{ObservationKey, PathObserver};
pub use path::{PathBuilder, PropertyPath, ROOT_TOKEN, TypedPath};
pub use registry::TypeRegistry;
pub use requery::{BusSubscription, RequeryBus};
pub use set::ObservationSet;
pub use subject::{Listener, PathSubject};
