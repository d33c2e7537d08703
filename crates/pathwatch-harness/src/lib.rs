#![forbid(unsafe_code)]

//! Reference fixtures and a mutation oracle for testing `pathwatch`.
//!
//! - [`fixture`]: the `Owner.Complex.Value.IntProperty.Value` graph, typed
//!   paths over it and a registry for textual paths.
//! - [`script`]: [`Mutation`] scripts, the [`Oracle`] predicting callback
//!   counts and the live [`Graph`] they are applied to.

pub mod fixture;
pub mod script;

pub use fixture::{Complex, Holder, IntProperty, Owner, deep_path, holder_path, registry};
pub use pathwatch::testing::Counter;
pub use script::{Graph, Mutation, Oracle, Script};
