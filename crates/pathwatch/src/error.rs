#![forbid(unsafe_code)]

//! Error type shared by path compilation, observer construction and
//! subscription.
//!
//! Every failure is synchronous: it is returned from the call that caused it
//! and nothing is retried. A null intermediate value is never an error; it
//! only suspends the part of the chain below it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PathError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unsupported expression shape: {found} in `{expression}` (only member access chains can be observed)")]
    UnsupportedExpressionShape { found: String, expression: String },

    #[error("unbound identifier `{name}`")]
    UnboundIdentifier { name: String },

    #[error("path `{expression}` contains no member access")]
    EmptyPath { expression: String },

    #[error("type {type_name} has no registered property `{property}`")]
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },

    #[error("property `{type_name}.{property}` holds a plain value and cannot be navigated")]
    NotNavigable {
        type_name: &'static str,
        property: &'static str,
    },

    #[error("property `{type_name}.{property}` is already registered")]
    DuplicateProperty {
        type_name: &'static str,
        property: &'static str,
    },

    #[error("root of type {type_name} does not support change notification")]
    RootNotObservable { type_name: &'static str },

    #[error("value of `{property}` (hop {index}, type {type_name}) does not support change notification")]
    SourceNotObservable {
        property: &'static str,
        index: usize,
        type_name: &'static str,
    },

    #[error("`{property}` expects a source of type {expected}, found {found}")]
    TypeMismatch {
        property: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("an owner-parameter observer needs at least one owner")]
    NoOwners,

    #[error("path root is {found}, expected {expected}")]
    RootKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("observer has been disposed")]
    Disposed,
}

impl PathError {
    /// Whether this error was raised while walking the live object graph
    /// rather than while validating the path or its roots.
    #[must_use]
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::SourceNotObservable { .. } | Self::TypeMismatch { .. } | Self::Disposed
        )
    }
}
