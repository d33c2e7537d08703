#![forbid(unsafe_code)]

//! Compiled property paths.
//!
//! A [`PropertyPath`] is the immutable, ordered descriptor chain of a path
//! plus its canonical key. It is produced either by the textual compiler
//! ([`crate::compile`]) or by the typed [`PathBuilder`]:
//!
//! ```ignore
//! let path = PathBuilder::<Owner>::new()
//!     .then("Complex", |o: &Owner| o.complex())
//!     .then("Value", |c: &Complex| c.value())
//!     .value("Count", |v: &Inner| v.count());
//! assert_eq!(path.key(), "owner.Complex.Value.Count");
//! ```
//!
//! # Canonical key
//!
//! The key renders the member chain relative to the fixed [`ROOT_TOKEN`],
//! so it does not depend on how the root was named in the source text or on
//! which instance the path is later bound to. Two paths with equal keys
//! observe the same members.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::descriptor::PropertyDescriptor;
use crate::error::{PathError, Result};
use crate::notify::Model;

/// Root token used in canonical keys.
pub const ROOT_TOKEN: &str = "owner";

/// Ordered, validated descriptor chain of a path.
#[derive(Clone)]
pub struct PropertyPath {
    descriptors: Rc<[PropertyDescriptor]>,
    key: Rc<str>,
}

impl PropertyPath {
    /// Validate and wrap a descriptor chain.
    ///
    /// Every hop but the last must be navigable, and its target type must
    /// be the declaring type of the next hop.
    pub fn new(descriptors: Vec<PropertyDescriptor>) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(PathError::EmptyPath {
                expression: ROOT_TOKEN.to_owned(),
            });
        }
        for pair in descriptors.windows(2) {
            let (hop, next) = (&pair[0], &pair[1]);
            match hop.target_type() {
                None => {
                    return Err(PathError::NotNavigable {
                        type_name: hop.declaring_type_name(),
                        property: hop.name(),
                    });
                }
                Some(target) if target != next.declaring_type() => {
                    return Err(PathError::TypeMismatch {
                        property: next.name(),
                        expected: next.declaring_type_name(),
                        found: hop.target_type_name().unwrap_or("<unknown>"),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self::from_valid(descriptors))
    }

    pub(crate) fn from_valid(descriptors: Vec<PropertyDescriptor>) -> Self {
        let key = canonical_key(descriptors.iter().map(PropertyDescriptor::name));
        Self {
            descriptors: descriptors.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    /// Number of hops (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Type every root of this path must have.
    #[must_use]
    pub fn root_type(&self) -> TypeId {
        self.descriptors[0].declaring_type()
    }

    #[must_use]
    pub fn root_type_name(&self) -> &'static str {
        self.descriptors[0].declaring_type_name()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyPath")
            .field("key", &self.key)
            .field("root_type", &self.root_type_name())
            .finish()
    }
}

pub(crate) fn canonical_key<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut key = String::from(ROOT_TOKEN);
    for name in names {
        key.push('.');
        key.push_str(name);
    }
    key
}

type Read<R, V> = Rc<dyn Fn(&Rc<R>) -> Option<V>>;

/// Typed construction of a path rooted at `R`, currently positioned at `T`.
pub struct PathBuilder<R, T = R> {
    descriptors: Vec<PropertyDescriptor>,
    read: Read<R, Rc<T>>,
}

impl<R: Model> PathBuilder<R, R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            read: Rc::new(|root: &Rc<R>| Some(Rc::clone(root))),
        }
    }
}

impl<R: Model> Default for PathBuilder<R, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Model, T: Model> PathBuilder<R, T> {
    /// Append a navigable hop to a nullable model `U`.
    #[must_use]
    pub fn then<U: Model>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> Option<Rc<U>> + 'static,
    ) -> PathBuilder<R, U> {
        let get = Rc::new(get);
        let for_descriptor = Rc::clone(&get);
        self.descriptors
            .push(PropertyDescriptor::navigable::<T, U>(name, move |t: &T| {
                for_descriptor(t)
            }));
        let prev = self.read;
        PathBuilder {
            descriptors: self.descriptors,
            read: Rc::new(move |root: &Rc<R>| prev(root).and_then(|t| get(&*t))),
        }
    }

    /// Finish with a terminal plain-value property.
    #[must_use]
    pub fn value<V: 'static>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + 'static,
    ) -> TypedPath<R, V> {
        self.descriptors.push(PropertyDescriptor::leaf::<T>(name));
        let prev = self.read;
        TypedPath {
            path: PropertyPath::from_valid(self.descriptors),
            read: Rc::new(move |root: &Rc<R>| prev(root).map(|t| get(&*t))),
        }
    }

    /// Finish on the model reached by the last hop.
    pub fn finish(self) -> Result<TypedPath<R, Rc<T>>> {
        if self.descriptors.is_empty() {
            return Err(PathError::EmptyPath {
                expression: ROOT_TOKEN.to_owned(),
            });
        }
        Ok(TypedPath {
            path: PropertyPath::from_valid(self.descriptors),
            read: self.read,
        })
    }
}

/// A [`PropertyPath`] together with a typed, null-tolerant reader of its
/// terminal value.
pub struct TypedPath<R, V> {
    path: PropertyPath,
    read: Read<R, V>,
}

impl<R, V> Clone for TypedPath<R, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            read: Rc::clone(&self.read),
        }
    }
}

impl<R, V> fmt::Debug for TypedPath<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPath")
            .field("key", &self.path.key())
            .finish_non_exhaustive()
    }
}

impl<R, V> TypedPath<R, V> {
    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.path.key()
    }

    /// Current terminal value, or `None` if any intermediate hop is null.
    #[must_use]
    pub fn read(&self, root: &Rc<R>) -> Option<V> {
        (self.read)(root)
    }

    #[must_use]
    pub fn into_path(self) -> PropertyPath {
        self.path
    }
}
