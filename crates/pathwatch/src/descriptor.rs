#![forbid(unsafe_code)]

//! Property descriptors: the static metadata for one hop of a path.
//!
//! A descriptor names a property on a declaring model type. *Navigable*
//! descriptors also carry a reader that yields the (nullable) model stored in
//! the property, which becomes the source of the next hop. *Leaf* descriptors
//! name a terminal plain value; they are only ever used to filter change
//! events and can only appear at the end of a path.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::error::{PathError, Result};
use crate::notify::{Handle, Model, PropertyChanged, downcast};

type Reader = Rc<dyn Fn(&dyn Model) -> Option<Option<Handle>>>;

#[derive(Clone)]
struct Target {
    type_id: TypeId,
    type_name: &'static str,
    read: Reader,
}

/// Metadata for one property of a model type. Cheap to clone.
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: &'static str,
    declaring_id: TypeId,
    declaring_name: &'static str,
    target: Option<Target>,
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_name)
            .field("target_type", &self.target_type_name())
            .finish()
    }
}

impl PropertyDescriptor {
    /// A property of `S` holding a nullable reference to the model `T`.
    pub fn navigable<S, T>(name: &'static str, get: impl Fn(&S) -> Option<Rc<T>> + 'static) -> Self
    where
        S: Model,
        T: Model,
    {
        let read: Reader = Rc::new(move |source: &dyn Model| {
            let source = downcast::<S>(source)?;
            Some(get(source).map(|value| value as Handle))
        });
        Self {
            name,
            declaring_id: TypeId::of::<S>(),
            declaring_name: std::any::type_name::<S>(),
            target: Some(Target {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                read,
            }),
        }
    }

    /// A terminal property of `S` holding a plain value.
    #[must_use]
    pub fn leaf<S: Model>(name: &'static str) -> Self {
        Self {
            name,
            declaring_id: TypeId::of::<S>(),
            declaring_name: std::any::type_name::<S>(),
            target: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn declaring_type(&self) -> TypeId {
        self.declaring_id
    }

    #[must_use]
    pub fn declaring_type_name(&self) -> &'static str {
        self.declaring_name
    }

    #[must_use]
    pub fn is_navigable(&self) -> bool {
        self.target.is_some()
    }

    #[must_use]
    pub fn target_type(&self) -> Option<TypeId> {
        self.target.as_ref().map(|t| t.type_id)
    }

    #[must_use]
    pub fn target_type_name(&self) -> Option<&'static str> {
        self.target.as_ref().map(|t| t.type_name)
    }

    /// Whether a change event on the declaring object concerns this property.
    #[must_use]
    pub fn matches(&self, event: &PropertyChanged) -> bool {
        event.affects(self.name)
    }

    /// Read the model currently stored in this property of `source`.
    ///
    /// Returns `Ok(None)` for a null value.
    pub fn read(&self, source: &dyn Model) -> Result<Option<Handle>> {
        let target = self.target.as_ref().ok_or(PathError::NotNavigable {
            type_name: self.declaring_name,
            property: self.name,
        })?;
        (target.read)(source).ok_or(PathError::TypeMismatch {
            property: self.name,
            expected: self.declaring_name,
            found: source.type_name(),
        })
    }
}
