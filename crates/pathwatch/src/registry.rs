#![forbid(unsafe_code)]

//! Per-type property tables used to resolve textual paths.

use std::any::TypeId;
use std::collections::HashMap;

use crate::descriptor::PropertyDescriptor;
use crate::error::{PathError, Result};

#[derive(Debug, Default)]
struct TypeEntry {
    type_name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

/// Descriptors grouped by declaring model type.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeId, TypeEntry>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor under its declaring type.
    pub fn register(&mut self, descriptor: PropertyDescriptor) -> Result<&mut Self> {
        let entry = self
            .types
            .entry(descriptor.declaring_type())
            .or_insert_with(|| TypeEntry {
                type_name: descriptor.declaring_type_name(),
                properties: Vec::new(),
            });
        if entry
            .properties
            .iter()
            .any(|p| p.name() == descriptor.name())
        {
            return Err(PathError::DuplicateProperty {
                type_name: descriptor.declaring_type_name(),
                property: descriptor.name(),
            });
        }
        entry.properties.push(descriptor);
        Ok(self)
    }

    /// Look up a property by declaring type and name.
    #[must_use]
    pub fn lookup(&self, type_id: TypeId, name: &str) -> Option<&PropertyDescriptor> {
        self.types
            .get(&type_id)?
            .properties
            .iter()
            .find(|p| p.name() == name)
    }

    /// Name of a registered type, if any property was registered for it.
    #[must_use]
    pub fn type_name(&self, type_id: TypeId) -> Option<&'static str> {
        self.types.get(&type_id).map(|e| e.type_name)
    }

    /// Registered properties of a type in registration order.
    pub fn properties(&self, type_id: TypeId) -> impl Iterator<Item = &PropertyDescriptor> {
        self.types
            .get(&type_id)
            .into_iter()
            .flat_map(|e| e.properties.iter())
    }

    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}
