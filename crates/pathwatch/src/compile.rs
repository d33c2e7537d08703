#![forbid(unsafe_code)]

//! Path compiler: member-access expression → validated [`CompiledPath`].
//!
//! The compiler walks the expression outward-in. Each member access is
//! pushed onto a stack until the walk reaches the root, which must be a
//! captured constant (closed-over form) or an owner parameter. Member names
//! are then resolved in source order against a [`TypeRegistry`], starting
//! from the root's type.
//!
//! # Failure Modes
//!
//! | Failure | Cause |
//! |---------|-------|
//! | `UnsupportedExpressionShape` | Call, indexer, computed node, or a conversion to a type other than the one reached |
//! | `EmptyPath` | Root alone, no member access |
//! | `UnknownProperty` | Name not registered on the type reached so far |
//! | `NotNavigable` | A plain-value property followed by further hops |
//! | `RootNotObservable` | Captured root cannot raise change notifications |

use std::any::TypeId;
use std::fmt;

use tracing::debug;

use crate::descriptor::PropertyDescriptor;
use crate::error::{PathError, Result};
use crate::expr::{Expr, Scope, parse};
use crate::notify::Handle;
use crate::observer::PathObserver;
use crate::path::PropertyPath;
use crate::registry::TypeRegistry;

/// How a compiled path is anchored.
#[derive(Clone)]
pub enum CompiledRoot {
    /// Fixed instance captured by the expression.
    Closed(Handle),
    /// Placeholder; owners are supplied when observing.
    Parameter {
        name: String,
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl CompiledRoot {
    fn kind(&self) -> &'static str {
        match self {
            Self::Closed(_) => "a captured value",
            Self::Parameter { .. } => "an owner parameter",
        }
    }
}

impl fmt::Debug for CompiledRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(root) => f.debug_tuple("Closed").field(&root.type_name()).finish(),
            Self::Parameter {
                name, type_name, ..
            } => f
                .debug_struct("Parameter")
                .field("name", name)
                .field("type", type_name)
                .finish(),
        }
    }
}

/// Output of the compiler: the descriptor chain and its root binding.
#[derive(Clone, Debug)]
pub struct CompiledPath {
    path: PropertyPath,
    root: CompiledRoot,
}

impl CompiledPath {
    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    #[must_use]
    pub fn root(&self) -> &CompiledRoot {
        &self.root
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.path.key()
    }

    #[must_use]
    pub fn into_path(self) -> PropertyPath {
        self.path
    }

    /// Observe a closed-over path.
    pub fn observe(self, callback: impl Fn() + 'static) -> Result<PathObserver> {
        match self.root {
            CompiledRoot::Closed(root) => PathObserver::new(root, self.path, callback),
            ref other => Err(PathError::RootKindMismatch {
                expected: "a captured value",
                found: other.kind(),
            }),
        }
    }

    /// Observe an owner-parameter path on each of `owners`.
    pub fn observe_owners(
        self,
        owners: impl IntoIterator<Item = Handle>,
        callback: impl Fn() + 'static,
    ) -> Result<PathObserver> {
        match self.root {
            CompiledRoot::Parameter { .. } => {
                PathObserver::with_owners(owners, self.path, callback)
            }
            ref other => Err(PathError::RootKindMismatch {
                expected: "an owner parameter",
                found: other.kind(),
            }),
        }
    }
}

/// Resolves expressions against a registry.
#[derive(Debug, Clone, Copy)]
pub struct PathCompiler<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> PathCompiler<'r> {
    #[must_use]
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Parse `text` in `scope`, then compile it.
    pub fn compile_str(&self, text: &str, scope: &Scope) -> Result<CompiledPath> {
        self.compile(&parse(text, scope)?)
    }

    pub fn compile(&self, expr: &Expr) -> Result<CompiledPath> {
        let mut members: Vec<&str> = Vec::new();
        // (members outside the conversion, conversion expression)
        let mut casts: Vec<(usize, &Expr)> = Vec::new();
        let mut cur = expr;
        let root = loop {
            match cur {
                Expr::Member { target, name } => {
                    members.push(name);
                    cur = &**target;
                }
                Expr::Constant { value, .. } => break CompiledRoot::Closed(value.clone()),
                Expr::Parameter {
                    name,
                    type_id,
                    type_name,
                } => {
                    break CompiledRoot::Parameter {
                        name: name.clone(),
                        type_id: *type_id,
                        type_name: *type_name,
                    };
                }
                Expr::Convert { target, .. } => {
                    casts.push((members.len(), cur));
                    cur = &**target;
                }
                Expr::Call { .. } | Expr::Index { .. } | Expr::Computed { .. } => {
                    return Err(PathError::UnsupportedExpressionShape {
                        found: cur.describe(),
                        expression: expr.to_string(),
                    });
                }
            }
        };
        members.reverse();

        if members.is_empty() {
            return Err(PathError::EmptyPath {
                expression: expr.to_string(),
            });
        }

        let (mut type_id, mut type_name) = match &root {
            CompiledRoot::Closed(value) => {
                if value.notifiable().is_none() {
                    return Err(PathError::RootNotObservable {
                        type_name: value.type_name(),
                    });
                }
                (value.as_any().type_id(), value.type_name())
            }
            CompiledRoot::Parameter {
                type_id, type_name, ..
            } => (*type_id, *type_name),
        };

        let unsupported = |cast: &Expr| PathError::UnsupportedExpressionShape {
            found: cast.describe(),
            expression: expr.to_string(),
        };
        // Number of hops from the root after which each conversion applies.
        let casts: Vec<(usize, &Expr)> = casts
            .into_iter()
            .map(|(outside, cast)| (members.len() - outside, cast))
            .collect();

        let mut descriptors = Vec::with_capacity(members.len());
        let last = members.len() - 1;
        for (i, name) in members.iter().enumerate() {
            for &(_, cast) in casts.iter().filter(|(hops, _)| *hops == i) {
                if !is_identity_conversion(cast, type_name) {
                    return Err(unsupported(cast));
                }
            }
            let descriptor = self.registry.lookup(type_id, name).ok_or_else(|| {
                PathError::UnknownProperty {
                    type_name: self.registry.type_name(type_id).unwrap_or(type_name),
                    property: (*name).to_owned(),
                }
            })?;
            if i < last {
                match (descriptor.target_type(), descriptor.target_type_name()) {
                    (Some(next_id), Some(next_name)) => {
                        type_id = next_id;
                        type_name = next_name;
                    }
                    _ => {
                        return Err(PathError::NotNavigable {
                            type_name: descriptor.declaring_type_name(),
                            property: descriptor.name(),
                        });
                    }
                }
            }
            descriptors.push(descriptor.clone());
        }

        // Plain terminal values have no model type to convert to.
        let terminal = descriptors.last().and_then(PropertyDescriptor::target_type_name);
        for &(_, cast) in casts.iter().filter(|(hops, _)| *hops == members.len()) {
            if !terminal.is_some_and(|reached| is_identity_conversion(cast, reached)) {
                return Err(unsupported(cast));
            }
        }

        let path = PropertyPath::from_valid(descriptors);
        debug!(path = %path, root = ?root, "compiled property path");
        Ok(CompiledPath { path, root })
    }
}

/// Whether `cast` converts to `reached`, the type the path is already at.
/// Conversion names may be written bare or fully qualified.
fn is_identity_conversion(cast: &Expr, reached: &str) -> bool {
    match cast {
        Expr::Convert { type_name, .. } => {
            type_name == reached || reached.rsplit("::").next() == Some(type_name.as_str())
        }
        _ => false,
    }
}
