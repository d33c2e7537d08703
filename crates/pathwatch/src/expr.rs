#![forbid(unsafe_code)]

//! Member-access expressions and their textual parser.
//!
//! An [`Expr`] is the structural form of a path such as `owner.Complex.Value`.
//! Only member chains can be observed, but the AST also represents the shapes
//! that must be rejected (method calls, indexers, conversions, arbitrary
//! computed expressions) so that the compiler can report exactly what it
//! found.
//!
//! The root identifier is resolved through a [`Scope`]:
//!
//! - [`Scope::capture`] binds a name to a specific instance. The resulting
//!   [`Expr::Constant`] root makes a closed-over, single-owner path.
//! - [`Scope::parameter`] binds a name to a model type. The resulting
//!   [`Expr::Parameter`] root is a placeholder; owners are supplied when the
//!   observer is created.
//!
//! # Grammar
//!
//! ```text
//! expr    := ident postfix* ( "as" ident )? | <anything else>
//! postfix := "." ident | "(" balanced ")" | "[" balanced "]"
//! ```
//!
//! Text that does not start with an identifier, or that continues with
//! anything other than a postfix, parses as [`Expr::Computed`].

use std::any::TypeId;
use std::fmt;

use crate::error::{PathError, Result};
use crate::notify::{Handle, Model};

/// Structural form of a (possibly unsupported) path expression.
#[derive(Clone)]
pub enum Expr {
    /// A captured instance.
    Constant { name: String, value: Handle },
    /// A typed placeholder for an owner supplied later.
    Parameter {
        name: String,
        type_id: TypeId,
        type_name: &'static str,
    },
    Member { target: Box<Expr>, name: String },
    Call { target: Box<Expr>, args: String },
    Index { target: Box<Expr>, index: String },
    Convert { target: Box<Expr>, type_name: String },
    Computed { text: String },
}

impl Expr {
    /// Wrap `self` in a member access.
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Self::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Short description of the node kind, used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Constant { name, .. } => format!("captured value `{name}`"),
            Self::Parameter { name, .. } => format!("parameter `{name}`"),
            Self::Member { name, .. } => format!("member access `.{name}`"),
            Self::Call { target, .. } => match target.as_ref() {
                Self::Member { name, .. } => format!("method call `{name}(..)`"),
                _ => "call expression".to_owned(),
            },
            Self::Index { index, .. } => format!("indexer `[{index}]`"),
            Self::Convert { type_name, .. } => format!("conversion to `{type_name}`"),
            Self::Computed { text } => format!("computed expression `{text}`"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { name, .. } | Self::Parameter { name, .. } => f.write_str(name),
            Self::Member { target, name } => write!(f, "{target}.{name}"),
            Self::Call { target, args } => write!(f, "{target}({args})"),
            Self::Index { target, index } => write!(f, "{target}[{index}]"),
            Self::Convert { target, type_name } => write!(f, "{target} as {type_name}"),
            Self::Computed { text } => f.write_str(text),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { name, value } => f
                .debug_struct("Constant")
                .field("name", name)
                .field("type", &value.type_name())
                .finish(),
            Self::Parameter {
                name, type_name, ..
            } => f
                .debug_struct("Parameter")
                .field("name", name)
                .field("type", type_name)
                .finish(),
            Self::Member { target, name } => f
                .debug_struct("Member")
                .field("target", target)
                .field("name", name)
                .finish(),
            Self::Call { target, args } => f
                .debug_struct("Call")
                .field("target", target)
                .field("args", args)
                .finish(),
            Self::Index { target, index } => f
                .debug_struct("Index")
                .field("target", target)
                .field("index", index)
                .finish(),
            Self::Convert { target, type_name } => f
                .debug_struct("Convert")
                .field("target", target)
                .field("type_name", type_name)
                .finish(),
            Self::Computed { text } => f.debug_struct("Computed").field("text", text).finish(),
        }
    }
}

#[derive(Clone)]
enum Binding {
    Captured(Handle),
    Parameter {
        type_id: TypeId,
        type_name: &'static str,
    },
}

/// Names visible to the parser.
#[derive(Clone, Default)]
pub struct Scope {
    bindings: Vec<(String, Binding)>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|(name, _)| name))
            .finish()
    }
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a captured instance. Rebinding a name replaces it.
    #[must_use]
    pub fn capture(mut self, name: impl Into<String>, value: Handle) -> Self {
        self.bind(name.into(), Binding::Captured(value));
        self
    }

    /// Bind `name` to an owner parameter of model type `T`.
    #[must_use]
    pub fn parameter<T: Model>(mut self, name: impl Into<String>) -> Self {
        self.bind(
            name.into(),
            Binding::Parameter {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
        );
        self
    }

    fn bind(&mut self, name: String, binding: Binding) {
        self.bindings.retain(|(n, _)| *n != name);
        self.bindings.push((name, binding));
    }

    fn resolve(&self, name: &str) -> Result<Expr> {
        let (_, binding) = self
            .bindings
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| PathError::UnboundIdentifier {
                name: name.to_owned(),
            })?;
        Ok(match binding {
            Binding::Captured(value) => Expr::Constant {
                name: name.to_owned(),
                value: value.clone(),
            },
            Binding::Parameter { type_id, type_name } => Expr::Parameter {
                name: name.to_owned(),
                type_id: *type_id,
                type_name: *type_name,
            },
        })
    }
}

/// Parse `text` into an expression, resolving its root through `scope`.
pub fn parse(text: &str, scope: &Scope) -> Result<Expr> {
    let mut parser = Parser { src: text, pos: 0 };
    parser.skip_ws();
    if parser.at_end() {
        return Err(parser.error("empty path expression"));
    }

    let Some(root) = parser.ident() else {
        return Ok(Expr::Computed {
            text: text.trim().to_owned(),
        });
    };
    let mut expr = scope.resolve(root)?;

    loop {
        parser.skip_ws();
        let Some(c) = parser.peek() else {
            break;
        };
        match c {
            '.' => {
                parser.bump();
                parser.skip_ws();
                let name = parser
                    .ident()
                    .ok_or_else(|| parser.error("expected member name after '.'"))?;
                expr = expr.member(name);
            }
            '(' => {
                let args = parser.balanced('(', ')')?;
                expr = Expr::Call {
                    target: Box::new(expr),
                    args: args.trim().to_owned(),
                };
            }
            '[' => {
                let index = parser.balanced('[', ']')?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: index.trim().to_owned(),
                };
            }
            _ => {
                if parser.ident() == Some("as") {
                    parser.skip_ws();
                    if let Some(type_name) = parser.ident() {
                        expr = Expr::Convert {
                            target: Box::new(expr),
                            type_name: type_name.to_owned(),
                        };
                        continue;
                    }
                }
                return Ok(Expr::Computed {
                    text: text.trim().to_owned(),
                });
            }
        }
    }

    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += end;
        Some(&rest[..end])
    }

    /// Consume `open ... close` with nesting and return the inner text.
    fn balanced(&mut self, open: char, close: char) -> Result<&'a str> {
        let start = self.pos;
        self.bump();
        let inner_start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    let inner = &self.src[inner_start..self.pos];
                    self.bump();
                    return Ok(inner);
                }
            }
            self.bump();
        }
        Err(PathError::Syntax {
            offset: start,
            message: format!("unclosed '{open}'"),
        })
    }

    fn error(&self, message: &str) -> PathError {
        PathError::Syntax {
            offset: self.pos,
            message: message.to_owned(),
        }
    }
}
