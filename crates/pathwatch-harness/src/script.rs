#![forbid(unsafe_code)]

//! Mutation scripts over the reference graph, with an oracle that predicts
//! how an observer of `owner.Complex.Value.IntProperty.Value` must react.
//!
//! The oracle tracks only which levels are currently reachable and the
//! terminal value. Every replacement of a reachable hop fires the callback
//! once; a terminal assignment fires only if the value differs; anything
//! done to an object that is no longer reachable fires nothing.

use std::rc::Rc;

use serde_json::{Value as JsonValue, json};

use crate::fixture::{Complex, Holder, IntProperty, Owner};

/// One step applied to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Replace `Owner.Complex` with a fresh populated subtree, or null.
    ReplaceComplex(Option<i32>),
    /// Replace `Complex.Value` on the current `Complex`, if any.
    ReplaceValue(Option<i32>),
    /// Replace `Value.IntProperty` on the current holder, if any.
    ReplaceIntProperty(Option<i32>),
    /// Assign the terminal value, if reachable.
    SetLeaf(i32),
    /// Assign the terminal value of the most recently orphaned `IntProperty`.
    TouchOrphan(i32),
    /// Change an unrelated root property.
    SetTitle(u8),
}

impl Mutation {
    fn to_json(self) -> JsonValue {
        match self {
            Self::ReplaceComplex(v) => json!({ "op": "replace_complex", "value": v }),
            Self::ReplaceValue(v) => json!({ "op": "replace_value", "value": v }),
            Self::ReplaceIntProperty(v) => json!({ "op": "replace_int_property", "value": v }),
            Self::SetLeaf(v) => json!({ "op": "set_leaf", "value": v }),
            Self::TouchOrphan(v) => json!({ "op": "touch_orphan", "value": v }),
            Self::SetTitle(v) => json!({ "op": "set_title", "value": v }),
        }
    }
}

/// Oracle state: how deep the live chain reaches, and its terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Oracle {
    /// Reachable levels below the owner: 0 (Complex null) to 3 (IntProperty set).
    depth: u8,
    leaf: Option<i32>,
    title: u8,
}

impl Oracle {
    #[must_use]
    pub fn populated(value: i32) -> Self {
        Self {
            depth: 3,
            leaf: Some(value),
            title: 0,
        }
    }

    /// Apply `mutation` and return the predicted number of callbacks.
    pub fn step(&mut self, mutation: Mutation) -> usize {
        match mutation {
            Mutation::ReplaceComplex(v) => {
                self.replace_at(0, v);
                1
            }
            Mutation::ReplaceValue(v) if self.depth >= 1 => {
                self.replace_at(1, v);
                1
            }
            Mutation::ReplaceIntProperty(v) if self.depth >= 2 => {
                self.replace_at(2, v);
                1
            }
            Mutation::SetLeaf(v) if self.depth == 3 => {
                let fired = self.leaf != Some(v);
                self.leaf = Some(v);
                usize::from(fired)
            }
            Mutation::SetTitle(v) => {
                self.title = v;
                0
            }
            _ => 0,
        }
    }

    fn replace_at(&mut self, level: u8, value: Option<i32>) {
        match value {
            Some(v) => {
                self.depth = 3;
                self.leaf = Some(v);
            }
            None => {
                self.depth = level;
                self.leaf = None;
            }
        }
    }

    /// Nodes that must hold a listener: the root node plus one per
    /// reachable level.
    #[must_use]
    pub fn attached_nodes(&self) -> usize {
        1 + usize::from(self.depth)
    }

    #[must_use]
    pub fn leaf(&self) -> Option<i32> {
        self.leaf
    }
}

/// A live graph plus the objects that fell out of it.
#[derive(Debug)]
pub struct Graph {
    owner: Rc<Owner>,
    orphans: Vec<Rc<IntProperty>>,
}

impl Graph {
    #[must_use]
    pub fn populated(value: i32) -> Self {
        Self {
            owner: Owner::populated(value),
            orphans: Vec::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &Rc<Owner> {
        &self.owner
    }

    #[must_use]
    pub fn orphan_count(&self) -> usize {
        self.orphans.len()
    }

    fn orphan_current(&mut self) {
        if let Some(property) = self.owner.int_property() {
            self.orphans.push(property);
        }
    }

    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::ReplaceComplex(v) => {
                self.orphan_current();
                self.owner.set_complex(v.map(Complex::populated));
            }
            Mutation::ReplaceValue(v) => {
                if let Some(complex) = self.owner.complex() {
                    self.orphan_current();
                    complex.set_value(v.map(Holder::populated));
                }
            }
            Mutation::ReplaceIntProperty(v) => {
                if let Some(holder) = self.owner.complex().and_then(|c| c.value()) {
                    self.orphan_current();
                    holder.set_int_property(v.map(IntProperty::new));
                }
            }
            Mutation::SetLeaf(v) => {
                if let Some(property) = self.owner.int_property() {
                    property.set_value(v);
                }
            }
            Mutation::TouchOrphan(v) => {
                if let Some(orphan) = self.orphans.last() {
                    orphan.set_value(v);
                }
            }
            Mutation::SetTitle(v) => self.owner.set_title(v.to_string()),
        }
    }
}

/// An ordered list of mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Mutation>,
}

impl Script {
    #[must_use]
    pub fn new(steps: Vec<Mutation>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[Mutation] {
        &self.steps
    }

    /// Predicted callback count after each step.
    #[must_use]
    pub fn expected_counts(&self, initial: i32) -> Vec<usize> {
        let mut oracle = Oracle::populated(initial);
        let mut total = 0;
        self.steps
            .iter()
            .map(|&m| {
                total += oracle.step(m);
                total
            })
            .collect()
    }

    /// One JSON object per line, for reproducing a failing script.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        self.steps
            .iter()
            .map(|m| m.to_json().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
