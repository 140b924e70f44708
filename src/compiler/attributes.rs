//! Per-compile attribute occurrences.

use crate::schema::AttributeSpec;

/// Handle to one occurrence of an attribute in a query.
///
/// Two refs over the same schema attribute are different keys; only reusing
/// the same ref makes two mentions share a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeRef(usize);

impl AttributeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena of attribute occurrences allocated during one compile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeRefs {
    specs: Vec<AttributeSpec>,
}

impl AttributeRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh occurrence of `spec`.
    pub fn add(&mut self, spec: &AttributeSpec) -> AttributeRef {
        self.specs.push(spec.clone());
        AttributeRef(self.specs.len() - 1)
    }

    /// Spec behind `attr`.
    ///
    /// # Panics
    ///
    /// If `attr` was allocated by a different arena.
    pub fn spec(&self, attr: AttributeRef) -> &AttributeSpec {
        &self.specs[attr.0]
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeRef, &AttributeSpec)> {
        self.specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (AttributeRef(i), spec))
    }
}
