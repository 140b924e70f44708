//! Hydrated media items.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::value::Value;
use crate::schema::AspectId;

/// Value of one attribute inside a loaded aspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(Value),
    Collection(Vec<Value>),
}

/// One aspect instance attached to an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaItemAspect {
    pub aspect: AspectId,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl MediaItemAspect {
    pub fn new(aspect: AspectId) -> Self {
        Self {
            aspect,
            attributes: BTreeMap::new(),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.attributes.get(attribute)
    }

    /// Scalar value of a bounded attribute.
    pub fn value(&self, attribute: &str) -> Option<&Value> {
        match self.attributes.get(attribute)? {
            AttributeValue::Single(v) => Some(v),
            AttributeValue::Collection(_) => None,
        }
    }

    /// Values of a collection attribute; empty when not loaded.
    pub fn values(&self, attribute: &str) -> &[Value] {
        match self.attributes.get(attribute) {
            Some(AttributeValue::Collection(values)) => values,
            _ => &[],
        }
    }
}

/// A media item with the aspects that were requested and present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub aspects: BTreeMap<AspectId, MediaItemAspect>,
}

impl MediaItem {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            aspects: BTreeMap::new(),
        }
    }

    pub fn aspect(&self, aspect: &str) -> Option<&MediaItemAspect> {
        self.aspects.get(aspect)
    }

    pub fn has_aspect(&self, aspect: &str) -> bool {
        self.aspects.contains_key(aspect)
    }
}
