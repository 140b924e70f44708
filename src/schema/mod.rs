//! Aspect schema snapshot.
//!
//! A [`SchemaSnapshot`] maps aspect type ids to their attribute specs and
//! physical storage. It is immutable; a changed schema is a new snapshot
//! (see [`SchemaRegistry`]), and every compile looks attributes up afresh.
//!
//! ```text
//! Inline       M_VIDEO.TITLE
//! ManyToOne    M_VIDEO.STUDIO ──► V_VIDEO_STUDIO(VALUE_ID, VALUE)
//! OneToMany    V_VIDEO_GENRE(MEDIA_ITEM_ID, VALUE, VALUE_ORDER)
//! ManyToMany   NM_VIDEO_ACTORS(MEDIA_ITEM_ID, VALUE_ID, VALUE_ORDER)
//!                  └──► V_VIDEO_ACTORS(VALUE_ID, VALUE)
//! ```

mod definition;
mod naming;
mod registry;

pub use definition::{AspectDefinition, AttributeDefinition, SchemaDefinition};
pub use naming::{validate_identifier, StorageNaming};
pub use registry::SchemaRegistry;

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::model::{AttributePath, ValueType};

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while building a schema snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read schema file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse schema file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Aspect type '{0}' is defined more than once")]
    DuplicateAspect(AspectId),

    #[error("Attribute '{attribute}' is defined more than once on aspect type '{aspect}'")]
    DuplicateAttribute { aspect: AspectId, attribute: String },

    #[error("Invalid {kind} name '{name}': must be a plain SQL identifier")]
    InvalidIdentifier { kind: &'static str, name: String },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

// =============================================================================
// Identifiers and cardinality
// =============================================================================

/// Aspect type identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AspectId(String);

impl AspectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AspectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AspectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AspectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for AspectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// How an attribute's values are stored relative to its aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Own column in the aspect table.
    Inline,
    /// Nullable foreign key into a shared value table.
    ManyToOne,
    /// Child table of values.
    OneToMany,
    /// Junction table plus a shared value table.
    ManyToMany,
}

impl Cardinality {
    /// At most one value per item, so the attribute fits into the item row.
    pub fn is_bounded(self) -> bool {
        matches!(self, Cardinality::Inline | Cardinality::ManyToOne)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinality::Inline => "inline",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToMany => "many-to-many",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Attribute and aspect specs
// =============================================================================

/// Physical storage of one attribute, with every name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeStorage {
    Inline {
        column: String,
    },
    ManyToOne {
        foreign_key: String,
        value_table: String,
    },
    OneToMany {
        collection_table: String,
    },
    ManyToMany {
        junction_table: String,
        value_table: String,
    },
}

impl AttributeStorage {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            AttributeStorage::Inline { .. } => Cardinality::Inline,
            AttributeStorage::ManyToOne { .. } => Cardinality::ManyToOne,
            AttributeStorage::OneToMany { .. } => Cardinality::OneToMany,
            AttributeStorage::ManyToMany { .. } => Cardinality::ManyToMany,
        }
    }
}

/// One attribute of an aspect type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    aspect: AspectId,
    name: String,
    value_type: ValueType,
    storage: AttributeStorage,
}

impl AttributeSpec {
    pub fn aspect(&self) -> &AspectId {
        &self.aspect
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn cardinality(&self) -> Cardinality {
        self.storage.cardinality()
    }

    pub fn storage(&self) -> &AttributeStorage {
        &self.storage
    }

    pub fn path(&self) -> AttributePath {
        AttributePath::new(self.aspect.clone(), self.name.clone())
    }
}

/// An aspect type: a typed attribute bag stored in its own main table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspectType {
    id: AspectId,
    name: String,
    table: String,
    attributes: Vec<AttributeSpec>,
}

impl AspectType {
    pub fn id(&self) -> &AspectId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Main table, keyed by the item id column.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of every known aspect type.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    aspects: BTreeMap<AspectId, Arc<AspectType>>,
    naming: StorageNaming,
}

impl SchemaSnapshot {
    /// Resolve definitions against `naming` into a snapshot.
    pub fn from_definition(definition: SchemaDefinition, naming: StorageNaming) -> SchemaResult<Self> {
        naming.validate()?;
        let mut aspects = BTreeMap::new();
        for aspect_def in definition.aspects {
            let aspect = aspect_def.resolve(&naming)?;
            if aspects.contains_key(&aspect.id) {
                return Err(SchemaError::DuplicateAspect(aspect.id));
            }
            aspects.insert(aspect.id.clone(), Arc::new(aspect));
        }
        Ok(Self { aspects, naming })
    }

    pub fn from_toml_str(content: &str, naming: StorageNaming) -> SchemaResult<Self> {
        let definition: SchemaDefinition = toml::from_str(content)?;
        Self::from_definition(definition, naming)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, naming: StorageNaming) -> SchemaResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, naming)
    }

    pub fn naming(&self) -> &StorageNaming {
        &self.naming
    }

    pub fn aspect(&self, id: &str) -> Option<&Arc<AspectType>> {
        self.aspects.get(id)
    }

    /// Look up an aspect type that must exist.
    pub fn require_aspect(&self, id: &AspectId) -> QueryResult<&Arc<AspectType>> {
        self.aspects
            .get(id)
            .ok_or_else(|| QueryError::UnknownAspect(id.clone()))
    }

    /// Look up an attribute that must exist.
    pub fn attribute(&self, path: &AttributePath) -> QueryResult<&AttributeSpec> {
        let aspect = self.require_aspect(&path.aspect)?;
        aspect
            .attribute(&path.attribute)
            .ok_or_else(|| QueryError::UnknownAttribute {
                aspect: path.aspect.clone(),
                attribute: path.attribute.clone(),
            })
    }

    pub fn aspects(&self) -> impl Iterator<Item = &Arc<AspectType>> {
        self.aspects.values()
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }
}
