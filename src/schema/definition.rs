//! Serializable schema definitions.
//!
//! Definitions name aspects and attributes and may override any physical
//! name; everything left out is derived from [`StorageNaming`].
//!
//! ```toml
//! [[aspect]]
//! id = "video"
//! table = "M_VIDEO"
//!
//! [[aspect.attribute]]
//! name = "Title"
//! cardinality = "inline"
//! type = "string"
//!
//! [[aspect.attribute]]
//! name = "Genre"
//! cardinality = "one_to_many"
//! type = "string"
//! value_table = "GENRE_VALUES"
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::naming::{validate_identifier, StorageNaming};
use super::{AspectId, AspectType, AttributeSpec, AttributeStorage, Cardinality, SchemaError, SchemaResult};
use crate::model::ValueType;

/// A whole schema file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemaDefinition {
    #[serde(default, rename = "aspect")]
    pub aspects: Vec<AspectDefinition>,
}

impl SchemaDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builders have no effect until used"]
    pub fn aspect(mut self, aspect: AspectDefinition) -> Self {
        self.aspects.push(aspect);
        self
    }
}

/// Definition of one aspect type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[must_use = "builders have no effect until used"]
pub struct AspectDefinition {
    pub id: AspectId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default, rename = "attribute")]
    pub attributes: Vec<AttributeDefinition>,
}

impl AspectDefinition {
    pub fn new(id: impl Into<AspectId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            table: None,
            attributes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub(super) fn resolve(self, naming: &StorageNaming) -> SchemaResult<AspectType> {
        let table = self
            .table
            .unwrap_or_else(|| naming.aspect_table(self.id.as_str()));
        validate_identifier("aspect table", &table)?;

        let mut seen = HashSet::new();
        let mut attributes = Vec::with_capacity(self.attributes.len());
        for attr in self.attributes {
            if !seen.insert(attr.name.clone()) {
                return Err(SchemaError::DuplicateAttribute {
                    aspect: self.id,
                    attribute: attr.name,
                });
            }
            attributes.push(attr.resolve(&self.id, naming)?);
        }

        Ok(AspectType {
            name: self.name.unwrap_or_else(|| self.id.to_string()),
            id: self.id,
            table,
            attributes,
        })
    }
}

/// Definition of one attribute.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[must_use = "builders have no effect until used"]
pub struct AttributeDefinition {
    pub name: String,
    pub cardinality: Cardinality,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Inline column, or the foreign key column of a many-to-one attribute.
    #[serde(default)]
    pub column: Option<String>,
    /// Shared value table (many-to-one, many-to-many) or collection table
    /// (one-to-many).
    #[serde(default)]
    pub value_table: Option<String>,
    #[serde(default)]
    pub junction_table: Option<String>,
}

impl AttributeDefinition {
    pub fn new(name: &str, cardinality: Cardinality, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            cardinality,
            value_type,
            column: None,
            value_table: None,
            junction_table: None,
        }
    }

    pub fn inline(name: &str, value_type: ValueType) -> Self {
        Self::new(name, Cardinality::Inline, value_type)
    }

    pub fn many_to_one(name: &str, value_type: ValueType) -> Self {
        Self::new(name, Cardinality::ManyToOne, value_type)
    }

    pub fn one_to_many(name: &str, value_type: ValueType) -> Self {
        Self::new(name, Cardinality::OneToMany, value_type)
    }

    pub fn many_to_many(name: &str, value_type: ValueType) -> Self {
        Self::new(name, Cardinality::ManyToMany, value_type)
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value_table(mut self, table: &str) -> Self {
        self.value_table = Some(table.into());
        self
    }

    pub fn with_junction_table(mut self, table: &str) -> Self {
        self.junction_table = Some(table.into());
        self
    }

    fn resolve(self, aspect: &AspectId, naming: &StorageNaming) -> SchemaResult<AttributeSpec> {
        let column = || {
            self.column
                .clone()
                .unwrap_or_else(|| naming.attribute_column(&self.name))
        };
        let value_table = || {
            self.value_table
                .clone()
                .unwrap_or_else(|| naming.value_table(aspect.as_str(), &self.name))
        };

        let storage = match self.cardinality {
            Cardinality::Inline => AttributeStorage::Inline { column: column() },
            Cardinality::ManyToOne => AttributeStorage::ManyToOne {
                foreign_key: column(),
                value_table: value_table(),
            },
            Cardinality::OneToMany => AttributeStorage::OneToMany {
                collection_table: value_table(),
            },
            Cardinality::ManyToMany => AttributeStorage::ManyToMany {
                junction_table: self
                    .junction_table
                    .clone()
                    .unwrap_or_else(|| naming.junction_table(aspect.as_str(), &self.name)),
                value_table: value_table(),
            },
        };

        match &storage {
            AttributeStorage::Inline { column } => validate_identifier("column", column)?,
            AttributeStorage::ManyToOne {
                foreign_key,
                value_table,
            } => {
                validate_identifier("column", foreign_key)?;
                validate_identifier("value table", value_table)?;
            }
            AttributeStorage::OneToMany { collection_table } => {
                validate_identifier("collection table", collection_table)?
            }
            AttributeStorage::ManyToMany {
                junction_table,
                value_table,
            } => {
                validate_identifier("junction table", junction_table)?;
                validate_identifier("value table", value_table)?;
            }
        }

        Ok(AttributeSpec {
            aspect: aspect.clone(),
            name: self.name,
            value_type: self.value_type,
            storage,
        })
    }
}
