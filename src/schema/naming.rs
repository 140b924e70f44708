//! Physical naming conventions for aspect storage.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{SchemaError, SchemaResult};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Check that `name` can be spliced into SQL text unquoted.
pub fn validate_identifier(kind: &'static str, name: &str) -> SchemaResult<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// Table and column naming shared by every aspect.
///
/// Collection and value tables all use the same column names; only the
/// table names vary per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageNaming {
    /// Table holding one row per media item.
    pub item_table: String,

    /// Item identity column, present in every aspect and collection table.
    pub item_id_column: String,

    /// Key of a shared value table, and the foreign key pointing at it.
    pub value_id_column: String,

    /// Value column of value and collection tables.
    pub value_column: String,

    /// Position column of collection and junction tables.
    pub value_order_column: Option<String>,

    pub aspect_table_prefix: String,
    pub value_table_prefix: String,
    pub junction_table_prefix: String,
}

impl Default for StorageNaming {
    fn default() -> Self {
        Self {
            item_table: "MEDIA_ITEMS".to_string(),
            item_id_column: "MEDIA_ITEM_ID".to_string(),
            value_id_column: "VALUE_ID".to_string(),
            value_column: "VALUE".to_string(),
            value_order_column: Some("VALUE_ORDER".to_string()),
            aspect_table_prefix: "M_".to_string(),
            value_table_prefix: "V_".to_string(),
            junction_table_prefix: "NM_".to_string(),
        }
    }
}

impl StorageNaming {
    pub fn aspect_table(&self, aspect: &str) -> String {
        format!("{}{}", self.aspect_table_prefix, physical_part(aspect))
    }

    pub fn attribute_column(&self, attribute: &str) -> String {
        physical_part(attribute)
    }

    pub fn value_table(&self, aspect: &str, attribute: &str) -> String {
        format!(
            "{}{}_{}",
            self.value_table_prefix,
            physical_part(aspect),
            physical_part(attribute)
        )
    }

    pub fn junction_table(&self, aspect: &str, attribute: &str) -> String {
        format!(
            "{}{}_{}",
            self.junction_table_prefix,
            physical_part(aspect),
            physical_part(attribute)
        )
    }

    /// Reject naming that could not be used unquoted.
    pub fn validate(&self) -> SchemaResult<()> {
        validate_identifier("item table", &self.item_table)?;
        validate_identifier("item id column", &self.item_id_column)?;
        validate_identifier("value id column", &self.value_id_column)?;
        validate_identifier("value column", &self.value_column)?;
        if let Some(order) = &self.value_order_column {
            validate_identifier("value order column", order)?;
        }
        Ok(())
    }
}

/// Upper-case `name`, mapping anything that is not alphanumeric to `_`.
fn physical_part(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
