//! Joins for bounded attributes.

use std::collections::HashMap;

use super::alias::AliasNamespace;
use super::attributes::{AttributeRef, AttributeRefs};
use super::tables::{ColumnRef, LogicalTable, StatementTables, TableId};
use crate::error::{QueryError, QueryResult};
use crate::schema::{AspectId, AttributeStorage, SchemaSnapshot};
use crate::sql::JoinType;

/// Makes sure the tables behind an inline or many-to-one attribute are
/// joined exactly once and hands out the column holding its value.
pub struct AttributeJoinPlanner<'a> {
    schema: &'a SchemaSnapshot,
    refs: &'a AttributeRefs,
}

impl<'a> AttributeJoinPlanner<'a> {
    pub fn new(schema: &'a SchemaSnapshot, refs: &'a AttributeRefs) -> Self {
        Self { schema, refs }
    }

    /// Join an aspect's main table on the item id, unless already present.
    pub fn join_aspect(
        &self,
        aspect: &AspectId,
        aliases: &mut AliasNamespace,
        tables: &mut StatementTables,
        join_type: JoinType,
        anchor: &ColumnRef,
    ) -> QueryResult<TableId> {
        let aspect_type = self.schema.require_aspect(aspect)?;
        Ok(tables.ensure_joined(
            aliases,
            LogicalTable::AspectMain(aspect.clone()),
            aspect_type.table(),
            join_type,
            &self.schema.naming().item_id_column,
            anchor.clone(),
        ))
    }

    /// Column of `attr`, joining what is needed to reach it.
    ///
    /// The aspect table uses `join_type`; a many-to-one value table is
    /// always left outer joined so a NULL foreign key keeps its row.
    pub fn resolve(
        &self,
        attr: AttributeRef,
        aliases: &mut AliasNamespace,
        tables: &mut StatementTables,
        resolved: &mut HashMap<AttributeRef, ColumnRef>,
        join_type: JoinType,
        anchor: &ColumnRef,
    ) -> QueryResult<ColumnRef> {
        if let Some(column) = resolved.get(&attr) {
            return Ok(column.clone());
        }

        let spec = self.refs.spec(attr);
        let naming = self.schema.naming();
        let column = match spec.storage() {
            AttributeStorage::Inline { column } => {
                let main = self.join_aspect(spec.aspect(), aliases, tables, join_type, anchor)?;
                ColumnRef::new(main, column)
            }
            AttributeStorage::ManyToOne {
                foreign_key,
                value_table,
            } => {
                let main = self.join_aspect(spec.aspect(), aliases, tables, join_type, anchor)?;
                let values = tables.ensure_joined(
                    aliases,
                    LogicalTable::ValueTable(spec.path()),
                    value_table,
                    JoinType::LeftOuter,
                    &naming.value_id_column,
                    ColumnRef::new(main, foreign_key),
                );
                ColumnRef::new(values, &naming.value_column)
            }
            AttributeStorage::OneToMany { .. } | AttributeStorage::ManyToMany { .. } => {
                return Err(QueryError::UnsupportedCardinality {
                    attribute: spec.path(),
                    cardinality: spec.cardinality(),
                    context: "the attribute join planner",
                });
            }
        };

        tracing::trace!(attribute = %spec.path(), column = %column.column, "attribute resolved");
        resolved.insert(attr, column.clone());
        Ok(column)
    }
}
