//! Table instances, resolved columns and joins of one statement.

use std::collections::HashMap;

use super::alias::{AliasKey, AliasNamespace};
use crate::model::AttributePath;
use crate::schema::AspectId;
use crate::sql::{JoinClause, JoinType, QualifiedColumn, TableSource};

/// Handle to a table instance.
///
/// Ids are drawn from the alias namespace, so statements sharing one
/// namespace never hand out the same id twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

/// What a table instance stands for. At most one instance exists per
/// logical table in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalTable {
    /// The media item table.
    Items,
    /// Main table of an aspect type.
    AspectMain(AspectId),
    /// Shared value table of a many-to-one attribute.
    ValueTable(AttributePath),
    /// Collection table (one-to-many) or junction table (many-to-many).
    Collection(AttributePath),
    /// Value table behind a many-to-many junction.
    CollectionValues(AttributePath),
}

/// A table instance bound to its alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub id: TableId,
    pub logical: LogicalTable,
    pub name: String,
    pub alias: String,
}

/// A column of a table instance. Equal when both table instance and column
/// name are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: TableId,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: TableId, column: &str) -> Self {
        Self {
            table,
            column: column.to_string(),
        }
    }
}

/// `join_type JOIN table ON left = right`, where `left` belongs to `table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEdge {
    pub join_type: JoinType,
    pub table: TableId,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// Tables and joins of one statement, in creation order.
///
/// The first table added is the FROM table; every later one is reached
/// through exactly one [`JoinEdge`].
#[derive(Debug, Clone, Default)]
pub struct StatementTables {
    tables: Vec<TableRef>,
    by_logical: HashMap<LogicalTable, TableId>,
    joins: Vec<JoinEdge>,
}

impl StatementTables {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, aliases: &mut AliasNamespace, logical: LogicalTable, name: &str) -> TableId {
        let id = TableId(aliases.len());
        let alias = aliases.get_or_create(AliasKey::Table(id), "T");
        tracing::trace!(table = name, alias = %alias, "table added");
        self.by_logical.insert(logical.clone(), id);
        self.tables.push(TableRef {
            id,
            logical,
            name: name.to_string(),
            alias,
        });
        id
    }

    /// Add the FROM table. Returns the existing instance if already present.
    pub fn add_base(&mut self, aliases: &mut AliasNamespace, logical: LogicalTable, name: &str) -> TableId {
        match self.by_logical.get(&logical) {
            Some(id) => *id,
            None => self.add(aliases, logical, name),
        }
    }

    /// Join `logical` on `<it>.join_column = to`, unless it is already part
    /// of the statement, in which case the existing instance is returned
    /// and its join kind is left alone.
    pub fn ensure_joined(
        &mut self,
        aliases: &mut AliasNamespace,
        logical: LogicalTable,
        name: &str,
        join_type: JoinType,
        join_column: &str,
        to: ColumnRef,
    ) -> TableId {
        if let Some(id) = self.by_logical.get(&logical) {
            return *id;
        }
        let id = self.add(aliases, logical, name);
        self.joins.push(JoinEdge {
            join_type,
            table: id,
            left: ColumnRef::new(id, join_column),
            right: to,
        });
        id
    }

    pub fn get(&self, logical: &LogicalTable) -> Option<TableId> {
        self.by_logical.get(logical).copied()
    }

    /// Table instance behind `id`.
    ///
    /// # Panics
    ///
    /// If `id` belongs to a different statement.
    pub fn table(&self, id: TableId) -> &TableRef {
        match self.tables.binary_search_by_key(&id, |t| t.id) {
            Ok(i) => &self.tables[i],
            Err(_) => panic!("table {:?} is not part of this statement", id),
        }
    }

    pub fn tables(&self) -> &[TableRef] {
        &self.tables
    }

    pub fn joins(&self) -> &[JoinEdge] {
        &self.joins
    }

    pub fn qualify(&self, column: &ColumnRef) -> QualifiedColumn {
        QualifiedColumn::new(&self.table(column.table).alias, &column.column)
    }

    pub fn from_source(&self) -> Option<TableSource> {
        self.tables.first().map(|t| TableSource::Table {
            name: t.name.clone(),
            alias: t.alias.clone(),
        })
    }

    pub fn join_clauses(&self) -> Vec<JoinClause> {
        self.joins
            .iter()
            .map(|edge| {
                let table = self.table(edge.table);
                JoinClause {
                    join_type: edge.join_type,
                    table: table.name.clone(),
                    alias: table.alias.clone(),
                    left: self.qualify(&edge.left),
                    right: self.qualify(&edge.right),
                }
            })
            .collect()
    }
}
