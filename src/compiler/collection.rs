//! Statements over one collection attribute.
//!
//! ```text
//! OneToMany    FROM V_VIDEO_GENRE T0
//! ManyToMany   FROM NM_VIDEO_ACTORS T0
//!              INNER JOIN V_VIDEO_ACTORS T1 ON T1.VALUE_ID = T0.VALUE_ID
//!              INNER JOIN <necessary aspect tables> ON ... = T0.<item id>
//!              LEFT OUTER JOIN <predicate attribute tables>
//! WHERE <predicate bound to T0's item id>
//! ```
//!
//! The same predicate as the primary statement restricts the rows to values
//! of matching items.

use std::collections::HashMap;

use super::alias::{AliasKey, AliasNamespace};
use super::attributes::{AttributeRef, AttributeRefs};
use super::join_planner::AttributeJoinPlanner;
use super::predicate::CompiledPredicate;
use super::tables::{ColumnRef, LogicalTable, StatementTables};
use super::CompilerOptions;
use crate::error::{QueryError, QueryResult};
use crate::model::Value;
use crate::schema::{AspectId, AttributeStorage, SchemaSnapshot};
use crate::sql::{JoinType, OrderByItem, QualifiedColumn, SelectItem, SelectStatement, TableSource};

/// What the collection statement returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMode {
    /// `(item id, value)` pairs in stored order.
    Correlated,
    /// Each distinct value once.
    Distinct,
    /// Count of distinct items per value.
    Grouped,
}

/// A rendered collection statement and the aliases of its output columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStatement {
    pub attribute: AttributeRef,
    pub statement: SelectStatement,
    pub sql: String,
    pub params: Vec<Value>,
    pub item_id_alias: Option<String>,
    pub value_alias: String,
    pub count_alias: Option<String>,
}

/// Builds the statement loading the values of one one-to-many or
/// many-to-many attribute.
#[must_use = "builders have no effect until used"]
pub struct CollectionStatementBuilder<'a> {
    schema: &'a SchemaSnapshot,
    refs: &'a AttributeRefs,
    predicate: &'a CompiledPredicate,
    attribute: AttributeRef,
    necessary: &'a [AspectId],
    options: CompilerOptions,
}

impl<'a> CollectionStatementBuilder<'a> {
    pub fn new(
        schema: &'a SchemaSnapshot,
        refs: &'a AttributeRefs,
        predicate: &'a CompiledPredicate,
        attribute: AttributeRef,
    ) -> Self {
        Self {
            schema,
            refs,
            predicate,
            attribute,
            necessary: &[],
            options: CompilerOptions::default(),
        }
    }

    pub fn necessary(mut self, aspects: &'a [AspectId]) -> Self {
        self.necessary = aspects;
        self
    }

    pub fn options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(&self, mode: CollectionMode) -> QueryResult<CollectionStatement> {
        let mut aliases = AliasNamespace::new();
        self.build_in(mode, &mut aliases)
    }

    pub fn build_in(
        &self,
        mode: CollectionMode,
        aliases: &mut AliasNamespace,
    ) -> QueryResult<CollectionStatement> {
        let spec = self.refs.spec(self.attribute);
        let naming = self.schema.naming();
        let path = spec.path();
        let mut tables = StatementTables::new();

        let (base, value) = match spec.storage() {
            AttributeStorage::OneToMany { collection_table } => {
                let base =
                    tables.add_base(aliases, LogicalTable::Collection(path.clone()), collection_table);
                (base, ColumnRef::new(base, &naming.value_column))
            }
            AttributeStorage::ManyToMany {
                junction_table,
                value_table,
            } => {
                let base =
                    tables.add_base(aliases, LogicalTable::Collection(path.clone()), junction_table);
                let values = tables.ensure_joined(
                    aliases,
                    LogicalTable::CollectionValues(path.clone()),
                    value_table,
                    JoinType::Inner,
                    &naming.value_id_column,
                    ColumnRef::new(base, &naming.value_id_column),
                );
                (base, ColumnRef::new(values, &naming.value_column))
            }
            AttributeStorage::Inline { .. } | AttributeStorage::ManyToOne { .. } => {
                return Err(QueryError::UnsupportedCardinality {
                    attribute: path,
                    cardinality: spec.cardinality(),
                    context: "a collection statement",
                });
            }
        };
        let anchor = ColumnRef::new(base, &naming.item_id_column);

        let planner = AttributeJoinPlanner::new(self.schema, self.refs);
        for aspect in self.necessary {
            planner.join_aspect(aspect, aliases, &mut tables, JoinType::Inner, &anchor)?;
        }
        let mut resolved = HashMap::new();
        for attr in self.predicate.attributes() {
            planner.resolve(
                attr,
                aliases,
                &mut tables,
                &mut resolved,
                JoinType::LeftOuter,
                &anchor,
            )?;
        }

        let anchor_column = tables.qualify(&anchor);
        let value_column = tables.qualify(&value);
        let bound = self.predicate.bind(&resolved, &tables, &anchor_column)?;

        let mut statement = SelectStatement {
            from: tables.from_source(),
            joins: tables.join_clauses(),
            where_clause: (!bound.sql.is_empty()).then(|| bound.sql.clone()),
            ..Default::default()
        };

        let mut item_id_alias = None;
        let mut count_alias = None;
        let value_alias;

        match mode {
            CollectionMode::Correlated => {
                let id_alias = aliases.get_or_create(AliasKey::ItemId, "A");
                value_alias = aliases.get_or_create(AliasKey::Value, "A");
                statement.select = vec![
                    SelectItem::column(anchor_column.clone(), &id_alias),
                    SelectItem::column(value_column, &value_alias),
                ];
                statement.order_by.push(OrderByItem {
                    column: anchor_column,
                    dir: None,
                });
                if let Some(order) = &naming.value_order_column {
                    statement.order_by.push(OrderByItem {
                        column: tables.qualify(&ColumnRef::new(base, order)),
                        dir: None,
                    });
                }
                item_id_alias = Some(id_alias);
            }
            CollectionMode::Distinct => {
                value_alias = aliases.get_or_create(AliasKey::Value, "A");
                statement.distinct = true;
                statement.select = vec![SelectItem::column(value_column.clone(), &value_alias)];
                statement.order_by.push(OrderByItem {
                    column: value_column,
                    dir: None,
                });
            }
            CollectionMode::Grouped => {
                let id_alias = aliases.get_or_create(AliasKey::ItemId, "A");
                value_alias = aliases.get_or_create(AliasKey::Value, "A");
                statement.distinct = true;
                statement.select = vec![
                    SelectItem::column(anchor_column, &id_alias),
                    SelectItem::column(value_column, &value_alias),
                ];

                let derived = aliases.get_or_create(AliasKey::Derived, "T");
                let count = aliases.get_or_create(AliasKey::Count, "A");
                let grouped_value = QualifiedColumn::new(&derived, &value_alias);
                let outer = SelectStatement {
                    select: vec![
                        SelectItem::count(QualifiedColumn::new(&derived, &id_alias), &count),
                        SelectItem::column(grouped_value.clone(), &value_alias),
                    ],
                    from: Some(TableSource::Derived {
                        query: Box::new(statement),
                        alias: derived,
                    }),
                    group_by: vec![grouped_value.clone()],
                    order_by: vec![OrderByItem {
                        column: grouped_value,
                        dir: None,
                    }],
                    ..Default::default()
                };
                statement = outer;
                count_alias = Some(count);
            }
        }

        let sql = statement.to_sql(self.options.dialect);
        tracing::debug!(attribute = %path, sql = %sql, "collection statement built");

        Ok(CollectionStatement {
            attribute: self.attribute,
            statement,
            sql,
            params: bound.params,
            item_id_alias,
            value_alias,
            count_alias,
        })
    }
}
