//! The primary statement: one row per matching item.
//!
//! ```text
//! SELECT <item id> A0, <presence per requested aspect>, <bounded attributes>
//! FROM <first necessary aspect table | item table> T0
//! INNER JOIN <other necessary aspect tables>
//! LEFT OUTER JOIN <optional aspect tables, attribute tables>
//! WHERE <predicate bound to T0's item id>
//! ORDER BY <sort columns>
//! ```

use std::collections::HashMap;

use super::alias::{AliasKey, AliasNamespace};
use super::attributes::{AttributeRef, AttributeRefs};
use super::join_planner::AttributeJoinPlanner;
use super::predicate::CompiledPredicate;
use super::tables::{ColumnRef, LogicalTable, StatementTables, TableId};
use super::CompilerOptions;
use crate::error::QueryResult;
use crate::model::{SortDirection, Value};
use crate::schema::{AspectId, SchemaSnapshot};
use crate::sql::{
    JoinType, OrderByItem, QualifiedColumn, SelectItem, SelectStatement, SortDir, SqlDialect,
    TableSource,
};

/// What the primary statement returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryMode {
    /// Item id, presence columns and attribute columns per item.
    Items,
    /// `SELECT DISTINCT` over the attribute columns only.
    Distinct,
    /// Count of distinct items per attribute value.
    Grouped,
}

/// Sort entry with its attribute already allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledSort {
    pub attribute: AttributeRef,
    pub direction: SortDirection,
}

/// A rendered primary statement and the aliases needed to read its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryStatement {
    pub statement: SelectStatement,
    pub sql: String,
    pub params: Vec<Value>,
    pub item_id_alias: Option<String>,
    pub presence_aliases: Vec<(AspectId, String)>,
    pub attribute_aliases: HashMap<AttributeRef, String>,
    pub count_alias: Option<String>,
}

impl PrimaryStatement {
    pub fn attribute_alias(&self, attr: AttributeRef) -> Option<&str> {
        self.attribute_aliases.get(&attr).map(String::as_str)
    }
}

/// Builds the primary statement of an item, distinct-value or grouped
/// query.
#[must_use = "builders have no effect until used"]
pub struct PrimaryStatementBuilder<'a> {
    schema: &'a SchemaSnapshot,
    refs: &'a AttributeRefs,
    predicate: &'a CompiledPredicate,
    necessary: &'a [AspectId],
    optional: &'a [AspectId],
    select: &'a [AttributeRef],
    sort: &'a [CompiledSort],
    limit: Option<u64>,
    offset: Option<u64>,
    options: CompilerOptions,
}

impl<'a> PrimaryStatementBuilder<'a> {
    pub fn new(
        schema: &'a SchemaSnapshot,
        refs: &'a AttributeRefs,
        predicate: &'a CompiledPredicate,
    ) -> Self {
        Self {
            schema,
            refs,
            predicate,
            necessary: &[],
            optional: &[],
            select: &[],
            sort: &[],
            limit: None,
            offset: None,
            options: CompilerOptions::default(),
        }
    }

    pub fn necessary(mut self, aspects: &'a [AspectId]) -> Self {
        self.necessary = aspects;
        self
    }

    pub fn optional(mut self, aspects: &'a [AspectId]) -> Self {
        self.optional = aspects;
        self
    }

    pub fn select(mut self, attributes: &'a [AttributeRef]) -> Self {
        self.select = attributes;
        self
    }

    pub fn sort(mut self, sort: &'a [CompiledSort]) -> Self {
        self.sort = sort;
        self
    }

    pub fn paginate(mut self, limit: Option<u64>, offset: Option<u64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(&self, mode: PrimaryMode) -> QueryResult<PrimaryStatement> {
        let mut aliases = AliasNamespace::new();
        self.build_in(mode, &mut aliases)
    }

    /// Build using a caller-owned namespace, for statements nested in a
    /// larger one.
    pub fn build_in(
        &self,
        mode: PrimaryMode,
        aliases: &mut AliasNamespace,
    ) -> QueryResult<PrimaryStatement> {
        let naming = self.schema.naming();
        let planner = AttributeJoinPlanner::new(self.schema, self.refs);
        let mut tables = StatementTables::new();
        let mut resolved = HashMap::new();

        // =====================================================================
        // FROM and JOINs
        // =====================================================================

        let base = match self.necessary.first() {
            Some(first) => {
                let aspect = self.schema.require_aspect(first)?;
                tables.add_base(aliases, LogicalTable::AspectMain(first.clone()), aspect.table())
            }
            None => tables.add_base(aliases, LogicalTable::Items, &naming.item_table),
        };
        let anchor = ColumnRef::new(base, &naming.item_id_column);

        let mut requested: Vec<(AspectId, TableId)> = Vec::new();
        for (aspects, join_type) in [
            (self.necessary, JoinType::Inner),
            (self.optional, JoinType::LeftOuter),
        ] {
            for aspect in aspects {
                let table = planner.join_aspect(aspect, aliases, &mut tables, join_type, &anchor)?;
                if !requested.iter().any(|(id, _)| id == aspect) {
                    requested.push((aspect.clone(), table));
                }
            }
        }

        for attr in self.select.iter().copied().chain(self.predicate.attributes()) {
            planner.resolve(
                attr,
                aliases,
                &mut tables,
                &mut resolved,
                JoinType::LeftOuter,
                &anchor,
            )?;
        }

        let mut order_by = Vec::with_capacity(self.sort.len());
        for sort in self.sort {
            let spec = self.refs.spec(sort.attribute);
            if !spec.cardinality().is_bounded() {
                tracing::debug!(attribute = %spec.path(), "skipping sort on collection attribute");
                continue;
            }
            let column = planner.resolve(
                sort.attribute,
                aliases,
                &mut tables,
                &mut resolved,
                JoinType::LeftOuter,
                &anchor,
            )?;
            order_by.push(OrderByItem {
                column: tables.qualify(&column),
                dir: Some(match sort.direction {
                    SortDirection::Ascending => SortDir::Asc,
                    SortDirection::Descending => SortDir::Desc,
                }),
            });
        }

        let anchor_column = tables.qualify(&anchor);
        let bound = self.predicate.bind(&resolved, &tables, &anchor_column)?;

        let mut statement = SelectStatement {
            from: tables.from_source(),
            joins: tables.join_clauses(),
            where_clause: (!bound.sql.is_empty()).then(|| bound.sql.clone()),
            ..Default::default()
        };

        // =====================================================================
        // SELECT list
        // =====================================================================

        let mut item_id_alias = None;
        let mut presence_aliases = Vec::new();
        let mut attribute_aliases = HashMap::new();
        let mut count_alias = None;

        match mode {
            PrimaryMode::Items => {
                let alias = aliases.get_or_create(AliasKey::ItemId, "A");
                statement.select.push(SelectItem::column(anchor_column.clone(), &alias));
                item_id_alias = Some(alias);

                for (aspect, table) in &requested {
                    let alias = aliases.get_or_create(AliasKey::Presence(*table), "A");
                    let presence = ColumnRef::new(*table, &naming.item_id_column);
                    statement.select.push(SelectItem::column(tables.qualify(&presence), &alias));
                    presence_aliases.push((aspect.clone(), alias));
                }

                self.select_attributes(&mut statement, aliases, &tables, &resolved, &mut attribute_aliases);

                if order_by.is_empty()
                    && (self.limit.is_some() || self.offset.is_some())
                    && self.options.dialect.requires_order_by_for_offset()
                {
                    order_by.push(OrderByItem {
                        column: anchor_column,
                        dir: None,
                    });
                }
                statement.order_by = order_by;
                statement.limit = self.limit;
                statement.offset = self.offset;
            }
            PrimaryMode::Distinct => {
                statement.distinct = true;
                self.select_attributes(&mut statement, aliases, &tables, &resolved, &mut attribute_aliases);
                for attr in self.select {
                    let Some(column) = resolved.get(attr) else {
                        continue;
                    };
                    let column = tables.qualify(column);
                    if !order_by.iter().any(|item| item.column == column) {
                        order_by.push(OrderByItem { column, dir: None });
                    }
                }
                statement.order_by = order_by;
            }
            PrimaryMode::Grouped => {
                statement.distinct = true;
                let id_alias = aliases.get_or_create(AliasKey::ItemId, "A");
                statement.select.push(SelectItem::column(anchor_column, &id_alias));
                self.select_attributes(&mut statement, aliases, &tables, &resolved, &mut attribute_aliases);

                let derived = aliases.get_or_create(AliasKey::Derived, "T");
                let count = aliases.get_or_create(AliasKey::Count, "A");
                let mut outer = SelectStatement::new();
                outer
                    .select
                    .push(SelectItem::count(QualifiedColumn::new(&derived, &id_alias), &count));
                for attr in self.select {
                    if let Some(alias) = attribute_aliases.get(attr) {
                        let column = QualifiedColumn::new(&derived, alias);
                        outer.select.push(SelectItem::column(column.clone(), alias));
                        outer.group_by.push(column.clone());
                        outer.order_by.push(OrderByItem { column, dir: None });
                    }
                }
                outer.from = Some(TableSource::Derived {
                    query: Box::new(statement),
                    alias: derived,
                });
                statement = outer;
                count_alias = Some(count);
            }
        }

        let sql = statement.to_sql(self.options.dialect);
        tracing::debug!(sql = %sql, params = bound.params.len(), "primary statement built");

        Ok(PrimaryStatement {
            statement,
            sql,
            params: bound.params,
            item_id_alias,
            presence_aliases,
            attribute_aliases,
            count_alias,
        })
    }

    fn select_attributes(
        &self,
        statement: &mut SelectStatement,
        aliases: &mut AliasNamespace,
        tables: &StatementTables,
        resolved: &HashMap<AttributeRef, ColumnRef>,
        attribute_aliases: &mut HashMap<AttributeRef, String>,
    ) {
        for attr in self.select {
            if attribute_aliases.contains_key(attr) {
                continue;
            }
            // Every selected attribute was resolved above.
            let Some(column) = resolved.get(attr) else {
                continue;
            };
            let alias = aliases.get_or_create(AliasKey::Attribute(*attr), "A");
            statement
                .select
                .push(SelectItem::column(tables.qualify(column), &alias));
            attribute_aliases.insert(*attr, alias);
        }
    }
}
