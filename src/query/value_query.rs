//! Distinct values and value groups of one attribute.
//!
//! Bounded attributes read from the primary statement builder, with the
//! attribute's own aspect made necessary. Unbounded attributes read from a
//! collection statement. Grouped queries count distinct items per value:
//!
//! ```text
//! SELECT COUNT(T1.A0) A2, T1.A1 A1
//! FROM (SELECT DISTINCT <item id> A0, <value> A1 FROM ... WHERE ...) T1
//! GROUP BY T1.A1
//! ```

use std::sync::Arc;

use serde::Serialize;

use super::{decode_count, decode_value, in_transaction, ExplainedStatement};
use crate::compiler::{
    AttributeRef, AttributeRefs, CollectionMode, CollectionStatementBuilder, CompiledPredicate,
    CompilerOptions, PrimaryMode, PrimaryStatementBuilder,
};
use crate::error::{QueryError, QueryResult};
use crate::model::{AttributePath, Filter, Value};
use crate::schema::{AspectId, SchemaSnapshot};
use crate::store::SqlStore;

/// Number of distinct items having one attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueGroup {
    pub value: Value,
    pub count: u64,
}

/// A statement and the aliases needed to read its rows.
struct ValueStatement {
    sql: String,
    params: Vec<Value>,
    value_alias: String,
    count_alias: Option<String>,
}

/// Parts shared by the distinct and grouped variants.
#[derive(Debug, Clone)]
struct ValueQueryParts {
    schema: Arc<SchemaSnapshot>,
    options: CompilerOptions,
    refs: AttributeRefs,
    attribute: AttributeRef,
    necessary: Vec<AspectId>,
    predicate: CompiledPredicate,
}

impl ValueQueryParts {
    fn compile(
        schema: Arc<SchemaSnapshot>,
        attribute: &AttributePath,
        necessary: &[AspectId],
        filter: Option<&Filter>,
        options: &CompilerOptions,
    ) -> QueryResult<Self> {
        let mut aspects: Vec<AspectId> = Vec::with_capacity(necessary.len() + 1);
        for aspect in necessary {
            schema.require_aspect(aspect)?;
            if !aspects.contains(aspect) {
                aspects.push(aspect.clone());
            }
        }

        let spec = schema.attribute(attribute)?;
        if spec.cardinality().is_bounded() && !aspects.contains(spec.aspect()) {
            aspects.push(spec.aspect().clone());
        }

        let mut refs = AttributeRefs::new();
        let attr = refs.add(spec);
        let predicate = CompiledPredicate::compile(filter, &schema, &mut refs, options)?;

        Ok(Self {
            schema,
            options: *options,
            refs,
            attribute: attr,
            necessary: aspects,
            predicate,
        })
    }

    fn is_bounded(&self) -> bool {
        self.refs.spec(self.attribute).cardinality().is_bounded()
    }

    fn statement(&self, grouped: bool) -> QueryResult<ValueStatement> {
        if self.is_bounded() {
            let select = [self.attribute];
            let mode = if grouped {
                PrimaryMode::Grouped
            } else {
                PrimaryMode::Distinct
            };
            let stmt = PrimaryStatementBuilder::new(&self.schema, &self.refs, &self.predicate)
                .necessary(&self.necessary)
                .select(&select)
                .options(self.options)
                .build(mode)?;
            let value_alias = stmt
                .attribute_alias(self.attribute)
                .map(str::to_string)
                .ok_or_else(|| QueryError::UnresolvedAttribute(self.refs.spec(self.attribute).path()))?;
            Ok(ValueStatement {
                sql: stmt.sql,
                params: stmt.params,
                value_alias,
                count_alias: stmt.count_alias,
            })
        } else {
            let mode = if grouped {
                CollectionMode::Grouped
            } else {
                CollectionMode::Distinct
            };
            let stmt =
                CollectionStatementBuilder::new(&self.schema, &self.refs, &self.predicate, self.attribute)
                    .necessary(&self.necessary)
                    .options(self.options)
                    .build(mode)?;
            Ok(ValueStatement {
                sql: stmt.sql,
                params: stmt.params,
                value_alias: stmt.value_alias,
                count_alias: stmt.count_alias,
            })
        }
    }

    fn explain(&self, grouped: bool) -> QueryResult<Vec<ExplainedStatement>> {
        let stmt = self.statement(grouped)?;
        let kind = if grouped { "grouped" } else { "distinct" };
        Ok(vec![ExplainedStatement {
            label: format!("{} {}", kind, self.refs.spec(self.attribute).path()),
            sql: stmt.sql,
            params: stmt.params,
        }])
    }
}

// =============================================================================
// Distinct values
// =============================================================================

/// Every distinct value of one attribute among matching items.
#[derive(Debug, Clone)]
pub struct CompiledDistinctValueQuery {
    parts: ValueQueryParts,
}

impl CompiledDistinctValueQuery {
    #[tracing::instrument(skip_all, err, fields(attribute = %attribute))]
    pub fn compile(
        schema: Arc<SchemaSnapshot>,
        attribute: &AttributePath,
        necessary: &[AspectId],
        filter: Option<&Filter>,
        options: &CompilerOptions,
    ) -> QueryResult<Self> {
        let parts = ValueQueryParts::compile(schema, attribute, necessary, filter, options)?;
        Ok(Self { parts })
    }

    pub fn explain(&self) -> QueryResult<Vec<ExplainedStatement>> {
        self.parts.explain(false)
    }

    #[tracing::instrument(skip_all, err)]
    pub fn execute(&self, store: &mut dyn SqlStore) -> QueryResult<Vec<Value>> {
        let stmt = self.parts.statement(false)?;
        let rows = in_transaction(store, |tx| Ok(tx.query(&stmt.sql, &stmt.params)?))?;

        let spec = self.parts.refs.spec(self.parts.attribute);
        rows.iter()
            .map(|row| decode_value(spec, row.require(&stmt.value_alias)?))
            .collect()
    }
}

// =============================================================================
// Grouped values
// =============================================================================

/// Count of distinct matching items per value of one attribute.
#[derive(Debug, Clone)]
pub struct CompiledGroupedValueQuery {
    parts: ValueQueryParts,
}

impl CompiledGroupedValueQuery {
    #[tracing::instrument(skip_all, err, fields(attribute = %attribute))]
    pub fn compile(
        schema: Arc<SchemaSnapshot>,
        attribute: &AttributePath,
        necessary: &[AspectId],
        filter: Option<&Filter>,
        options: &CompilerOptions,
    ) -> QueryResult<Self> {
        let parts = ValueQueryParts::compile(schema, attribute, necessary, filter, options)?;
        Ok(Self { parts })
    }

    pub fn attribute(&self) -> AttributePath {
        self.parts.refs.spec(self.parts.attribute).path()
    }

    pub fn explain(&self) -> QueryResult<Vec<ExplainedStatement>> {
        self.parts.explain(true)
    }

    #[tracing::instrument(skip_all, err)]
    pub fn execute(&self, store: &mut dyn SqlStore) -> QueryResult<Vec<ValueGroup>> {
        let stmt = self.parts.statement(true)?;
        let count_alias = stmt.count_alias.as_deref().unwrap_or_default();
        let rows = in_transaction(store, |tx| Ok(tx.query(&stmt.sql, &stmt.params)?))?;

        let spec = self.parts.refs.spec(self.parts.attribute);
        rows.iter()
            .map(|row| -> QueryResult<ValueGroup> {
                Ok(ValueGroup {
                    value: decode_value(spec, row.require(&stmt.value_alias)?)?,
                    count: decode_count(count_alias, row.require(count_alias)?)?,
                })
            })
            .collect()
    }
}
