//! Media item queries.
//!
//! ```text
//! MediaItemQuery ──compile──► CompiledItemQuery
//!                                 │
//!      ┌──────────────────────────┼──────────────────────────┐
//!      ▼                          ▼                          ▼
//! collection stmt (Genre)   collection stmt (Actors)   primary stmt
//!      │                          │                          │
//!      └────────── id → values ───┴──────── rows ────────────┘
//!                                 │
//!                                 ▼
//!                          Vec<MediaItem>
//! ```
//!
//! Bounded attributes (inline, many-to-one) come back as columns of the
//! primary statement. Every unbounded attribute gets its own collection
//! statement, whose rows are matched to items by id during hydration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use super::{decode_id, decode_value, in_transaction, ExplainedStatement};
use crate::compiler::{
    AttributeRef, AttributeRefs, CollectionMode, CollectionStatement, CollectionStatementBuilder,
    CompiledPredicate, CompiledSort, CompilerOptions, PrimaryMode, PrimaryStatement,
    PrimaryStatementBuilder,
};
use crate::error::QueryResult;
use crate::model::{AttributeValue, Filter, MediaItem, MediaItemAspect, MediaItemQuery, Value};
use crate::schema::{AspectId, AttributeSpec, SchemaSnapshot};
use crate::store::{Row, SqlStore, StoreTransaction};

/// A [`MediaItemQuery`] compiled against one schema snapshot.
///
/// Compilation resolves every aspect and attribute up front, so schema
/// errors surface before any statement reaches the store.
#[derive(Debug, Clone)]
pub struct CompiledItemQuery {
    schema: Arc<SchemaSnapshot>,
    options: CompilerOptions,
    refs: AttributeRefs,
    necessary: Vec<AspectId>,
    optional: Vec<AspectId>,
    /// Bounded attributes, loaded by the primary statement.
    main_attributes: Vec<AttributeRef>,
    /// Unbounded attributes, one collection statement each.
    collection_attributes: Vec<AttributeRef>,
    predicate: CompiledPredicate,
    sort: Vec<CompiledSort>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl CompiledItemQuery {
    #[tracing::instrument(skip_all, err, fields(
        necessary = query.necessary_aspects.len(),
        optional = query.optional_aspects.len(),
    ))]
    pub fn compile(
        schema: Arc<SchemaSnapshot>,
        query: &MediaItemQuery,
        options: &CompilerOptions,
    ) -> QueryResult<Self> {
        let mut necessary: Vec<AspectId> = Vec::new();
        for aspect in &query.necessary_aspects {
            schema.require_aspect(aspect)?;
            if !necessary.contains(aspect) {
                necessary.push(aspect.clone());
            }
        }

        let mut optional: Vec<AspectId> = Vec::new();
        for aspect in &query.optional_aspects {
            if schema.aspect(aspect.as_str()).is_none() {
                tracing::debug!(aspect = %aspect, "dropping unknown optional aspect");
                continue;
            }
            if !necessary.contains(aspect) && !optional.contains(aspect) {
                optional.push(aspect.clone());
            }
        }

        let selected: Vec<&AttributeSpec> = if query.select.is_empty() {
            necessary
                .iter()
                .chain(&optional)
                .filter_map(|aspect| schema.aspect(aspect.as_str()))
                .flat_map(|aspect| aspect.attributes())
                .collect()
        } else {
            let mut specs = Vec::with_capacity(query.select.len());
            for path in &query.select {
                let spec = schema.attribute(path)?;
                if !necessary.contains(spec.aspect()) && !optional.contains(spec.aspect()) {
                    tracing::debug!(attribute = %path, "selecting attribute makes its aspect optional");
                    optional.push(spec.aspect().clone());
                }
                specs.push(spec);
            }
            specs
        };

        let mut refs = AttributeRefs::new();
        let mut main_attributes = Vec::new();
        let mut collection_attributes = Vec::new();
        for spec in selected {
            let attr = refs.add(spec);
            if spec.cardinality().is_bounded() {
                main_attributes.push(attr);
            } else {
                collection_attributes.push(attr);
            }
        }

        let predicate = CompiledPredicate::compile(query.filter.as_ref(), &schema, &mut refs, options)?;

        let mut sort = Vec::with_capacity(query.sort.len());
        for spec in &query.sort {
            let attribute = refs.add(schema.attribute(&spec.attribute)?);
            sort.push(CompiledSort {
                attribute,
                direction: spec.direction,
            });
        }

        tracing::debug!(
            main = main_attributes.len(),
            collections = collection_attributes.len(),
            "item query compiled"
        );

        Ok(Self {
            schema,
            options: *options,
            refs,
            necessary,
            optional,
            main_attributes,
            collection_attributes,
            predicate,
            sort,
            limit: query.limit,
            offset: query.offset,
        })
    }

    pub fn necessary_aspects(&self) -> &[AspectId] {
        &self.necessary
    }

    pub fn optional_aspects(&self) -> &[AspectId] {
        &self.optional
    }

    pub fn schema(&self) -> &Arc<SchemaSnapshot> {
        &self.schema
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Without `paged`, limit and offset are left out; a lookup of a single
    /// item must not page past it.
    fn primary_statement(
        &self,
        predicate: &CompiledPredicate,
        paged: bool,
    ) -> QueryResult<PrimaryStatement> {
        let (limit, offset) = if paged {
            (self.limit, self.offset)
        } else {
            (None, None)
        };
        PrimaryStatementBuilder::new(&self.schema, &self.refs, predicate)
            .necessary(&self.necessary)
            .optional(&self.optional)
            .select(&self.main_attributes)
            .sort(&self.sort)
            .paginate(limit, offset)
            .options(self.options)
            .build(PrimaryMode::Items)
    }

    fn collection_statements(
        &self,
        predicate: &CompiledPredicate,
    ) -> QueryResult<Vec<CollectionStatement>> {
        self.collection_attributes
            .iter()
            .map(|attr| {
                CollectionStatementBuilder::new(&self.schema, &self.refs, predicate, *attr)
                    .necessary(&self.necessary)
                    .options(self.options)
                    .build(CollectionMode::Correlated)
            })
            .collect()
    }

    /// Every statement `execute` would run, in execution order.
    pub fn explain(&self) -> QueryResult<Vec<ExplainedStatement>> {
        let mut out = Vec::with_capacity(self.collection_attributes.len() + 1);
        for stmt in self.collection_statements(&self.predicate)? {
            out.push(ExplainedStatement {
                label: format!("collection {}", self.refs.spec(stmt.attribute).path()),
                sql: stmt.sql,
                params: stmt.params,
            });
        }
        let primary = self.primary_statement(&self.predicate, true)?;
        out.push(ExplainedStatement {
            label: "primary".to_string(),
            sql: primary.sql,
            params: primary.params,
        });
        Ok(out)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Load every matching item.
    ///
    /// Collection statements run first, then the primary statement, all in
    /// one transaction.
    #[tracing::instrument(skip_all, err, fields(collections = self.collection_attributes.len()))]
    pub fn execute(&self, store: &mut dyn SqlStore) -> QueryResult<Vec<MediaItem>> {
        let collections = self.collection_statements(&self.predicate)?;
        let primary = self.primary_statement(&self.predicate, true)?;

        let (collection_rows, primary_rows) = in_transaction(store, |tx| {
            let collection_rows = run_collections(tx, &collections)?;
            let primary_rows = tx.query(&primary.sql, &primary.params)?;
            Ok((collection_rows, primary_rows))
        })?;

        let values = self.collect_values(&collections, collection_rows)?;
        let items = self.hydrate(&primary, primary_rows, &values)?;
        tracing::debug!(items = items.len(), "item query executed");
        Ok(items)
    }

    /// Load the item with `id`, if it matches.
    ///
    /// The primary statement runs first; collection statements only run
    /// when it found the item.
    #[tracing::instrument(skip_all, err, fields(id = %id))]
    pub fn execute_single(&self, store: &mut dyn SqlStore, id: Uuid) -> QueryResult<Option<MediaItem>> {
        let mut refs = self.refs.clone();
        let only = CompiledPredicate::compile(
            Some(&Filter::item_ids(vec![id])),
            &self.schema,
            &mut refs,
            &self.options,
        )?;
        let predicate = self.predicate.conjoin(&only);
        let primary = self.primary_statement(&predicate, false)?;
        let collections = self.collection_statements(&predicate)?;

        let rows = in_transaction(store, |tx| {
            let primary_rows = tx.query(&primary.sql, &primary.params)?;
            if primary_rows.is_empty() {
                return Ok(None);
            }
            let collection_rows = run_collections(tx, &collections)?;
            Ok(Some((primary_rows, collection_rows)))
        })?;

        let Some((primary_rows, collection_rows)) = rows else {
            return Ok(None);
        };
        let values = self.collect_values(&collections, collection_rows)?;
        Ok(self.hydrate(&primary, primary_rows, &values)?.into_iter().next())
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    /// Group collection rows by attribute and item id, keeping row order.
    fn collect_values(
        &self,
        statements: &[CollectionStatement],
        rows: Vec<Vec<Row>>,
    ) -> QueryResult<HashMap<AttributeRef, HashMap<Uuid, Vec<Value>>>> {
        let mut out = HashMap::with_capacity(statements.len());
        for (stmt, rows) in statements.iter().zip(rows) {
            let spec = self.refs.spec(stmt.attribute);
            let id_alias = stmt.item_id_alias.as_deref().unwrap_or_default();
            let mut by_item: HashMap<Uuid, Vec<Value>> = HashMap::new();
            for row in &rows {
                let id = decode_id(id_alias, row.require(id_alias)?)?;
                let value = decode_value(spec, row.require(&stmt.value_alias)?)?;
                by_item.entry(id).or_default().push(value);
            }
            out.insert(stmt.attribute, by_item);
        }
        Ok(out)
    }

    fn hydrate(
        &self,
        primary: &PrimaryStatement,
        rows: Vec<Row>,
        values: &HashMap<AttributeRef, HashMap<Uuid, Vec<Value>>>,
    ) -> QueryResult<Vec<MediaItem>> {
        let id_alias = primary.item_id_alias.as_deref().unwrap_or_default();
        let mut seen = HashSet::with_capacity(rows.len());
        let mut items = Vec::with_capacity(rows.len());

        for row in &rows {
            let id = decode_id(id_alias, row.require(id_alias)?)?;
            if !seen.insert(id) {
                tracing::debug!(id = %id, "skipping repeated item row");
                continue;
            }

            let mut item = MediaItem::new(id);
            for (aspect, alias) in &primary.presence_aliases {
                if !row.require(alias)?.is_null() {
                    item.aspects
                        .insert(aspect.clone(), MediaItemAspect::new(aspect.clone()));
                }
            }

            for attr in &self.main_attributes {
                let spec = self.refs.spec(*attr);
                let Some(aspect) = item.aspects.get_mut(spec.aspect()) else {
                    continue;
                };
                let Some(alias) = primary.attribute_alias(*attr) else {
                    continue;
                };
                let value = decode_value(spec, row.require(alias)?)?;
                aspect
                    .attributes
                    .insert(spec.name().to_string(), AttributeValue::Single(value));
            }

            for attr in &self.collection_attributes {
                let spec = self.refs.spec(*attr);
                let Some(aspect) = item.aspects.get_mut(spec.aspect()) else {
                    continue;
                };
                let collected = values
                    .get(attr)
                    .and_then(|by_item| by_item.get(&id))
                    .cloned()
                    .unwrap_or_default();
                aspect
                    .attributes
                    .insert(spec.name().to_string(), AttributeValue::Collection(collected));
            }

            items.push(item);
        }

        Ok(items)
    }
}

fn run_collections(
    tx: &mut dyn StoreTransaction,
    statements: &[CollectionStatement],
) -> QueryResult<Vec<Vec<Row>>> {
    statements
        .iter()
        .map(|stmt| -> QueryResult<Vec<Row>> { Ok(tx.query(&stmt.sql, &stmt.params)?) })
        .collect()
}
