//! Media library facade.
//!
//! Bundles the current schema, compiler options and a store. Each call takes
//! the snapshot that is current at that moment and compiles from scratch, so
//! a schema replaced between two calls is seen by the second one.

use std::sync::Arc;

use uuid::Uuid;

use crate::compiler::CompilerOptions;
use crate::error::QueryResult;
use crate::model::{AttributePath, Filter, MediaItem, MediaItemQuery, Value};
use crate::query::{
    CompiledDistinctValueQuery, CompiledGroupedValueQuery, CompiledItemQuery, GroupingFunction,
    ResultGroup, ValueGroup,
};
use crate::schema::{AspectId, SchemaRegistry, SchemaSnapshot};
use crate::store::SqlStore;

/// Entry point for querying a media store.
pub struct MediaLibrary<S> {
    registry: SchemaRegistry,
    options: CompilerOptions,
    store: S,
}

impl<S: SqlStore> MediaLibrary<S> {
    pub fn new(schema: SchemaSnapshot, store: S) -> Self {
        Self {
            registry: SchemaRegistry::new(schema),
            options: CompilerOptions::default(),
            store,
        }
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn schema(&self) -> Arc<SchemaSnapshot> {
        self.registry.snapshot()
    }

    pub fn replace_schema(&self, schema: SchemaSnapshot) {
        self.registry.replace(schema);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Compile without executing.
    pub fn compile(&self, query: &MediaItemQuery) -> QueryResult<CompiledItemQuery> {
        CompiledItemQuery::compile(self.registry.snapshot(), query, &self.options)
    }

    pub fn search(&mut self, query: &MediaItemQuery) -> QueryResult<Vec<MediaItem>> {
        let compiled = self.compile(query)?;
        compiled.execute(&mut self.store)
    }

    /// Load the item with `id` if it satisfies `query`.
    pub fn load_item(&mut self, query: &MediaItemQuery, id: Uuid) -> QueryResult<Option<MediaItem>> {
        let compiled = self.compile(query)?;
        compiled.execute_single(&mut self.store, id)
    }

    pub fn distinct_values(
        &mut self,
        attribute: &AttributePath,
        necessary: &[AspectId],
        filter: Option<&Filter>,
    ) -> QueryResult<Vec<Value>> {
        let compiled = CompiledDistinctValueQuery::compile(
            self.registry.snapshot(),
            attribute,
            necessary,
            filter,
            &self.options,
        )?;
        compiled.execute(&mut self.store)
    }

    pub fn value_groups(
        &mut self,
        attribute: &AttributePath,
        necessary: &[AspectId],
        filter: Option<&Filter>,
    ) -> QueryResult<Vec<ValueGroup>> {
        let compiled = CompiledGroupedValueQuery::compile(
            self.registry.snapshot(),
            attribute,
            necessary,
            filter,
            &self.options,
        )?;
        compiled.execute(&mut self.store)
    }

    /// Value groups folded by `grouping`.
    pub fn grouped_value_groups(
        &mut self,
        attribute: &AttributePath,
        necessary: &[AspectId],
        filter: Option<&Filter>,
        grouping: GroupingFunction,
    ) -> QueryResult<Vec<ResultGroup>> {
        let groups = self.value_groups(attribute, necessary, filter)?;
        Ok(grouping.apply(attribute, &groups))
    }
}
