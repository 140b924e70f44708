//! # mediaql
//!
//! Compiles media library queries into parameterized SQL over an
//! aspect-based schema, and hydrates the results into media items.
//!
//! ## Architecture
//!
//! An item's attributes are spread over aspect tables. Each attribute is
//! stored inline, behind a shared value table, in a child collection table
//! or through a junction table:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        MediaItemQuery (filter, select, sort, page)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema snapshot]
//! ┌─────────────────────────────────────────────────────────┐
//! │   CompiledPredicate + bounded / collection attributes    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [statement builders]
//! ┌─────────────────────────────────────────────────────────┐
//! │   collection statements ... primary statement (SQL, ?)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [store, one transaction]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  rows ──► MediaItem                      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use mediaql::prelude::*;
//!
//! # fn run(schema: SchemaSnapshot) -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("library.db")?;
//! let mut library = MediaLibrary::new(schema, store);
//!
//! let title = AttributePath::new("video", "Title");
//! let query = MediaItemQuery::new()
//!     .necessary("video")
//!     .optional("genre")
//!     .filter(Filter::like(title.clone(), "Incep%"))
//!     .sort(SortSpec::asc(title));
//!
//! for item in library.search(&query)? {
//!     println!("{}", item.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod model;
pub mod query;
pub mod schema;
pub mod sql;
pub mod store;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compiler::CompilerOptions;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::library::MediaLibrary;
    pub use crate::model::{
        like_escape, AttributePath, AttributeValue, Filter, MediaItem, MediaItemAspect,
        MediaItemQuery, RelationalOperator, SortDirection, SortSpec, Value, ValueType,
    };
    pub use crate::query::{
        CompiledDistinctValueQuery, CompiledGroupedValueQuery, CompiledItemQuery,
        ExplainedStatement, GroupingFunction, ResultGroup, ValueGroup,
    };
    pub use crate::schema::{
        AspectDefinition, AspectId, AttributeDefinition, Cardinality, SchemaDefinition,
        SchemaRegistry, SchemaSnapshot, StorageNaming,
    };
    pub use crate::sql::Dialect;
    pub use crate::store::{SqlStore, SqliteStore};
}

pub use error::{QueryError, QueryResult};
pub use library::MediaLibrary;
pub use sql::Dialect;
