//! SQL execution collaborator.
//!
//! The query layer hands finished statement text and parameters to a
//! [`StoreTransaction`] and gets back [`Row`]s addressable by output
//! alias. Every statement of one query execution runs inside the same
//! transaction:
//!
//! ```text
//! SqlStore::begin ──► query(collection 1) ─► ... ─► query(primary) ──► commit
//!                          └──────────── on any error ─────────────► rollback
//! ```
//!
//! [`SqliteStore`] is the bundled implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use std::sync::Arc;

use crate::model::Value;

/// Errors raised by a store while executing a statement.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Result set has no column '{0}'")]
    MissingColumn(String),

    #[error("Unsupported value in column '{column}': {message}")]
    UnsupportedValue { column: String, message: String },

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One result row. Columns are addressed by their output alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(alias))
            .and_then(|i| self.values.get(i))
    }

    /// Like [`Row::get`], failing when the column is missing.
    pub fn require(&self, alias: &str) -> StoreResult<&Value> {
        self.get(alias)
            .ok_or_else(|| StoreError::MissingColumn(alias.to_string()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// An open transaction.
///
/// Dropping a transaction without committing discards it.
pub trait StoreTransaction {
    /// Run a SELECT with positional `?` parameters.
    fn query(&mut self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>>;

    fn commit(self: Box<Self>) -> StoreResult<()>;

    fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Something that can open transactions.
pub trait SqlStore {
    fn begin(&mut self) -> StoreResult<Box<dyn StoreTransaction + '_>>;
}
