//! Query orchestration.
//!
//! Compiles a request against one schema snapshot, runs the resulting
//! statements inside one store transaction and turns the rows into domain
//! values.
//!
//! - [`item_query`] - media item queries and hydration
//! - [`value_query`] - distinct values and value groups of one attribute
//! - [`grouping`] - folding value groups into coarser groups

pub mod grouping;
pub mod item_query;
pub mod value_query;

pub use grouping::{GroupingFunction, ResultGroup};
pub use item_query::CompiledItemQuery;
pub use value_query::{CompiledDistinctValueQuery, CompiledGroupedValueQuery, ValueGroup};

use serde::Serialize;
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};
use crate::model::{Value, ValueType};
use crate::schema::AttributeSpec;
use crate::store::{SqlStore, StoreTransaction};

/// One statement of a compiled query, as it would be executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainedStatement {
    pub label: String,
    pub sql: String,
    pub params: Vec<Value>,
}

/// Run `f` inside a transaction of `store`.
///
/// Commits when `f` succeeds. Otherwise rolls back and returns `f`'s error;
/// a failing rollback is logged and does not mask it.
pub(crate) fn in_transaction<T, F>(store: &mut dyn SqlStore, f: F) -> QueryResult<T>
where
    F: FnOnce(&mut dyn StoreTransaction) -> QueryResult<T>,
{
    let mut tx = store.begin()?;
    match f(tx.as_mut()) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Read an item id column.
pub(crate) fn decode_id(column: &str, value: &Value) -> QueryResult<Uuid> {
    match value.clone().coerce(ValueType::Id) {
        Ok(Value::Id(id)) => Ok(id),
        Ok(other) => Err(QueryError::Decode {
            column: column.to_string(),
            message: format!("expected an item id, got {}", other),
        }),
        Err(message) => Err(QueryError::Decode {
            column: column.to_string(),
            message,
        }),
    }
}

/// Read an attribute value, converting it to the attribute's declared type.
pub(crate) fn decode_value(spec: &AttributeSpec, value: &Value) -> QueryResult<Value> {
    value
        .clone()
        .coerce(spec.value_type())
        .map_err(|message| QueryError::Decode {
            column: spec.path().to_string(),
            message,
        })
}

/// Read an aggregate count column.
pub(crate) fn decode_count(column: &str, value: &Value) -> QueryResult<u64> {
    match value {
        Value::Int(n) if *n >= 0 => Ok(*n as u64),
        other => Err(QueryError::Decode {
            column: column.to_string(),
            message: format!("expected a count, got {}", other),
        }),
    }
}
