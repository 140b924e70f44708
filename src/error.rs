//! Error types for query compilation and execution.

use crate::model::AttributePath;
use crate::schema::{AspectId, Cardinality};
use crate::store::StoreError;

/// Errors raised while compiling, binding or executing a media query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    // =========================================================================
    // Schema errors
    // =========================================================================
    #[error("Unknown aspect type '{0}'")]
    UnknownAspect(AspectId),

    #[error("Unknown attribute '{attribute}' on aspect type '{aspect}'")]
    UnknownAttribute { aspect: AspectId, attribute: String },

    // =========================================================================
    // Structural errors
    // =========================================================================
    #[error("IN filter on '{0}' has an empty value list")]
    EmptyInList(AttributePath),

    #[error("Operator {operator} is not supported by the {dialect} dialect")]
    UnsupportedOperator {
        operator: &'static str,
        dialect: &'static str,
    },

    #[error("Attribute '{attribute}' has {cardinality} cardinality, which {context} cannot handle")]
    UnsupportedCardinality {
        attribute: AttributePath,
        cardinality: Cardinality,
        context: &'static str,
    },

    #[error("Invalid filter value for '{attribute}': {message}")]
    InvalidFilterValue {
        attribute: AttributePath,
        message: String,
    },

    // =========================================================================
    // Binding errors
    // =========================================================================
    #[error("Attribute '{0}' is used by the predicate but was never joined into the statement")]
    UnresolvedAttribute(AttributePath),

    // =========================================================================
    // Execution and hydration
    // =========================================================================
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl QueryError {
    /// True when the query referenced something the current schema does not have.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            QueryError::UnknownAspect(_) | QueryError::UnknownAttribute { .. }
        )
    }

    /// True for caller/programming errors in the shape of the query.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            QueryError::EmptyInList(_)
                | QueryError::UnsupportedOperator { .. }
                | QueryError::UnsupportedCardinality { .. }
                | QueryError::InvalidFilterValue { .. }
        )
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
