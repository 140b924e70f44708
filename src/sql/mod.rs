//! SQL generation module.
//!
//! - [`statement`] - SELECT statement model and rendering
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod statement;
pub mod token;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, SqlDialect};
pub use statement::{
    JoinClause, JoinType, OrderByItem, QualifiedColumn, SelectExpr, SelectItem, SelectStatement,
    SortDir, TableSource,
};
pub use token::{Token, TokenStream};
