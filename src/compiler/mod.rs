//! Statement compilation.
//!
//! A media query compiles into one primary statement plus one statement per
//! selected collection attribute. All of them share the same
//! [`CompiledPredicate`], bound separately against each statement's tables:
//!
//! ```text
//!                 ┌──────────────────────┐
//!   Filter ──────►│  CompiledPredicate   │──── bind ───┬──► primary WHERE
//!                 └──────────────────────┘             └──► collection WHERE
//!
//!   select ──► AttributeRefs ──► AttributeJoinPlanner ──► StatementTables
//!                                                            │
//!                                 AliasNamespace ◄───────────┘
//! ```
//!
//! - [`alias`] - `T<n>` / `A<n>` alias allocation
//! - [`attributes`] - per-compile attribute occurrences
//! - [`tables`] - table instances and joins of one statement
//! - [`join_planner`] - joins for bounded attributes
//! - [`predicate`] - filter compilation and binding
//! - [`primary`] - the per-item statement
//! - [`collection`] - statements for collection attributes

pub mod alias;
pub mod attributes;
pub mod collection;
pub mod join_planner;
pub mod predicate;
pub mod primary;
pub mod tables;

pub use alias::{AliasKey, AliasNamespace};
pub use attributes::{AttributeRef, AttributeRefs};
pub use collection::{CollectionMode, CollectionStatement, CollectionStatementBuilder};
pub use join_planner::AttributeJoinPlanner;
pub use predicate::{BoundPredicate, CompiledPredicate, PredicatePart};
pub use primary::{CompiledSort, PrimaryMode, PrimaryStatement, PrimaryStatementBuilder};
pub use tables::{ColumnRef, LogicalTable, StatementTables, TableId};

use serde::{Deserialize, Serialize};

use crate::sql::Dialect;

/// Largest IN list emitted before it is split into OR'ed clusters.
pub const DEFAULT_MAX_IN_VALUES: usize = 800;

/// Knobs that change the emitted SQL without changing its meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub dialect: Dialect,
    pub max_in_values: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_in_values: DEFAULT_MAX_IN_VALUES,
        }
    }
}

impl CompilerOptions {
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }
}
