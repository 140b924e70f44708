//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features:
//! - LIMIT/OFFSET pagination
//! - SIMILAR TO ... ESCAPE

use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn supports_similar_to(&self) -> bool {
        true
    }
}
