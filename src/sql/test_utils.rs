//! Test utilities for SQL emission validation.
//!
//! Parses emitted statements with sqlparser-rs to make sure the compiler
//! never produces text a real SQL parser rejects.

use sqlparser::dialect::{MsSqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// # Example
///
/// ```ignore
/// use crate::sql::test_utils::validate_sql;
/// use crate::sql::dialect::Dialect;
///
/// validate_sql("SELECT T0.VALUE A0 FROM V_VIDEO_GENRE T0", Dialect::Sqlite).unwrap();
/// ```
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql("SELECT T0.VALUE A0 FROM V_VIDEO_GENRE T0", Dialect::Sqlite).unwrap();
        validate_sql("SELECT T0.VALUE A0 FROM V_VIDEO_GENRE T0", Dialect::Postgres).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM users", Dialect::Sqlite);
        assert!(result.is_err());
    }
}
