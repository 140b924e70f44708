//! rusqlite-backed store.

use std::path::Path;
use std::sync::Arc;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql, Transaction};
use uuid::Uuid;

use super::{Row, SqlStore, StoreError, StoreResult, StoreTransaction};
use crate::model::Value;

/// A store over one SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl SqlStore for SqliteStore {
    fn begin(&mut self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        let tx = self.conn.transaction()?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn query(&mut self, sql: &str, params: &[Value]) -> StoreResult<Vec<Row>> {
        let mut stmt = self.tx.prepare(sql)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, column) in columns.iter().enumerate() {
                values.push(from_sql(column, row.get_ref(i)?)?);
            }
            out.push(Row::new(columns.clone(), values));
        }
        Ok(out)
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

// =============================================================================
// Value conversion
// =============================================================================

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Id(id) => ToSqlOutput::Owned(Sql::Text(id.to_string())),
        })
    }
}

fn from_sql(column: &str, value: ValueRef<'_>) -> StoreResult<Value> {
    let unsupported = |message: String| StoreError::UnsupportedValue {
        column: column.to_string(),
        message,
    };

    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Text(s.to_string()))
            .map_err(|e| unsupported(e.to_string())),
        ValueRef::Blob(bytes) => Uuid::from_slice(bytes)
            .map(Value::Id)
            .map_err(|_| unsupported(format!("{}-byte blob", bytes.len()))),
    }
}
