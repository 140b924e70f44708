//! SQLite dialect.
//!
//! SQLite features:
//! - LIMIT/OFFSET, where an OFFSET needs a LIMIT (`LIMIT -1` means none)
//! - No SIMILAR TO

use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// SQLite dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        let mut ts = TokenStream::new();
        if limit.is_none() && offset.is_none() {
            return ts;
        }

        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        ts.push(Token::Limit).space().push(Token::LitInt(limit));
        if let Some(off) = offset {
            ts.space().push(Token::Offset).space().push(Token::LitInt(off as i64));
        }
        ts
    }
}
