//! T-SQL (SQL Server) dialect.
//!
//! T-SQL features:
//! - OFFSET m ROWS FETCH NEXT n ROWS ONLY, which requires ORDER BY
//! - No SIMILAR TO

use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// T-SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        let mut ts = TokenStream::new();
        if limit.is_none() && offset.is_none() {
            return ts;
        }

        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(offset.unwrap_or(0) as i64))
            .space()
            .push(Token::Rows);
        if let Some(lim) = limit {
            ts.space()
                .push(Token::Fetch)
                .space()
                .push(Token::Next)
                .space()
                .push(Token::LitInt(lim as i64))
                .space()
                .push(Token::Rows)
                .space()
                .push(Token::Only);
        }
        ts
    }

    fn requires_order_by_for_offset(&self) -> bool {
        true
    }
}
