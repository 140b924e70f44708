//! SELECT statement rendering.
//!
//! The compiler assembles a [`SelectStatement`] from aliases it already
//! allocated; this module only decides the textual layout:
//!
//! ```text
//! SELECT [DISTINCT] <col> <alias>, ...
//! FROM <table> <alias> | (<select>) <alias>
//! [INNER | LEFT OUTER] JOIN <table> <alias> ON <a> = <b> ...
//! [WHERE <predicate>] [GROUP BY ...] [ORDER BY ...] [<pagination>]
//! ```
//!
//! Everything is emitted on one line with single spaces.

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Columns
// =============================================================================

/// `qualifier.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedColumn {
    pub qualifier: String,
    pub name: String,
}

impl QualifiedColumn {
    pub fn new(qualifier: &str, name: &str) -> Self {
        Self {
            qualifier: qualifier.into(),
            name: name.into(),
        }
    }

    pub fn to_token(&self) -> Token {
        Token::QualifiedIdent {
            qualifier: Some(self.qualifier.clone()),
            name: self.name.clone(),
        }
    }

    /// Plain text form, e.g. `T0.MEDIA_ITEM_ID`.
    pub fn render(&self) -> String {
        format!("{}.{}", self.qualifier, self.name)
    }
}

/// Expression allowed in a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    Column(QualifiedColumn),
    Count(QualifiedColumn),
}

/// A SELECT list item: expression with optional alias.
///
/// Aliases follow the expression directly, without `AS`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SelectExpr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn column(column: QualifiedColumn, alias: &str) -> Self {
        Self {
            expr: SelectExpr::Column(column),
            alias: Some(alias.into()),
        }
    }

    pub fn count(column: QualifiedColumn, alias: &str) -> Self {
        Self {
            expr: SelectExpr::Count(column),
            alias: Some(alias.into()),
        }
    }

    fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        match &self.expr {
            SelectExpr::Column(col) => {
                ts.push(col.to_token());
            }
            SelectExpr::Count(col) => {
                ts.push(Token::FunctionName("count".into()))
                    .lparen()
                    .push(col.to_token())
                    .rparen();
            }
        }
        if let Some(alias) = &self.alias {
            ts.space().push(Token::Ident(alias.clone()));
        }
        ts
    }
}

// =============================================================================
// FROM and JOIN
// =============================================================================

/// Source of the FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table { name: String, alias: String },
    Derived { query: Box<SelectStatement>, alias: String },
}

impl TableSource {
    fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            TableSource::Table { name, alias } => {
                ts.push(Token::Ident(name.clone()))
                    .space()
                    .push(Token::Ident(alias.clone()));
            }
            TableSource::Derived { query, alias } => {
                ts.lparen()
                    .append(&query.to_tokens(dialect))
                    .rparen()
                    .space()
                    .push(Token::Ident(alias.clone()));
            }
        }
        ts
    }
}

/// Type of join. Only the two kinds the compiler ever needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

/// `<kind> JOIN <table> <alias> ON <left> = <right>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: String,
    pub left: QualifiedColumn,
    pub right: QualifiedColumn,
}

impl JoinClause {
    fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        match self.join_type {
            JoinType::Inner => ts.push(Token::Inner),
            JoinType::LeftOuter => ts.push(Token::Left).space().push(Token::Outer),
        };
        ts.space()
            .push(Token::Join)
            .space()
            .push(Token::Ident(self.table.clone()))
            .space()
            .push(Token::Ident(self.alias.clone()))
            .space()
            .push(Token::On)
            .space()
            .push(self.left.to_token())
            .space()
            .push(Token::Eq)
            .space()
            .push(self.right.to_token());
        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY entry. Without a direction the store default applies.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: QualifiedColumn,
    pub dir: Option<SortDir>,
}

impl OrderByItem {
    fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(self.column.to_token());
        if let Some(dir) = self.dir {
            ts.space().push(match dir {
                SortDir::Asc => Token::Asc,
                SortDir::Desc => Token::Desc,
            });
        }
        ts
    }
}

// =============================================================================
// SELECT
// =============================================================================

/// A SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "SelectStatement has no effect until converted to SQL with to_sql()"]
pub struct SelectStatement {
    pub distinct: bool,
    pub select: Vec<SelectItem>,
    pub from: Option<TableSource>,
    pub joins: Vec<JoinClause>,
    /// Already bound predicate text.
    pub where_clause: Option<String>,
    pub group_by: Vec<QualifiedColumn>,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                ts.comma();
            }
            ts.space().append(&item.to_tokens());
        }

        if let Some(from) = &self.from {
            ts.space()
                .push(Token::From)
                .space()
                .append(&from.to_tokens(dialect));
        }

        for join in &self.joins {
            ts.space().append(&join.to_tokens());
        }

        if let Some(predicate) = &self.where_clause {
            ts.space()
                .push(Token::Where)
                .space()
                .push(Token::Raw(predicate.clone()));
        }

        if !self.group_by.is_empty() {
            ts.space().push(Token::GroupBy);
            for (i, col) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma();
                }
                ts.space().push(col.to_token());
            }
        }

        if !self.order_by.is_empty() {
            ts.space().push(Token::OrderBy);
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma();
                }
                ts.space().append(&item.to_tokens());
            }
        }

        let pagination = dialect.emit_limit_offset(self.limit, self.offset);
        if !pagination.is_empty() {
            ts.space().append(&pagination);
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}
