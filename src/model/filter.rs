//! Declarative filter trees over aspect attributes.
//!
//! A [`Filter`] says *what* must hold for an item; the compiler decides how
//! each node is rendered based on the storage shape of the attribute it
//! touches.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Value;
use crate::schema::AspectId;

/// Reference to one attribute of one aspect type, by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct AttributePath {
    pub aspect: AspectId,
    pub attribute: String,
}

impl AttributePath {
    pub fn new(aspect: impl Into<AspectId>, attribute: impl Into<String>) -> Self {
        Self {
            aspect: aspect.into(),
            attribute: attribute.into(),
        }
    }

    /// Parse `aspect.attribute`.
    pub fn parse(s: &str) -> Option<Self> {
        let (aspect, attribute) = s.split_once('.')?;
        if aspect.is_empty() || attribute.is_empty() {
            return None;
        }
        Some(Self::new(aspect, attribute))
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.aspect, self.attribute)
    }
}

/// N-ary boolean connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOperator {
    And,
    Or,
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationalOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelationalOperator {
    pub fn as_sql(self) -> &'static str {
        match self {
            RelationalOperator::Eq => "=",
            RelationalOperator::Ne => "<>",
            RelationalOperator::Lt => "<",
            RelationalOperator::Le => "<=",
            RelationalOperator::Gt => ">",
            RelationalOperator::Ge => ">=",
        }
    }
}

/// A filter tree node.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Operands joined by AND/OR. No operands means no restriction.
    Combine {
        op: BooleanOperator,
        operands: Vec<Filter>,
    },
    Not {
        filter: Box<Filter>,
    },
    /// The attribute has no value (NULL, or an empty collection).
    Empty {
        attribute: AttributePath,
    },
    Relational {
        attribute: AttributePath,
        op: RelationalOperator,
        value: Value,
    },
    Like {
        attribute: AttributePath,
        pattern: String,
        #[serde(default)]
        escape: Option<char>,
        #[serde(default = "default_true")]
        case_sensitive: bool,
    },
    SimilarTo {
        attribute: AttributePath,
        pattern: String,
        #[serde(default)]
        escape: Option<char>,
    },
    Between {
        attribute: AttributePath,
        low: Value,
        high: Value,
    },
    In {
        attribute: AttributePath,
        values: Vec<Value>,
    },
    /// Restrict to the given item ids. An empty list matches nothing.
    ItemIds {
        ids: Vec<Uuid>,
    },
    /// Matches nothing.
    False,
}

fn default_true() -> bool {
    true
}

impl Filter {
    pub fn and(operands: Vec<Filter>) -> Self {
        Filter::Combine {
            op: BooleanOperator::And,
            operands,
        }
    }

    pub fn or(operands: Vec<Filter>) -> Self {
        Filter::Combine {
            op: BooleanOperator::Or,
            operands,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    pub fn is_empty(attribute: AttributePath) -> Self {
        Filter::Empty { attribute }
    }

    pub fn compare(attribute: AttributePath, op: RelationalOperator, value: impl Into<Value>) -> Self {
        Filter::Relational {
            attribute,
            op,
            value: value.into(),
        }
    }

    pub fn eq(attribute: AttributePath, value: impl Into<Value>) -> Self {
        Self::compare(attribute, RelationalOperator::Eq, value)
    }

    pub fn like(attribute: AttributePath, pattern: impl Into<String>) -> Self {
        Filter::Like {
            attribute,
            pattern: pattern.into(),
            escape: None,
            case_sensitive: true,
        }
    }

    /// Case-insensitive LIKE with an explicit escape character.
    pub fn like_ignore_case(attribute: AttributePath, pattern: impl Into<String>, escape: char) -> Self {
        Filter::Like {
            attribute,
            pattern: pattern.into(),
            escape: Some(escape),
            case_sensitive: false,
        }
    }

    pub fn similar_to(attribute: AttributePath, pattern: impl Into<String>) -> Self {
        Filter::SimilarTo {
            attribute,
            pattern: pattern.into(),
            escape: None,
        }
    }

    pub fn between(attribute: AttributePath, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Filter::Between {
            attribute,
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_in(attribute: AttributePath, values: Vec<Value>) -> Self {
        Filter::In { attribute, values }
    }

    pub fn item_ids(ids: Vec<Uuid>) -> Self {
        Filter::ItemIds { ids }
    }

    /// Set the escape character of a LIKE or SIMILAR TO node.
    ///
    /// Other node kinds are returned unchanged.
    #[must_use = "builders have no effect until used"]
    pub fn with_escape(mut self, escape_char: char) -> Self {
        match &mut self {
            Filter::Like { escape, .. } | Filter::SimilarTo { escape, .. } => {
                *escape = Some(escape_char);
            }
            _ => {}
        }
        self
    }

    /// AND two optional filters together.
    pub fn combine(left: Option<Filter>, right: Option<Filter>) -> Option<Filter> {
        match (left, right) {
            (Some(l), Some(r)) => Some(Filter::and(vec![l, r])),
            (l, None) => l,
            (None, r) => r,
        }
    }

    /// Every attribute mentioned anywhere in this tree, in visiting order.
    pub fn attributes(&self) -> Vec<&AttributePath> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a AttributePath>) {
        match self {
            Filter::Combine { operands, .. } => {
                for operand in operands {
                    operand.collect_attributes(out);
                }
            }
            Filter::Not { filter } => filter.collect_attributes(out),
            Filter::Empty { attribute }
            | Filter::Relational { attribute, .. }
            | Filter::Like { attribute, .. }
            | Filter::SimilarTo { attribute, .. }
            | Filter::Between { attribute, .. }
            | Filter::In { attribute, .. } => out.push(attribute),
            Filter::ItemIds { .. } | Filter::False => {}
        }
    }
}

/// Escape LIKE wildcards in `text` so it matches literally.
pub fn like_escape(text: &str, escape: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '%' || c == '_' || c == escape {
            out.push(escape);
        }
        out.push(c);
    }
    out
}
