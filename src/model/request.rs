//! Media item query requests.

use serde::{Deserialize, Serialize};

use super::filter::{AttributePath, Filter};
use crate::schema::AspectId;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SortSpec {
    pub attribute: AttributePath,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(attribute: AttributePath) -> Self {
        Self {
            attribute,
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(attribute: AttributePath) -> Self {
        Self {
            attribute,
            direction: SortDirection::Descending,
        }
    }
}

/// A request for media items.
///
/// Items lacking any of `necessary_aspects` are excluded. Aspects in
/// `optional_aspects` are loaded when present. An empty `select` loads every
/// attribute of every requested aspect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[must_use = "builders have no effect until used"]
pub struct MediaItemQuery {
    pub necessary_aspects: Vec<AspectId>,
    pub optional_aspects: Vec<AspectId>,
    pub select: Vec<AttributePath>,
    pub filter: Option<Filter>,
    pub sort: Vec<SortSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl MediaItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn necessary(mut self, aspect: impl Into<AspectId>) -> Self {
        self.necessary_aspects.push(aspect.into());
        self
    }

    pub fn optional(mut self, aspect: impl Into<AspectId>) -> Self {
        self.optional_aspects.push(aspect.into());
        self
    }

    pub fn select(mut self, attribute: AttributePath) -> Self {
        self.select.push(attribute);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}
