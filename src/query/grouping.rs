//! Folding value groups into coarser groups.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value_query::ValueGroup;
use crate::model::{like_escape, AttributePath, Filter, Value};

/// Name of the group collecting values that do not start with a letter.
pub const OTHER_GROUP: &str = "#";

const LIKE_ESCAPE: char = '\\';

/// How value groups are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingFunction {
    /// One group per upper-cased first letter, plus [`OTHER_GROUP`].
    FirstCharacter,
}

/// A folded group, with a filter selecting its members when one exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultGroup {
    pub name: String,
    pub count: u64,
    pub filter: Option<Filter>,
}

impl GroupingFunction {
    /// Fold `groups` of `attribute`, summing counts. Result is sorted by
    /// group name.
    pub fn apply(self, attribute: &AttributePath, groups: &[ValueGroup]) -> Vec<ResultGroup> {
        match self {
            GroupingFunction::FirstCharacter => first_character(attribute, groups),
        }
    }
}

fn first_character(attribute: &AttributePath, groups: &[ValueGroup]) -> Vec<ResultGroup> {
    let mut folded: BTreeMap<String, u64> = BTreeMap::new();
    for group in groups {
        *folded.entry(first_character_key(&group.value)).or_default() += group.count;
    }

    folded
        .into_iter()
        .map(|(name, count)| {
            let filter = (name != OTHER_GROUP).then(|| {
                let pattern = format!("{}%", like_escape(&name, LIKE_ESCAPE));
                Filter::like_ignore_case(attribute.clone(), pattern, LIKE_ESCAPE)
            });
            ResultGroup {
                name,
                count,
                filter,
            }
        })
        .collect()
}

fn first_character_key(value: &Value) -> String {
    match value.as_text().and_then(|s| s.chars().next()) {
        Some(c) if c.is_alphabetic() => c.to_uppercase().collect(),
        _ => OTHER_GROUP.to_string(),
    }
}

impl fmt::Display for GroupingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingFunction::FirstCharacter => f.write_str("first-character"),
        }
    }
}

impl FromStr for GroupingFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-character" | "first_character" => Ok(GroupingFunction::FirstCharacter),
            other => Err(format!("unknown grouping function '{}'", other)),
        }
    }
}
