// Query parameters owned by each visualization and compared structurally
use crate::domain::granularity::{Granularity, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A filter value: grouping attributes may be textual or numerical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn matches_text(&self, value: &str) -> bool {
        match self {
            AttributeValue::Text(text) => text == value,
            AttributeValue::Number(n) => value.trim().parse::<f64>().is_ok_and(|v| v == *n),
        }
    }

    pub fn matches_number(&self, value: f64) -> bool {
        match self {
            AttributeValue::Number(n) => *n == value,
            AttributeValue::Text(text) => text.trim().parse::<f64>().is_ok_and(|v| v == value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    /// Value must be one of these. An empty list matches nothing.
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<AttributeValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<ValueRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFilter {
    /// Inclusive lower bound, compared in bucket space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<Timestamp>,
    /// Inclusive upper bound, compared in bucket space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeFilter>,
}

impl DataFilter {
    pub fn with_time_range(mut self, time_start: Timestamp, time_end: Timestamp) -> Self {
        self.time_start = Some(time_start);
        self.time_end = Some(time_end);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, filter: AttributeFilter) -> Self {
        self.attributes.insert(name.into(), filter);
        self
    }
}

/// Grouping: `variables` names the grouping attributes and each entry of
/// `groups` is one value tuple, positionally matched to `variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGroups {
    pub variables: Vec<String>,
    pub groups: Vec<Vec<String>>,
}

impl Default for DataGroups {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            groups: vec![Vec::new()],
        }
    }
}

impl DataGroups {
    pub fn new(variables: Vec<String>, groups: Vec<Vec<String>>) -> Self {
        Self { variables, groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterChange {
    Unchanged,
    Changed,
}

impl ParameterChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, ParameterChange::Changed)
    }
}

/// Store `next` into `slot` only when it differs by value.
pub fn replace_if_changed<T: PartialEq>(slot: &mut T, next: T) -> ParameterChange {
    if *slot == next {
        ParameterChange::Unchanged
    } else {
        *slot = next;
        ParameterChange::Changed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParameters {
    pub variables: Vec<String>,
    pub granularity: Granularity,
    pub groups: DataGroups,
    pub filter: Option<DataFilter>,
}
