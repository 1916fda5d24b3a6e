// Row shapes returned by the backing data store
use crate::domain::granularity::Timestamp;
use crate::domain::stats::ValueStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One time bucket of averaged variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRow {
    pub t: Timestamp,
    pub values: BTreeMap<String, f64>,
}

impl VariableRow {
    pub fn new(t: Timestamp) -> Self {
        Self {
            t,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Missing variables read as NaN.
    pub fn value(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(f64::NAN)
    }
}

/// One cyclic bucket (e.g. day of year) with per-variable summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub t: i64,
    pub variables: BTreeMap<String, ValueStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Number,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub description: String,
    pub unit: String,
}
