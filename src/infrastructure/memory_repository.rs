// In-memory repository implementation over loaded model-output tables
use crate::application::data_repository::DataRepository;
use crate::domain::granularity::Granularity;
use crate::domain::query::{AttributeFilter, DataFilter, DataGroups};
use crate::domain::records::{AggregatedRow, VariableInfo, VariableKind, VariableRow};
use crate::domain::stats::{StatsAccumulator, ValueStats};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TableError {
    #[error("column {name} has {actual} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Number(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Number(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Column::Number(_) => VariableKind::Number,
            Column::Text(_) => VariableKind::String,
        }
    }

    fn text(&self, row: usize) -> String {
        match self {
            Column::Number(values) => values[row].to_string(),
            Column::Text(values) => values[row].clone(),
        }
    }

    fn matches(&self, row: usize, filter: &AttributeFilter) -> bool {
        if let Some(one_of) = &filter.one_of {
            let found = match self {
                Column::Number(values) => one_of.iter().any(|v| v.matches_number(values[row])),
                Column::Text(values) => one_of.iter().any(|v| v.matches_text(&values[row])),
            };
            if !found {
                return false;
            }
        }
        if let Some(within) = &filter.within {
            let value = match self {
                Column::Number(values) => values[row],
                Column::Text(values) => values[row].trim().parse().unwrap_or(f64::NAN),
            };
            if !within.contains(value) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VariableMetadata {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
}

/// Daily model output: one calendar date per row plus named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Column>,
    metadata: BTreeMap<String, VariableMetadata>,
}

impl Table {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            ..Default::default()
        }
    }

    pub fn insert_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), TableError> {
        let name = name.into();
        if column.len() != self.dates.len() {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.dates.len(),
                actual: column.len(),
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self, TableError> {
        self.insert_column(name, column)?;
        Ok(self)
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, VariableMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn numeric_column(&self, table: &str, name: &str) -> Result<&[f64]> {
        match self.columns.get(name) {
            Some(Column::Number(values)) => Ok(values.as_slice()),
            Some(Column::Text(_)) => bail!("column {} of table {} is not numeric", name, table),
            None => bail!("unknown column {} in table {}", name, table),
        }
    }

    fn require_columns<'a>(&self, table: &str, names: impl IntoIterator<Item = &'a String>) -> Result<()> {
        for name in names {
            if !self.columns.contains_key(name) {
                bail!("unknown column {} in table {}", name, table);
            }
        }
        Ok(())
    }

    /// Time bounds are compared in bucket space at `granularity`, inclusive
    /// on both ends.
    fn matches_filter(&self, row: usize, granularity: Granularity, filter: Option<&DataFilter>) -> bool {
        let Some(filter) = filter else {
            return true;
        };
        let bucket = granularity.bucket_of_date(self.dates[row]);
        if filter.time_start.is_some_and(|t| bucket < granularity.bucket_of(t)) {
            return false;
        }
        if filter.time_end.is_some_and(|t| bucket > granularity.bucket_of(t)) {
            return false;
        }
        filter.attributes.iter().all(|(name, attribute)| {
            self.columns
                .get(name)
                .is_some_and(|column| column.matches(row, attribute))
        })
    }

    fn matching_groups(&self, row: usize, groups: Option<&DataGroups>) -> Vec<usize> {
        let Some(groups) = groups else {
            return vec![0];
        };
        groups
            .groups
            .iter()
            .enumerate()
            .filter(|(_, values)| {
                groups.variables.iter().zip(values.iter()).all(|(name, expected)| {
                    self.columns
                        .get(name)
                        .is_some_and(|column| column.text(row) == *expected)
                })
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn validate_query(&self, table: &str, groups: Option<&DataGroups>, filter: Option<&DataFilter>) -> Result<()> {
        if let Some(groups) = groups {
            self.require_columns(table, &groups.variables)?;
        }
        if let Some(filter) = filter {
            self.require_columns(table, filter.attributes.keys())?;
        }
        Ok(())
    }
}

/// Repository answering the backing-store contract from tables held in
/// memory. Tables are registered up front and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: BTreeMap<String, Arc<Table>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.insert(name.into(), Arc::new(table));
        self
    }

    fn table(&self, name: &str) -> Result<&Table> {
        match self.tables.get(name) {
            Some(table) => Ok(table.as_ref()),
            None => bail!("unknown table {}", name),
        }
    }
}

#[async_trait]
impl DataRepository for InMemoryRepository {
    async fn query_variables(
        &self,
        table_name: &str,
        granularity: Granularity,
        variables: &[String],
        groups: Option<&DataGroups>,
        filter: Option<&DataFilter>,
    ) -> Result<Vec<Vec<VariableRow>>> {
        let table = self.table(table_name)?;
        table.validate_query(table_name, groups, filter)?;
        let columns = variables
            .iter()
            .map(|v| table.numeric_column(table_name, v))
            .collect::<Result<Vec<_>>>()?;

        let group_count = groups.map_or(1, DataGroups::len);
        let mut buckets: Vec<BTreeMap<i64, Vec<StatsAccumulator>>> = vec![BTreeMap::new(); group_count];
        for row in 0..table.len() {
            if !table.matches_filter(row, granularity, filter) {
                continue;
            }
            let bucket = granularity.bucket_of_date(table.dates[row]);
            for group in table.matching_groups(row, groups) {
                let accumulators = buckets[group]
                    .entry(bucket)
                    .or_insert_with(|| vec![StatsAccumulator::new(); columns.len()]);
                for (acc, column) in accumulators.iter_mut().zip(&columns) {
                    acc.push(column[row]);
                }
            }
        }

        let result: Vec<Vec<VariableRow>> = buckets
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .filter_map(|(bucket, accumulators)| {
                        let t = granularity.bucket_start(bucket)?;
                        let values = variables
                            .iter()
                            .cloned()
                            .zip(accumulators.iter().map(|acc| acc.finish().mean))
                            .collect();
                        Some(VariableRow { t, values })
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(
            table = table_name,
            %granularity,
            groups = result.len(),
            rows = result.iter().map(Vec::len).sum::<usize>(),
            "Answered variable query"
        );
        Ok(result)
    }

    async fn query_aggregated_variables(
        &self,
        table_name: &str,
        variables: &[String],
        aggregation: Granularity,
        groups: Option<&DataGroups>,
        filter: Option<&DataFilter>,
    ) -> Result<Vec<Vec<AggregatedRow>>> {
        let table = self.table(table_name)?;
        table.validate_query(table_name, groups, filter)?;
        let columns = variables
            .iter()
            .map(|v| table.numeric_column(table_name, v))
            .collect::<Result<Vec<_>>>()?;

        let group_count = groups.map_or(1, DataGroups::len);
        let mut buckets: Vec<BTreeMap<i64, Vec<StatsAccumulator>>> = vec![BTreeMap::new(); group_count];
        for row in 0..table.len() {
            // Time filters of aggregated queries always apply at day resolution.
            if !table.matches_filter(row, Granularity::Day, filter) {
                continue;
            }
            let bucket = aggregation.cyclic_bucket_of(table.dates[row]);
            for group in table.matching_groups(row, groups) {
                let accumulators = buckets[group]
                    .entry(bucket)
                    .or_insert_with(|| vec![StatsAccumulator::new(); columns.len()]);
                for (acc, column) in accumulators.iter_mut().zip(&columns) {
                    acc.push(column[row]);
                }
            }
        }

        Ok(buckets
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .map(|(t, accumulators)| AggregatedRow {
                        t,
                        variables: variables
                            .iter()
                            .cloned()
                            .zip(accumulators.iter().map(StatsAccumulator::finish_sample))
                            .collect(),
                    })
                    .collect()
            })
            .collect())
    }

    /// The granularity is accepted for compatibility; summaries are always
    /// computed over the stored daily values.
    async fn query_value_stats(
        &self,
        table_name: &str,
        variable: &str,
        _granularity: Option<Granularity>,
    ) -> Result<ValueStats> {
        let table = self.table(table_name)?;
        let column = table.numeric_column(table_name, variable)?;
        let mut acc = StatsAccumulator::new();
        acc.extend(column.iter().copied());
        Ok(acc.finish_sample())
    }

    async fn query_distinct_values(&self, table_name: &str, variable: &str) -> Result<Vec<String>> {
        let table = self.table(table_name)?;
        let Some(column) = table.column(variable) else {
            bail!("unknown column {} in table {}", variable, table_name);
        };
        let distinct: BTreeSet<String> = (0..column.len()).map(|row| column.text(row)).collect();
        Ok(distinct.into_iter().collect())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn list_variables(&self, table_name: &str) -> Result<Vec<VariableInfo>> {
        let table = self.table(table_name)?;
        Ok(table
            .columns
            .iter()
            .map(|(name, column)| {
                let metadata = table.metadata.get(name).cloned().unwrap_or_default();
                VariableInfo {
                    name: name.clone(),
                    kind: column.kind(),
                    description: metadata.description,
                    unit: metadata.unit,
                }
            })
            .collect())
    }
}
