// Repository trait for the backing analytic store
use crate::domain::granularity::Granularity;
use crate::domain::query::{DataFilter, DataGroups};
use crate::domain::records::{AggregatedRow, VariableInfo, VariableRow};
use crate::domain::stats::ValueStats;
use async_trait::async_trait;

#[async_trait]
pub trait DataRepository: Send + Sync {
    /// Time-bucketed averages of `variables`, one row sequence per group in
    /// the order of `groups.groups` (a single sequence when ungrouped),
    /// each ordered by bucket time.
    async fn query_variables(
        &self,
        table: &str,
        granularity: Granularity,
        variables: &[String],
        groups: Option<&DataGroups>,
        filter: Option<&DataFilter>,
    ) -> anyhow::Result<Vec<Vec<VariableRow>>>;

    /// Per-variable summaries for each cyclic bucket of `aggregation`
    /// (day/week/month of year), grouped like `query_variables`.
    async fn query_aggregated_variables(
        &self,
        table: &str,
        variables: &[String],
        aggregation: Granularity,
        groups: Option<&DataGroups>,
        filter: Option<&DataFilter>,
    ) -> anyhow::Result<Vec<Vec<AggregatedRow>>>;

    /// Summary of every stored value of a numerical variable.
    async fn query_value_stats(
        &self,
        table: &str,
        variable: &str,
        granularity: Option<Granularity>,
    ) -> anyhow::Result<ValueStats>;

    /// Distinct values of a variable, rendered as strings.
    async fn query_distinct_values(&self, table: &str, variable: &str) -> anyhow::Result<Vec<String>>;

    async fn list_tables(&self) -> anyhow::Result<Vec<String>>;

    async fn list_variables(&self, table: &str) -> anyhow::Result<Vec<VariableInfo>>;
}
