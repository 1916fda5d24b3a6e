// Dataset service - use cases for browsing tables and choosing initial scales
use crate::application::data_repository::DataRepository;
use crate::domain::query::DataGroups;
use crate::domain::records::{VariableInfo, VariableKind};
use crate::domain::scale::{auto_scale, NumericalScale};
use std::sync::Arc;

#[derive(Clone)]
pub struct DatasetService {
    repository: Arc<dyn DataRepository>,
}

impl DatasetService {
    pub fn new(repository: Arc<dyn DataRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_tables(&self) -> anyhow::Result<Vec<String>> {
        self.repository.list_tables().await
    }

    pub async fn list_variables(&self, table: &str) -> anyhow::Result<Vec<VariableInfo>> {
        self.repository.list_variables(table).await
    }

    /// Variables that can be plotted on a numerical axis.
    pub async fn numeric_variables(&self, table: &str) -> anyhow::Result<Vec<VariableInfo>> {
        let variables = self.repository.list_variables(table).await?;
        Ok(variables
            .into_iter()
            .filter(|v| v.kind == VariableKind::Number)
            .collect())
    }

    /// Scale for a freshly created plot, or after its variable changed.
    pub async fn initial_scale(&self, table: &str, variable: &str) -> anyhow::Result<NumericalScale> {
        let stats = self.repository.query_value_stats(table, variable, None).await?;
        let scale = auto_scale(&stats, true);
        tracing::debug!(
            table,
            variable,
            min = scale.domain_min,
            max = scale.domain_max,
            "Initial scale chosen"
        );
        Ok(scale)
    }

    /// One group per distinct value of `attribute`.
    pub async fn group_by(&self, table: &str, attribute: &str) -> anyhow::Result<DataGroups> {
        let values = self.repository.query_distinct_values(table, attribute).await?;
        Ok(DataGroups::new(
            vec![attribute.to_string()],
            values.into_iter().map(|v| vec![v]).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory_repository::{Column, InMemoryRepository, Table};
    use chrono::NaiveDate;

    fn service() -> DatasetService {
        let dates = (1..=4)
            .map(|d| NaiveDate::from_ymd_opt(2001, 3, d).unwrap())
            .collect();
        let table = Table::new(dates)
            .with_column("flow", Column::Number(vec![10.0, 10.0, 10.0, 10.0]))
            .unwrap()
            .with_column("temp", Column::Number(vec![-2.0, 1.0, 3.0, -4.0]))
            .unwrap()
            .with_column("basin", Column::Text(["b", "a", "b", "a"].map(String::from).to_vec()))
            .unwrap();
        DatasetService::new(Arc::new(InMemoryRepository::new().with_table("daily", table)))
    }

    #[tokio::test]
    async fn test_numeric_variables() {
        let service = service();
        let names: Vec<String> = service
            .numeric_variables("daily")
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["flow", "temp"]);
        assert_eq!(service.list_variables("daily").await.unwrap().len(), 3);
        assert_eq!(service.list_tables().await.unwrap(), vec!["daily"]);
    }

    #[tokio::test]
    async fn test_initial_scale() {
        let service = service();
        // Constant series widens to [v-1, v+1].
        assert_eq!(
            service.initial_scale("daily", "flow").await.unwrap(),
            NumericalScale::linear(9.0, 11.0)
        );
        let temp = service.initial_scale("daily", "temp").await.unwrap();
        assert!(temp.domain_min < -4.0 && temp.domain_max > 3.0);
        assert!(!temp.log);
        assert!(service.initial_scale("daily", "basin").await.is_err());
    }

    #[tokio::test]
    async fn test_group_by_distinct_values() {
        let groups = service().group_by("daily", "basin").await.unwrap();
        assert_eq!(groups.variables, vec!["basin"]);
        assert_eq!(groups.groups, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }
}
