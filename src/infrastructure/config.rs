// Configuration - dataset, fetcher, rendering and view settings
use crate::application::chunk_fetcher::DEFAULT_CHUNK_LENGTH;
use crate::domain::granularity::{parse_date, Granularity, Timestamp};
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub fetcher: FetcherSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetSettings {
    pub table: String,
    pub files: Vec<PathBuf>,
    pub whitespace_delimited: bool,
    /// Optional `name,description,unit` lookup.
    pub variables_csv: Option<PathBuf>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            table: "basin_daily".to_string(),
            files: Vec::new(),
            whitespace_delimited: false,
            variables_csv: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetcherSettings {
    /// Buckets per chunk.
    pub chunk_length: i64,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            chunk_length: DEFAULT_CHUNK_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderSettings {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub frame_interval_ms: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 300.0,
            margin_left: 80.0,
            margin_right: 20.0,
            margin_top: 20.0,
            margin_bottom: 30.0,
            frame_interval_ms: 16,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewSettings {
    pub variable: String,
    pub granularity: Granularity,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    /// Attribute whose distinct values become one plotted group each.
    pub group_by: Option<String>,
    pub output: PathBuf,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            variable: "streamflow".to_string(),
            granularity: Granularity::Day,
            time_start: None,
            time_end: None,
            group_by: None,
            output: PathBuf::from("timeseries.svg"),
        }
    }
}

impl ViewSettings {
    /// Parsed `[time_start, time_end]`, if both bounds are configured.
    pub fn time_range(&self) -> anyhow::Result<Option<(Timestamp, Timestamp)>> {
        let (Some(start), Some(end)) = (&self.time_start, &self.time_end) else {
            return Ok(None);
        };
        let start = parse_date(start).with_context(|| format!("invalid view.time_start {:?}", start))?;
        let end = parse_date(end).with_context(|| format!("invalid view.time_end {:?}", end))?;
        anyhow::ensure!(start <= end, "view.time_start must not be after view.time_end");
        Ok(Some((start, end)))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_config_from_str(toml: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::granularity::SECONDS_PER_DAY;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = load_config_from_str(
            r#"
            [dataset]
            table = "patch_daily"
            files = ["data/patch.daily"]
            whitespace_delimited = true

            [view]
            variable = "evap"
            granularity = "month"
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset.table, "patch_daily");
        assert_eq!(config.dataset.files, vec![PathBuf::from("data/patch.daily")]);
        assert!(config.dataset.whitespace_delimited);
        assert_eq!(config.view.granularity, Granularity::Month);
        assert_eq!(config.fetcher.chunk_length, 2000);
        assert_eq!(config.render.margin_left, 80.0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.view.output, PathBuf::from("timeseries.svg"));
    }

    #[test]
    fn test_view_time_range() {
        let mut view = ViewSettings::default();
        assert!(view.time_range().unwrap().is_none());

        view.time_start = Some("1970-01-02".into());
        view.time_end = Some("1970-01-05".into());
        assert_eq!(view.time_range().unwrap(), Some((SECONDS_PER_DAY, 4 * SECONDS_PER_DAY)));

        view.time_end = Some("1969-12-31".into());
        assert!(view.time_range().is_err());

        view.time_end = Some("not a date".into());
        assert!(view.time_range().is_err());
    }
}
