// Main entry point - loads a dataset, renders one view to SVG and reports its statistics
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use rhessys_explorer::application::chunk_fetcher::ChunkFetcher;
use rhessys_explorer::application::dataset_service::DatasetService;
use rhessys_explorer::application::view_stats::compute_view_stats;
use rhessys_explorer::domain::chunk::Chunk;
use rhessys_explorer::domain::granularity::{format_timestamp, Granularity};
use rhessys_explorer::domain::query::{DataGroups, QueryParameters};
use rhessys_explorer::domain::scale::{auto_scale_conservative, NumericalScale};
use rhessys_explorer::domain::stats::ValueStats;
use rhessys_explorer::infrastructure::config::{load_config, AppConfig};
use rhessys_explorer::infrastructure::memory_repository::InMemoryRepository;
use rhessys_explorer::infrastructure::rhessys_loader::{load_table, load_variable_metadata, LoadOptions};
use rhessys_explorer::presentation::coordinates::{Margins, PlotLayout};
use rhessys_explorer::presentation::redraw::RedrawScheduler;
use rhessys_explorer::presentation::surface::SvgSurface;
use rhessys_explorer::presentation::timeseries::TimeseriesView;

#[derive(Debug, Serialize)]
struct ViewReport {
    table: String,
    variable: String,
    granularity: Granularity,
    time_start: String,
    time_end: String,
    groups: usize,
    chunks: usize,
    initial_scale: NumericalScale,
    view_stats: ValueStats,
    view_scale: NumericalScale,
    output: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load dataset (infrastructure layer)
    let dataset = &config.dataset;
    let mut table = load_table(
        &dataset.files,
        LoadOptions {
            whitespace_delimited: dataset.whitespace_delimited,
        },
    )
    .context("failed to load dataset")?;
    if let Some(path) = &dataset.variables_csv {
        table = table.with_metadata(load_variable_metadata(path)?);
    }
    let dates = table.len();
    let repository = Arc::new(InMemoryRepository::new().with_table(dataset.table.clone(), table));

    // Create services (application layer)
    let service = DatasetService::new(repository.clone());
    tracing::info!(tables = ?service.list_tables().await?, rows = dates, "Dataset ready");

    let view = &config.view;
    let numeric = service.numeric_variables(&dataset.table).await?;
    anyhow::ensure!(
        numeric.iter().any(|v| v.name == view.variable),
        "{} is not a numerical variable of {}",
        view.variable,
        dataset.table
    );
    let initial_scale = service.initial_scale(&dataset.table, &view.variable).await?;
    let groups = match &view.group_by {
        Some(attribute) => service.group_by(&dataset.table, attribute).await?,
        None => DataGroups::default(),
    };
    let (time_start, time_end) = match view.time_range()? {
        Some(range) => range,
        None => anyhow::bail!("view.time_start and view.time_end must be configured"),
    };

    let fetcher = ChunkFetcher::new(repository.clone(), dataset.table.clone())
        .with_chunk_length(config.fetcher.chunk_length);
    fetcher.set_parameters(QueryParameters {
        variables: vec![view.variable.clone()],
        granularity: view.granularity,
        groups: groups.clone(),
        filter: None,
    });

    // Render (presentation layer)
    let timeseries = Arc::new(Mutex::new(TimeseriesView::new(
        layout(&config),
        view.variable.clone(),
        initial_scale,
        (time_start, time_end),
    )?));
    let scheduler = RedrawScheduler::new(Duration::from_millis(config.render.frame_interval_ms));

    fetcher.request(time_start, time_end).await?;
    let chunks = fetcher.get_chunks(time_start, time_end);
    schedule_redraw(&scheduler, &timeseries, &config, chunks.clone());

    // Fit the axis to what is actually visible
    let view_stats = compute_view_stats(&chunks, time_start, time_end, &view.variable);
    let view_scale = auto_scale_conservative(&view_stats, true);
    timeseries
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .set_scale(view_scale)?;
    schedule_redraw(&scheduler, &timeseries, &config, chunks.clone());
    scheduler.flush().await;

    let report = ViewReport {
        table: dataset.table.clone(),
        variable: view.variable.clone(),
        granularity: view.granularity,
        time_start: format_timestamp(time_start),
        time_end: format_timestamp(time_end),
        groups: groups.len(),
        chunks: chunks.len(),
        initial_scale,
        view_stats,
        view_scale,
        output: view.output.display().to_string(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn layout(config: &AppConfig) -> PlotLayout {
    let render = &config.render;
    PlotLayout::new(
        render.width,
        render.height,
        Margins {
            left: render.margin_left,
            right: render.margin_right,
            top: render.margin_top,
            bottom: render.margin_bottom,
        },
    )
}

/// Queue a repaint of the timeseries into the configured SVG file.
fn schedule_redraw(
    scheduler: &RedrawScheduler,
    timeseries: &Arc<Mutex<TimeseriesView>>,
    config: &AppConfig,
    chunks: Vec<Arc<Chunk>>,
) {
    let timeseries = timeseries.clone();
    let output = config.view.output.clone();
    let (width, height) = (config.render.width, config.render.height);
    scheduler.schedule(move || {
        let mut view = timeseries.lock().unwrap_or_else(PoisonError::into_inner);
        let recomputed = view.update(&chunks);
        let mut surface = SvgSurface::new(width, height);
        view.draw(&mut surface);
        match std::fs::write(&output, surface.to_svg_string()) {
            Ok(()) => tracing::info!(path = %output.display(), recomputed, "Rendered timeseries"),
            Err(e) => tracing::error!(path = %output.display(), "Failed to write SVG: {}", e),
        }
    });
}
