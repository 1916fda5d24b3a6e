// Timeseries renderer - incremental line paths over cached chunks
use crate::domain::chunk::{Chunk, ChunkKey};
use crate::domain::granularity::Timestamp;
use crate::domain::scale::{AxisTransform, NumericalScale, ScaleError};
use crate::presentation::coordinates::{map_samples, PlotLayout};
use crate::presentation::surface::{Point, Stroke, Surface};
use std::collections::BTreeMap;
use std::sync::Arc;

const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

#[derive(Debug, Clone, PartialEq)]
pub struct GroupStyle {
    pub color: String,
    pub line_width: f64,
    pub opacity: f64,
}

impl GroupStyle {
    pub fn palette(index: usize) -> Self {
        Self {
            color: PALETTE[index % PALETTE.len()].to_string(),
            line_width: 1.0,
            opacity: 1.0,
        }
    }
}

/// Inputs a cached path was computed from. The path is reused while all of
/// them still match.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PathInputs {
    generation: u64,
    x: AxisTransform,
    y: AxisTransform,
    /// Requested window clipped to the chunk's interval.
    visible: (Timestamp, Timestamp),
}

#[derive(Debug, Clone)]
struct CachedPath {
    inputs: PathInputs,
    points: Vec<Point>,
}

/// Line plot of one variable for every group, kept in pixel space per
/// chunk so that only affected chunks are recomputed when data, scale or
/// window change.
#[derive(Debug, Clone)]
pub struct TimeseriesView {
    layout: PlotLayout,
    variable: String,
    scale: NumericalScale,
    window: (Timestamp, Timestamp),
    x: AxisTransform,
    y: AxisTransform,
    styles: Vec<GroupStyle>,
    paths: BTreeMap<(usize, ChunkKey), CachedPath>,
    cursor: Option<Timestamp>,
    last_recomputed: usize,
}

impl TimeseriesView {
    pub fn new(
        layout: PlotLayout,
        variable: impl Into<String>,
        scale: NumericalScale,
        window: (Timestamp, Timestamp),
    ) -> Result<Self, ScaleError> {
        let x = layout.time_mapping(window.0, window.1)?.transform();
        let y = layout.value_mapping(scale)?.transform();
        Ok(Self {
            layout,
            variable: variable.into(),
            scale,
            window,
            x,
            y,
            styles: Vec::new(),
            paths: BTreeMap::new(),
            cursor: None,
            last_recomputed: 0,
        })
    }

    pub fn scale(&self) -> NumericalScale {
        self.scale
    }

    pub fn window(&self) -> (Timestamp, Timestamp) {
        self.window
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn layout(&self) -> PlotLayout {
        self.layout
    }

    /// Only the y transform changes; paths are rebuilt on the next update.
    pub fn set_scale(&mut self, scale: NumericalScale) -> Result<(), ScaleError> {
        self.y = self.layout.value_mapping(scale)?.transform();
        self.scale = scale;
        Ok(())
    }

    /// Only the x transform changes.
    pub fn set_window(&mut self, time_start: Timestamp, time_end: Timestamp) -> Result<(), ScaleError> {
        self.x = self.layout.time_mapping(time_start, time_end)?.transform();
        self.window = (time_start, time_end);
        Ok(())
    }

    pub fn set_layout(&mut self, layout: PlotLayout) -> Result<(), ScaleError> {
        let x = layout.time_mapping(self.window.0, self.window.1)?.transform();
        let y = layout.value_mapping(self.scale)?.transform();
        (self.layout, self.x, self.y) = (layout, x, y);
        Ok(())
    }

    pub fn set_variable(&mut self, variable: impl Into<String>) {
        let variable = variable.into();
        if variable != self.variable {
            self.variable = variable;
            self.paths.clear();
        }
    }

    pub fn set_styles(&mut self, styles: Vec<GroupStyle>) {
        self.styles = styles;
    }

    pub fn set_cursor(&mut self, cursor: Option<Timestamp>) {
        self.cursor = cursor;
    }

    /// Bring the pixel paths in line with `chunks`, recomputing only those
    /// whose data, transforms or visible range changed. Paths of chunks no
    /// longer present are dropped. Returns the number of recomputed paths.
    pub fn update(&mut self, chunks: &[Arc<Chunk>]) -> usize {
        let (t0, t1) = self.window;
        let mut live = BTreeMap::new();
        let mut recomputed = 0;
        for chunk in chunks {
            let visible = (t0.max(chunk.key.time_start), t1.min(chunk.key.time_end - 1));
            for (index, group) in chunk.groups.iter().enumerate() {
                let id = (index, chunk.key);
                let inputs = PathInputs {
                    generation: chunk.generation,
                    x: self.x,
                    y: self.y,
                    visible,
                };
                let path = match self.paths.remove(&id) {
                    Some(cached) if cached.inputs == inputs => cached,
                    _ => {
                        recomputed += 1;
                        let points = match group.variable(&self.variable) {
                            Some(values) => {
                                let range = group.window(t0, t1);
                                map_samples(&group.t[range.clone()], &values[range], self.x, self.y)
                            }
                            None => Vec::new(),
                        };
                        CachedPath { inputs, points }
                    }
                };
                live.insert(id, path);
            }
        }
        self.paths = live;
        self.last_recomputed = recomputed;
        tracing::trace!(recomputed, cached = self.paths.len(), "Timeseries paths updated");
        recomputed
    }

    pub fn last_recomputed(&self) -> usize {
        self.last_recomputed
    }

    /// Pixel points of one group, across chunks in time order.
    pub fn group_points(&self, group: usize) -> Vec<Point> {
        self.paths
            .range((group, ChunkKey::new(Timestamp::MIN, Timestamp::MIN))..)
            .take_while(|((g, _), _)| *g == group)
            .flat_map(|(_, path)| path.points.iter().copied())
            .collect()
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.clear();
        let group_count = self.paths.keys().map(|(g, _)| g + 1).max().unwrap_or(0);
        for group in 0..group_count {
            let style = self
                .styles
                .get(group)
                .cloned()
                .unwrap_or_else(|| GroupStyle::palette(group));
            let points = self.group_points(group);
            if points.is_empty() {
                continue;
            }
            let stroke = Stroke::new(style.color, style.line_width).with_opacity(style.opacity);
            surface.stroke_path(&points, &stroke);
        }
        if let Some(cursor) = self.cursor {
            let x = self.x.apply(cursor as f64);
            if x.is_finite() {
                let (bottom, top) = self.layout.y_range();
                surface.stroke_path(&[Point::new(x, bottom), Point::new(x, top)], &Stroke::new("black", 1.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunk::ChunkGroup;
    use crate::presentation::coordinates::Margins;
    use crate::presentation::surface::SvgSurface;

    fn layout() -> PlotLayout {
        PlotLayout::new(
            120.0,
            120.0,
            Margins {
                left: 10.0,
                right: 10.0,
                top: 10.0,
                bottom: 10.0,
            },
        )
    }

    fn chunk(start: i64, generation: u64, groups: usize) -> Arc<Chunk> {
        let t: Vec<i64> = (start..start + 10).collect();
        Arc::new(Chunk {
            key: ChunkKey::new(start, start + 10),
            generation,
            groups: (0..groups)
                .map(|g| {
                    let mut values = BTreeMap::new();
                    values.insert("flow".to_string(), t.iter().map(|&v| (v + g as i64) as f64).collect());
                    ChunkGroup { t: t.clone(), values }
                })
                .collect(),
        })
    }

    fn view() -> TimeseriesView {
        TimeseriesView::new(layout(), "flow", NumericalScale::linear(0.0, 100.0), (0, 100)).unwrap()
    }

    #[test]
    fn test_new_chunk_only_recomputes_that_chunk() {
        let mut view = view();
        let first = vec![chunk(0, 1, 2)];
        assert_eq!(view.update(&first), 2);
        assert_eq!(view.update(&first), 0);

        let both = vec![chunk(0, 1, 2), chunk(10, 1, 2)];
        assert_eq!(view.update(&both), 2);
        assert_eq!(view.last_recomputed(), 2);
        assert_eq!(view.group_points(0).len(), 20);
    }

    #[test]
    fn test_scale_change_recomputes_all() {
        let mut view = view();
        let chunks = vec![chunk(0, 1, 1), chunk(10, 1, 1)];
        view.update(&chunks);
        view.set_scale(NumericalScale::linear(0.0, 50.0)).unwrap();
        assert_eq!(view.update(&chunks), 2);
        assert!(view.set_scale(NumericalScale::log(0.0, 10.0)).is_err());
        assert_eq!(view.scale(), NumericalScale::linear(0.0, 50.0));
    }

    #[test]
    fn test_window_restricts_samples() {
        let mut view = view();
        let chunks = vec![chunk(0, 1, 1), chunk(10, 1, 1)];
        view.update(&chunks);
        view.set_window(5, 12).unwrap();
        view.update(&chunks);
        let points = view.group_points(0);
        assert_eq!(points.len(), 8);
        assert!((points[0].x - 10.0).abs() < 1e-9);
        assert!((points[7].x - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_generation_change_and_dropped_chunks() {
        let mut view = view();
        view.update(&[chunk(0, 1, 1), chunk(10, 1, 1)]);
        assert_eq!(view.update(&[chunk(0, 2, 1)]), 1);
        assert_eq!(view.group_points(0).len(), 10);
    }

    #[test]
    fn test_draw_groups_and_cursor() {
        let mut view = view();
        view.update(&[chunk(0, 1, 2)]);
        view.set_cursor(Some(50));
        let mut surface = SvgSurface::new(120.0, 120.0);
        view.draw(&mut surface);
        assert_eq!(surface.element_count(), 3);
        let svg = surface.to_svg_string();
        assert!(svg.contains("#1f77b4"));
        assert!(svg.contains("#ff7f0e"));
        assert!(svg.contains(r#"d="M 60.00,110.00 L 60.00,10.00""#));
    }

    #[test]
    fn test_variable_change_clears_paths() {
        let mut view = view();
        view.update(&[chunk(0, 1, 1)]);
        view.set_variable("evap");
        assert_eq!(view.update(&[chunk(0, 1, 1)]), 1);
        assert!(view.group_points(0).is_empty());
    }
}
