// Scatter renderer - two variables of the same samples against each other
use crate::domain::chunk::Chunk;
use crate::domain::granularity::Timestamp;
use crate::domain::scale::{AxisTransform, NumericalScale, ScaleError};
use crate::presentation::coordinates::{map_pairs, PlotLayout};
use crate::presentation::surface::{Fill, Point, Surface};
use crate::presentation::timeseries::GroupStyle;
use std::sync::Arc;

const POINT_RADIUS: f64 = 2.0;

/// Scatter plot of `x_variable` against `y_variable` for samples inside
/// the time window. Each axis has its own scale.
#[derive(Debug, Clone)]
pub struct ScatterView {
    layout: PlotLayout,
    x_variable: String,
    y_variable: String,
    x_scale: NumericalScale,
    y_scale: NumericalScale,
    window: (Timestamp, Timestamp),
    x: AxisTransform,
    y: AxisTransform,
    styles: Vec<GroupStyle>,
}

impl ScatterView {
    pub fn new(
        layout: PlotLayout,
        x_variable: impl Into<String>,
        x_scale: NumericalScale,
        y_variable: impl Into<String>,
        y_scale: NumericalScale,
        window: (Timestamp, Timestamp),
    ) -> Result<Self, ScaleError> {
        Ok(Self {
            layout,
            x_variable: x_variable.into(),
            y_variable: y_variable.into(),
            x_scale,
            y_scale,
            window,
            x: layout.x_mapping(x_scale)?.transform(),
            y: layout.value_mapping(y_scale)?.transform(),
            styles: Vec::new(),
        })
    }

    pub fn scales(&self) -> (NumericalScale, NumericalScale) {
        (self.x_scale, self.y_scale)
    }

    /// Only the x transform changes.
    pub fn set_x_scale(&mut self, scale: NumericalScale) -> Result<(), ScaleError> {
        self.x = self.layout.x_mapping(scale)?.transform();
        self.x_scale = scale;
        Ok(())
    }

    /// Only the y transform changes.
    pub fn set_y_scale(&mut self, scale: NumericalScale) -> Result<(), ScaleError> {
        self.y = self.layout.value_mapping(scale)?.transform();
        self.y_scale = scale;
        Ok(())
    }

    pub fn set_layout(&mut self, layout: PlotLayout) -> Result<(), ScaleError> {
        let x = layout.x_mapping(self.x_scale)?.transform();
        let y = layout.value_mapping(self.y_scale)?.transform();
        (self.layout, self.x, self.y) = (layout, x, y);
        Ok(())
    }

    /// Variables the backing fetcher must request for this view.
    pub fn variables(&self) -> Vec<String> {
        vec![self.x_variable.clone(), self.y_variable.clone()]
    }

    pub fn set_window(&mut self, time_start: Timestamp, time_end: Timestamp) {
        self.window = (time_start, time_end);
    }

    pub fn set_styles(&mut self, styles: Vec<GroupStyle>) {
        self.styles = styles;
    }

    /// Pixel points of every group, in group order.
    pub fn points(&self, chunks: &[Arc<Chunk>]) -> Vec<Vec<Point>> {
        let group_count = chunks.iter().map(|c| c.groups.len()).max().unwrap_or(0);
        let mut groups = vec![Vec::new(); group_count];
        for chunk in chunks {
            for (points, group) in groups.iter_mut().zip(&chunk.groups) {
                let (Some(xs), Some(ys)) = (group.variable(&self.x_variable), group.variable(&self.y_variable))
                else {
                    continue;
                };
                let range = group.window(self.window.0, self.window.1);
                points.extend(map_pairs(&xs[range.clone()], &ys[range], self.x, self.y));
            }
        }
        groups
    }

    pub fn draw(&self, surface: &mut dyn Surface, chunks: &[Arc<Chunk>]) {
        surface.clear();
        for (index, points) in self.points(chunks).into_iter().enumerate() {
            let style = self
                .styles
                .get(index)
                .cloned()
                .unwrap_or_else(|| GroupStyle::palette(index));
            let fill = Fill::new(style.color, style.opacity);
            for point in points {
                surface.circle(point, POINT_RADIUS, &fill);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunk::{ChunkGroup, ChunkKey};
    use crate::presentation::coordinates::Margins;
    use crate::presentation::surface::SvgSurface;
    use std::collections::BTreeMap;

    fn chunk(start: i64, pairs: &[(f64, f64)]) -> Arc<Chunk> {
        let t = (start..start + pairs.len() as i64).collect();
        let mut values = BTreeMap::new();
        values.insert("precip".to_string(), pairs.iter().map(|p| p.0).collect());
        values.insert("flow".to_string(), pairs.iter().map(|p| p.1).collect());
        Arc::new(Chunk {
            key: ChunkKey::new(start, start + 10),
            generation: 1,
            groups: vec![ChunkGroup { t, values }],
        })
    }

    fn view(window: (i64, i64)) -> ScatterView {
        let layout = PlotLayout::new(
            120.0,
            120.0,
            Margins {
                left: 10.0,
                right: 10.0,
                top: 10.0,
                bottom: 10.0,
            },
        );
        ScatterView::new(
            layout,
            "precip",
            NumericalScale::linear(0.0, 10.0),
            "flow",
            NumericalScale::linear(0.0, 10.0),
            window,
        )
        .unwrap()
    }

    #[test]
    fn test_points_within_window() {
        let chunks = vec![
            chunk(0, &[(0.0, 0.0), (5.0, 5.0), (f64::NAN, 1.0)]),
            chunk(10, &[(10.0, 10.0), (1.0, 1.0)]),
        ];
        let points = view((1, 10)).points(&chunks);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0], vec![Point::new(60.0, 60.0), Point::new(110.0, 10.0)]);
        assert_eq!(view((0, 1)).variables(), vec!["precip", "flow"]);
    }

    #[test]
    fn test_scale_and_layout_setters() {
        let chunks = vec![chunk(0, &[(5.0, 5.0)])];
        let mut view = view((0, 10));

        view.set_y_scale(NumericalScale::linear(0.0, 20.0)).unwrap();
        assert_eq!(view.points(&chunks)[0], vec![Point::new(60.0, 85.0)]);
        view.set_x_scale(NumericalScale::linear(5.0, 15.0)).unwrap();
        assert_eq!(view.points(&chunks)[0], vec![Point::new(10.0, 85.0)]);

        // A rejected scale leaves the view as it was.
        assert!(view.set_y_scale(NumericalScale::log(0.0, 10.0)).is_err());
        assert_eq!(view.scales().1, NumericalScale::linear(0.0, 20.0));

        let wide = PlotLayout::new(
            220.0,
            120.0,
            Margins {
                left: 10.0,
                right: 10.0,
                top: 10.0,
                bottom: 10.0,
            },
        );
        view.set_layout(wide).unwrap();
        assert_eq!(view.points(&chunks)[0], vec![Point::new(10.0, 85.0)]);
        view.set_x_scale(NumericalScale::linear(0.0, 10.0)).unwrap();
        assert_eq!(view.points(&chunks)[0], vec![Point::new(110.0, 85.0)]);
    }

    #[test]
    fn test_draw_circles() {
        let chunks = vec![chunk(0, &[(1.0, 2.0), (3.0, 4.0)])];
        let mut surface = SvgSurface::new(120.0, 120.0);
        view((0, 10)).draw(&mut surface, &chunks);
        assert_eq!(surface.element_count(), 2);
        assert!(surface.to_svg_string().contains(r#"r="2""#));
    }
}
