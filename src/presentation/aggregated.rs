// Aggregated renderer - mean line and stdev envelope over the time of year
use crate::domain::granularity::Granularity;
use crate::domain::records::AggregatedRow;
use crate::domain::scale::{AxisTransform, NumericalScale, ScaleError, ScaleMapping};
use crate::presentation::coordinates::PlotLayout;
use crate::presentation::surface::{Fill, Point, Stroke, Surface};
use crate::presentation::timeseries::GroupStyle;

const ENVELOPE_OPACITY: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedPaths {
    pub mean: Vec<Point>,
    /// Closed polygon through mean + stdev forwards and mean - stdev
    /// backwards. Empty on log scales.
    pub envelope: Vec<Point>,
}

/// X scale of an aggregated plot. Years have no cycle, so their scale
/// spans the years present in `rows`.
pub fn aggregated_x_scale(aggregation: Granularity, rows: &[Vec<AggregatedRow>]) -> NumericalScale {
    if let Some((min, max)) = aggregation.cyclic_domain() {
        return NumericalScale::linear(min, max);
    }
    let years = rows.iter().flatten().map(|row| row.t as f64);
    let min = years.clone().fold(f64::INFINITY, f64::min);
    let max = years.fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() {
        NumericalScale::default()
    } else if min == max {
        NumericalScale::linear(min - 1.0, max + 1.0)
    } else {
        NumericalScale::linear(min, max)
    }
}

pub fn envelope_paths(rows: &[AggregatedRow], variable: &str, x: AxisTransform, y: &ScaleMapping) -> AggregatedPaths {
    let stats: Vec<(f64, f64, f64)> = rows
        .iter()
        .filter_map(|row| {
            let s = row.variables.get(variable)?;
            Some((x.apply(row.t as f64), s.mean, s.stdev))
        })
        .collect();
    let finite = |p: &Point| p.is_finite();

    let mean = stats
        .iter()
        .map(|&(px, mean, _)| Point::new(px, y.apply(mean)))
        .filter(finite)
        .collect();
    let envelope = if y.scale().log {
        Vec::new()
    } else {
        let upper = stats.iter().map(|&(px, mean, sd)| Point::new(px, y.apply(mean + sd)));
        let lower = stats.iter().rev().map(|&(px, mean, sd)| Point::new(px, y.apply(mean - sd)));
        upper.chain(lower).filter(finite).collect()
    };
    AggregatedPaths { mean, envelope }
}

/// Draw every group's envelope and mean line.
pub fn draw_aggregated(
    surface: &mut dyn Surface,
    layout: &PlotLayout,
    aggregation: Granularity,
    rows: &[Vec<AggregatedRow>],
    variable: &str,
    scale: NumericalScale,
    styles: &[GroupStyle],
) -> Result<(), ScaleError> {
    let x = layout.x_mapping(aggregated_x_scale(aggregation, rows))?.transform();
    let y = layout.value_mapping(scale)?;
    surface.clear();
    for (index, group) in rows.iter().enumerate() {
        let style = styles.get(index).cloned().unwrap_or_else(|| GroupStyle::palette(index));
        let paths = envelope_paths(group, variable, x, &y);
        surface.fill_path(&paths.envelope, &Fill::new(style.color.clone(), ENVELOPE_OPACITY));
        surface.stroke_path(
            &paths.mean,
            &Stroke::new(style.color, style.line_width).with_opacity(style.opacity),
        );
    }
    Ok(())
}
