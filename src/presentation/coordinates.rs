// Coordinate mapping - plot layout and sample-to-pixel conversion
use crate::domain::granularity::Timestamp;
use crate::domain::scale::{AxisTransform, NumericalScale, ScaleError, ScaleMapping};
use crate::presentation::surface::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 80.0,
            right: 20.0,
            top: 20.0,
            bottom: 30.0,
        }
    }
}

/// Size of a plot and the margins reserved for its axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotLayout {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
}

impl PlotLayout {
    pub fn new(width: f64, height: f64, margins: Margins) -> Self {
        Self { width, height, margins }
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.margins.left, self.width - self.margins.right)
    }

    /// Pixel y grows downwards, so the range is reversed.
    pub fn y_range(&self) -> (f64, f64) {
        (self.height - self.margins.bottom, self.margins.top)
    }

    /// Linear mapping of the time window onto the x range.
    pub fn time_mapping(&self, time_start: Timestamp, time_end: Timestamp) -> Result<ScaleMapping, ScaleError> {
        ScaleMapping::new(
            NumericalScale::linear(time_start as f64, time_end as f64),
            self.x_range(),
        )
    }

    pub fn x_mapping(&self, scale: NumericalScale) -> Result<ScaleMapping, ScaleError> {
        ScaleMapping::new(scale, self.x_range())
    }

    pub fn value_mapping(&self, scale: NumericalScale) -> Result<ScaleMapping, ScaleError> {
        ScaleMapping::new(scale, self.y_range())
    }
}

/// Pixel points of a time series. Samples whose pixel position is not
/// finite (missing values, log of non-positive values) are dropped.
pub fn map_samples(t: &[Timestamp], values: &[f64], x: AxisTransform, y: AxisTransform) -> Vec<Point> {
    t.iter()
        .zip(values)
        .map(|(&t, &v)| Point::new(x.apply(t as f64), y.apply(v)))
        .filter(Point::is_finite)
        .collect()
}

/// Pixel points of paired values, e.g. two variables of one sample.
pub fn map_pairs(xs: &[f64], ys: &[f64], x: AxisTransform, y: AxisTransform) -> Vec<Point> {
    xs.iter()
        .zip(ys)
        .map(|(&a, &b)| Point::new(x.apply(a), y.apply(b)))
        .filter(Point::is_finite)
        .collect()
}
