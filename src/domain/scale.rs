// Numerical scales - statistical auto-scaling and domain-to-pixel mappings
use crate::domain::stats::ValueStats;
use serde::{Deserialize, Serialize};

/// Tick count used when rounding a domain outward to nice boundaries.
const NICE_TICK_COUNT: f64 = 10.0;
const NICE_MAX_ITERATIONS: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScaleError {
    #[error("invalid scale domain [{min}, {max}]: min must be finite and strictly below max")]
    InvalidDomain { min: f64, max: f64 },
    #[error("log scale domain [{min}, {max}] must be strictly positive")]
    NonPositiveLogBound { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericalScale {
    pub domain_min: f64,
    pub domain_max: f64,
    #[serde(default)]
    pub log: bool,
}

impl Default for NumericalScale {
    fn default() -> Self {
        Self::linear(0.0, 1.0)
    }
}

impl NumericalScale {
    pub fn linear(domain_min: f64, domain_max: f64) -> Self {
        Self {
            domain_min,
            domain_max,
            log: false,
        }
    }

    pub fn log(domain_min: f64, domain_max: f64) -> Self {
        Self {
            domain_min,
            domain_max,
            log: true,
        }
    }

    pub fn validate(&self) -> Result<(), ScaleError> {
        let (min, max) = (self.domain_min, self.domain_max);
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ScaleError::InvalidDomain { min, max });
        }
        if self.log && min <= 0.0 {
            return Err(ScaleError::NonPositiveLogBound { min, max });
        }
        Ok(())
    }

    /// Round the domain outward to nice tick boundaries. The result is
    /// always linear.
    pub fn nice(&self) -> Self {
        let (min, max) = nice_domain(self.domain_min, self.domain_max);
        Self::linear(min, max)
    }
}

/// Choose a display domain from a statistical summary of the whole series.
pub fn auto_scale(stats: &ValueStats, nice: bool) -> NumericalScale {
    let scale = if let Some(degenerate) = degenerate_scale(stats) {
        degenerate
    } else if stats.min < 0.0 {
        NumericalScale::linear(-stats.stdev * 5.0, stats.stdev * 5.0)
    } else if stats.mean > stats.stdev * 10.0 {
        NumericalScale::linear(stats.mean - stats.stdev * 5.0, stats.mean + stats.stdev * 5.0)
    } else {
        NumericalScale::linear(0.0, stats.mean + stats.stdev * 5.0)
    };
    finish(scale, stats, nice)
}

/// Choose a domain that exactly bounds the values currently in view. Used
/// after the user zoomed or panned.
pub fn auto_scale_conservative(stats: &ValueStats, nice: bool) -> NumericalScale {
    let scale = if let Some(degenerate) = degenerate_scale(stats) {
        degenerate
    } else if stats.min < 0.0 {
        let r = stats.min.abs().max(stats.max.abs());
        NumericalScale::linear(-r, r)
    } else if stats.min - stats.stdev * 5.0 > 0.0 {
        NumericalScale::linear(stats.min, stats.max)
    } else {
        NumericalScale::linear(0.0, stats.max)
    };
    finish(scale, stats, nice)
}

fn degenerate_scale(stats: &ValueStats) -> Option<NumericalScale> {
    if !stats.min.is_finite() || !stats.max.is_finite() {
        return Some(NumericalScale::default());
    }
    if stats.min == stats.max {
        return Some(NumericalScale::linear(stats.min - 1.0, stats.min + 1.0));
    }
    None
}

fn finish(mut scale: NumericalScale, stats: &ValueStats, nice: bool) -> NumericalScale {
    // A zero or non-finite spread collapses the statistical branches.
    if scale.validate().is_err() {
        scale = NumericalScale::linear(stats.min, stats.max);
    }
    if nice { scale.nice() } else { scale }
}

/// Extend `[min, max]` outward so both ends land on a tick of a 1-2-5 step
/// sequence with roughly ten ticks.
pub fn nice_domain(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (min, max);
    }
    let reversed = max < min;
    let (mut start, mut stop) = if reversed { (max, min) } else { (min, max) };
    let mut previous: Option<TickStep> = None;
    for _ in 0..NICE_MAX_ITERATIONS {
        let Some(step) = tick_step(start, stop) else {
            break;
        };
        if previous == Some(step) {
            break;
        }
        (start, stop) = step.extend(start, stop);
        previous = Some(step);
    }
    if reversed { (stop, start) } else { (start, stop) }
}

/// Tick spacing expressed either as a multiple of a power of ten, or for
/// sub-unit steps as the reciprocal, so rounding stays exact in decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TickStep {
    Multiple(f64),
    Fraction(f64),
}

impl TickStep {
    fn extend(&self, start: f64, stop: f64) -> (f64, f64) {
        match *self {
            TickStep::Multiple(step) => ((start / step).floor() * step, (stop / step).ceil() * step),
            TickStep::Fraction(inverse) => {
                ((start * inverse).floor() / inverse, (stop * inverse).ceil() / inverse)
            }
        }
    }
}

fn tick_step(start: f64, stop: f64) -> Option<TickStep> {
    let raw = (stop - start) / NICE_TICK_COUNT;
    if !(raw > 0.0) || !raw.is_finite() {
        return None;
    }
    let power = raw.log10().floor();
    let error = raw / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        Some(TickStep::Multiple(factor * 10f64.powf(power)))
    } else {
        Some(TickStep::Fraction(10f64.powf(-power) / factor))
    }
}

/// Affine map `pixel = k * f(value) + b` where `f` is the identity or the
/// natural log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTransform {
    pub k: f64,
    pub b: f64,
    pub log: bool,
}

impl AxisTransform {
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        let v = if self.log { value.ln() } else { value };
        self.k * v + self.b
    }

    #[inline]
    pub fn invert(&self, pixel: f64) -> f64 {
        let v = (pixel - self.b) / self.k;
        if self.log { v.exp() } else { v }
    }
}

/// Monotonic, invertible mapping from a validated scale domain onto a pixel
/// range. The range may be reversed (e.g. a y axis growing upwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMapping {
    scale: NumericalScale,
    range: (f64, f64),
    transform: AxisTransform,
}

impl ScaleMapping {
    pub fn new(scale: NumericalScale, range: (f64, f64)) -> Result<Self, ScaleError> {
        scale.validate()?;
        let f = |v: f64| if scale.log { v.ln() } else { v };
        let (d0, d1) = (f(scale.domain_min), f(scale.domain_max));
        let k = (range.1 - range.0) / (d1 - d0);
        let b = range.0 - k * d0;
        Ok(Self {
            scale,
            range,
            transform: AxisTransform { k, b, log: scale.log },
        })
    }

    pub fn scale(&self) -> &NumericalScale {
        &self.scale
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.scale.domain_min, self.scale.domain_max)
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn transform(&self) -> AxisTransform {
        self.transform
    }

    pub fn apply(&self, value: f64) -> f64 {
        self.transform.apply(value)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        self.transform.invert(pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(min: f64, max: f64, mean: f64, stdev: f64) -> ValueStats {
        ValueStats::new(min, max, mean, stdev)
    }

    #[test]
    fn test_auto_scale_degenerate() {
        let scale = auto_scale(&stats(5.0, 5.0, 5.0, 0.0), false);
        assert_eq!(scale, NumericalScale::linear(4.0, 6.0));
        assert_eq!(auto_scale(&stats(5.0, 5.0, 5.0, 0.0), true), NumericalScale::linear(4.0, 6.0));
    }

    #[test]
    fn test_auto_scale_straddling_zero() {
        let scale = auto_scale(&stats(-2.0, 10.0, 3.0, 1.0), false);
        assert_eq!(scale, NumericalScale::linear(-5.0, 5.0));
        assert_eq!(auto_scale(&stats(-2.0, 10.0, 3.0, 1.0), true), NumericalScale::linear(-5.0, 5.0));
    }

    #[test]
    fn test_auto_scale_clustered_above_zero() {
        let scale = auto_scale(&stats(90.0, 110.0, 100.0, 2.0), false);
        assert_eq!(scale, NumericalScale::linear(90.0, 110.0));
    }

    #[test]
    fn test_auto_scale_anchored_at_zero() {
        let scale = auto_scale(&stats(0.0, 30.0, 4.0, 3.0), false);
        assert_eq!(scale, NumericalScale::linear(0.0, 19.0));
        let nice = auto_scale(&stats(0.0, 30.0, 4.0, 3.0), true);
        assert_eq!(nice, NumericalScale::linear(0.0, 20.0));
        assert!(!nice.log);
    }

    #[test]
    fn test_auto_scale_empty_stats() {
        assert_eq!(auto_scale(&ValueStats::empty(), true), NumericalScale::default());
    }

    #[test]
    fn test_conservative_exact_bounds() {
        let scale = auto_scale_conservative(&stats(2.0, 8.0, 5.0, 0.1), false);
        assert_eq!(scale, NumericalScale::linear(2.0, 8.0));
    }

    #[test]
    fn test_conservative_symmetric_and_zero_anchored() {
        let symmetric = auto_scale_conservative(&stats(-3.0, 7.0, 1.0, 2.0), false);
        assert_eq!(symmetric, NumericalScale::linear(-7.0, 7.0));
        let anchored = auto_scale_conservative(&stats(1.0, 8.0, 4.0, 2.0), false);
        assert_eq!(anchored, NumericalScale::linear(0.0, 8.0));
    }

    #[test]
    fn test_zero_spread_falls_back_to_extrema() {
        let scale = auto_scale(&stats(-1.0, 3.0, 1.0, 0.0), false);
        assert_eq!(scale, NumericalScale::linear(-1.0, 3.0));
    }

    #[test]
    fn test_nice_domain() {
        assert_eq!(nice_domain(0.0, 19.0), (0.0, 20.0));
        assert_eq!(nice_domain(0.13, 0.97), (0.1, 1.0));
        assert_eq!(nice_domain(-4.3, 9.2), (-6.0, 10.0));
        assert_eq!(nice_domain(10.0, 0.0), (10.0, 0.0));
    }

    #[test]
    fn test_validate() {
        assert!(NumericalScale::linear(1.0, 1.0).validate().is_err());
        assert!(NumericalScale::linear(f64::NAN, 1.0).validate().is_err());
        assert_eq!(
            NumericalScale::log(0.0, 10.0).validate(),
            Err(ScaleError::NonPositiveLogBound { min: 0.0, max: 10.0 })
        );
        assert!(NumericalScale::log(0.1, 10.0).validate().is_ok());
    }

    #[test]
    fn test_linear_mapping_round_trip() {
        let mapping = ScaleMapping::new(NumericalScale::linear(0.0, 10.0), (100.0, 0.0)).unwrap();
        assert_eq!(mapping.apply(0.0), 100.0);
        assert_eq!(mapping.apply(10.0), 0.0);
        assert_eq!(mapping.apply(2.5), 75.0);
        assert_eq!(mapping.invert(75.0), 2.5);
    }

    #[test]
    fn test_log_mapping() {
        let mapping = ScaleMapping::new(NumericalScale::log(1.0, 100.0), (0.0, 200.0)).unwrap();
        assert!((mapping.apply(10.0) - 100.0).abs() < 1e-9);
        assert!((mapping.invert(100.0) - 10.0).abs() < 1e-9);
        assert!(!mapping.apply(0.0).is_finite());
        assert!(mapping.apply(-1.0).is_nan());
    }

    #[test]
    fn test_log_mapping_rejects_non_positive_domain() {
        let result = ScaleMapping::new(NumericalScale::log(-1.0, 10.0), (0.0, 1.0));
        assert!(matches!(result, Err(ScaleError::NonPositiveLogBound { .. })));
    }
}
