// Statistical summaries consumed by the scale inference functions
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stdev: f64,
    #[serde(default)]
    pub count: u64,
}

impl ValueStats {
    pub fn new(min: f64, max: f64, mean: f64, stdev: f64) -> Self {
        Self {
            min,
            max,
            mean,
            stdev,
            count: 0,
        }
    }

    /// Summary of an empty selection: every moment is NaN and the count is 0.
    pub fn empty() -> Self {
        Self {
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
            stdev: f64::NAN,
            count: 0,
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 && !self.min.is_finite() && !self.max.is_finite()
    }
}

/// Single-pass accumulator using naive sum and sum of squares.
///
/// Non-finite samples are ignored.
#[derive(Debug, Clone, Copy)]
pub struct StatsAccumulator {
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for StatsAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Summary with the population standard deviation.
    pub fn finish(&self) -> ValueStats {
        self.summarize(self.count as f64)
    }

    /// Summary with the sample (n - 1) standard deviation, matching SQL
    /// `VARIANCE`. A single sample has zero spread.
    pub fn finish_sample(&self) -> ValueStats {
        self.summarize((self.count.max(2) - 1) as f64)
    }

    fn summarize(&self, dof: f64) -> ValueStats {
        if self.count == 0 {
            return ValueStats::empty();
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        // Rounding can push the difference slightly below zero.
        let variance = ((self.sum_sq - n * mean * mean) / dof).max(0.0);
        ValueStats {
            min: self.min,
            max: self.max,
            mean,
            stdev: variance.sqrt(),
            count: self.count,
        }
    }
}

impl Extend<f64> for StatsAccumulator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

/// Combine the current-view summaries of several plots sharing one axis.
///
/// Extrema are combined exactly; mean and stdev are plain averages of the
/// inputs. Empty summaries are skipped.
pub fn merge_stats(stats: &[ValueStats]) -> ValueStats {
    let present: Vec<&ValueStats> = stats.iter().filter(|s| !s.is_empty()).collect();
    if present.is_empty() {
        return ValueStats::empty();
    }
    let n = present.len() as f64;
    ValueStats {
        min: present.iter().map(|s| s.min).fold(f64::INFINITY, f64::min),
        max: present.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max),
        mean: present.iter().map(|s| s.mean).sum::<f64>() / n,
        stdev: present.iter().map(|s| s.stdev).sum::<f64>() / n,
        count: present.iter().map(|s| s.count).sum(),
    }
}
