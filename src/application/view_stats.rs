// View statistics - live summaries over the cached chunks of the current window
use crate::domain::chunk::Chunk;
use crate::domain::granularity::Timestamp;
use crate::domain::stats::{StatsAccumulator, ValueStats};
use std::borrow::Borrow;

/// Summarize `variable` over every cached sample with
/// `time_start <= t <= time_end`, across all groups.
///
/// Uses naive sum / sum-of-squares accumulation and the population stdev.
/// Missing (non-finite) samples are skipped. An empty window yields
/// `ValueStats::empty()` with `count == 0`.
pub fn compute_view_stats<C: Borrow<Chunk>>(
    chunks: &[C],
    time_start: Timestamp,
    time_end: Timestamp,
    variable: &str,
) -> ValueStats {
    let mut acc = StatsAccumulator::new();
    for chunk in chunks {
        for group in &chunk.borrow().groups {
            let Some(values) = group.variable(variable) else {
                continue;
            };
            let window = group.window(time_start, time_end);
            acc.extend(values[window].iter().copied());
        }
    }
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chunk::{ChunkGroup, ChunkKey};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn chunk(start: i64, t: Vec<i64>, flow: Vec<f64>) -> Chunk {
        let mut values = BTreeMap::new();
        values.insert("flow".to_string(), flow);
        Chunk {
            key: ChunkKey::new(start, start + 100),
            generation: 1,
            groups: vec![ChunkGroup { t, values }],
        }
    }

    #[test]
    fn test_empty_window() {
        let chunks: Vec<Arc<Chunk>> = Vec::new();
        let stats = compute_view_stats(&chunks, 0, 100, "x");
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn test_restricts_to_window_across_chunks() {
        let chunks = vec![
            Arc::new(chunk(0, vec![10, 50, 90], vec![100.0, 1.0, 3.0])),
            Arc::new(chunk(100, vec![110, 150], vec![5.0, 100.0])),
        ];
        let stats = compute_view_stats(&chunks, 50, 110, "flow");
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert!((stats.stdev - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_skips_missing_samples_and_unknown_variable() {
        let chunks = vec![chunk(0, vec![1, 2, 3], vec![2.0, f64::NAN, 4.0])];
        let stats = compute_view_stats(&chunks, 0, 10, "flow");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(compute_view_stats(&chunks, 0, 10, "evap").count, 0);
    }
}
