// Chunks - immutable, time-aligned blocks of fetched samples
use crate::domain::granularity::Timestamp;
use crate::domain::records::VariableRow;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// Half-open interval `[time_start, time_end)` aligned to the fetcher's
/// range size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkKey {
    pub time_start: Timestamp,
    pub time_end: Timestamp,
}

impl ChunkKey {
    pub fn new(time_start: Timestamp, time_end: Timestamp) -> Self {
        Self {
            time_start,
            time_end,
        }
    }

    /// Key of the `index`-th chunk of width `range_size`.
    pub fn aligned(index: i64, range_size: i64) -> Self {
        let time_start = index.saturating_mul(range_size);
        Self::new(time_start, time_start.saturating_add(range_size))
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.time_start && t < self.time_end
    }

    /// Whether this chunk shares any instant with the closed window
    /// `[time_start, time_end]`.
    pub fn overlaps(&self, time_start: Timestamp, time_end: Timestamp) -> bool {
        self.time_start <= time_end && time_start < self.time_end
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.time_start, self.time_end)
    }
}

/// Columnar samples of one group: a time array plus one equally long array
/// per variable, ordered by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkGroup {
    pub t: Vec<Timestamp>,
    pub values: BTreeMap<String, Vec<f64>>,
}

impl ChunkGroup {
    /// Convert backing-store rows, keeping only buckets owned by `key`.
    pub fn from_rows(rows: &[VariableRow], variables: &[String], key: ChunkKey) -> Self {
        let mut owned: Vec<&VariableRow> = rows.iter().filter(|row| key.contains(row.t)).collect();
        owned.sort_by_key(|row| row.t);

        let t = owned.iter().map(|row| row.t).collect();
        let values = variables
            .iter()
            .map(|name| (name.clone(), owned.iter().map(|row| row.value(name)).collect()))
            .collect();
        Self { t, values }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn variable(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Index range of samples with `time_start <= t <= time_end`.
    pub fn window(&self, time_start: Timestamp, time_end: Timestamp) -> Range<usize> {
        let lo = self.t.partition_point(|&t| t < time_start);
        let hi = self.t.partition_point(|&t| t <= time_end);
        lo..hi.max(lo)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub key: ChunkKey,
    /// Fetcher generation the data was fetched under.
    pub generation: u64,
    pub groups: Vec<ChunkGroup>,
}

impl Chunk {
    pub fn id(&self) -> String {
        self.key.to_string()
    }

    pub fn time_start(&self) -> Timestamp {
        self.key.time_start
    }

    pub fn time_end(&self) -> Timestamp {
        self.key.time_end
    }

    pub fn group(&self, index: usize) -> Option<&ChunkGroup> {
        self.groups.get(index)
    }
}
