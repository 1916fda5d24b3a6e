// Chunk fetcher - time-aligned chunk cache with generation-guarded invalidation
use crate::application::data_repository::DataRepository;
use crate::domain::chunk::{Chunk, ChunkGroup, ChunkKey};
use crate::domain::granularity::{Granularity, Timestamp};
use crate::domain::query::{
    replace_if_changed, DataFilter, DataGroups, ParameterChange, QueryParameters,
};
use futures::future::join_all;
use futures::Stream;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Buckets per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_LENGTH: i64 = 2000;
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherEvent {
    /// At least one chunk was cached under `generation`.
    Updated { generation: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("backing query failed for table {table}, chunk {chunk}")]
    BackingQuery {
        table: String,
        chunk: ChunkKey,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkOutcome {
    Cached { generation: u64 },
    AlreadyKnown,
    Discarded,
}

#[derive(Default)]
struct FetcherState {
    params: QueryParameters,
    generation: u64,
    cache: HashMap<ChunkKey, Arc<Chunk>>,
    in_flight: HashSet<ChunkKey>,
}

impl FetcherState {
    fn invalidate(&mut self) {
        self.cache.clear();
        self.in_flight.clear();
        self.generation += 1;
    }
}

/// Fetches one table's data in fixed-size time chunks for the query
/// parameters currently configured, caching every chunk until a parameter
/// changes.
///
/// All methods take `&self`; the fetcher is meant to be shared behind an
/// `Arc` between the task issuing requests and the code reacting to
/// parameter changes.
pub struct ChunkFetcher {
    repository: Arc<dyn DataRepository>,
    table: String,
    chunk_length: i64,
    state: Mutex<FetcherState>,
    events: broadcast::Sender<FetcherEvent>,
}

impl ChunkFetcher {
    pub fn new(repository: Arc<dyn DataRepository>, table: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            repository,
            table: table.into(),
            chunk_length: DEFAULT_CHUNK_LENGTH,
            state: Mutex::new(FetcherState::default()),
            events,
        }
    }

    pub fn with_chunk_length(mut self, chunk_length: i64) -> Self {
        self.chunk_length = chunk_length.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn parameters(&self) -> QueryParameters {
        self.state().params.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FetcherEvent> {
        self.events.subscribe()
    }

    /// Update events as a stream. Lagging receivers skip missed events,
    /// which is harmless since every event means "re-read the cache".
    pub fn updates(&self) -> impl Stream<Item = FetcherEvent> + Send + use<> {
        let mut rx = self.events.subscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Fetcher update stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    pub fn set_variables(&self, variables: Vec<String>) -> ParameterChange {
        self.update_parameters("variables", |p| replace_if_changed(&mut p.variables, variables))
    }

    pub fn set_granularity(&self, granularity: Granularity) -> ParameterChange {
        self.update_parameters("granularity", |p| replace_if_changed(&mut p.granularity, granularity))
    }

    pub fn set_groups(&self, groups: DataGroups) -> ParameterChange {
        self.update_parameters("groups", |p| replace_if_changed(&mut p.groups, groups))
    }

    pub fn set_filter(&self, filter: Option<DataFilter>) -> ParameterChange {
        self.update_parameters("filter", |p| replace_if_changed(&mut p.filter, filter))
    }

    /// Replace every parameter at once, invalidating at most once.
    pub fn set_parameters(&self, params: QueryParameters) -> ParameterChange {
        self.update_parameters("parameters", |p| replace_if_changed(p, params))
    }

    fn update_parameters<F>(&self, name: &str, apply: F) -> ParameterChange
    where
        F: FnOnce(&mut QueryParameters) -> ParameterChange,
    {
        let mut state = self.state();
        let change = apply(&mut state.params);
        if change.is_changed() {
            let dropped = state.cache.len();
            state.invalidate();
            tracing::debug!(
                table = %self.table,
                parameter = name,
                generation = state.generation,
                dropped,
                "Query parameter changed, chunk cache cleared"
            );
        }
        change
    }

    /// Drop every cached chunk and orphan outstanding fetches.
    pub fn clear(&self) {
        self.state().invalidate();
    }

    pub fn range_size(&self) -> i64 {
        self.state().params.granularity.range_size(self.chunk_length)
    }

    /// Aligned chunk keys covering the closed window `[time_start, time_end]`.
    pub fn chunk_keys_for(&self, time_start: Timestamp, time_end: Timestamp) -> Vec<ChunkKey> {
        if time_end < time_start {
            return Vec::new();
        }
        let range_size = self.range_size();
        let first = time_start.div_euclid(range_size);
        let last = time_end.div_euclid(range_size);
        (first..=last)
            .map(|index| ChunkKey::aligned(index, range_size))
            .collect()
    }

    /// Fetch every chunk of the window that is neither cached nor in flight.
    ///
    /// Chunk queries run concurrently. Returns whether any chunk was newly
    /// cached under the current generation, in which case one `Updated`
    /// event has been emitted. Chunks whose generation was cleared while
    /// siblings were still loading do not count. A failed
    /// chunk leaves the cache untouched and is retried by the next request;
    /// the first failure is returned once all sibling chunks have settled.
    pub async fn request(&self, time_start: Timestamp, time_end: Timestamp) -> Result<bool, FetchError> {
        let keys = self.chunk_keys_for(time_start, time_end);
        let results = join_all(keys.into_iter().map(|key| self.fetch_chunk(key))).await;

        let mut cached = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(ChunkOutcome::Cached { generation }) => cached.push(generation),
                Ok(ChunkOutcome::AlreadyKnown | ChunkOutcome::Discarded) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        let generation = self.generation();
        let updated = cached.contains(&generation);
        if updated {
            // No subscribers is fine; the cache is still readable.
            let _ = self.events.send(FetcherEvent::Updated { generation });
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(updated),
        }
    }

    async fn fetch_chunk(&self, key: ChunkKey) -> Result<ChunkOutcome, FetchError> {
        let (generation, params) = {
            let mut state = self.state();
            if state.cache.contains_key(&key) || state.in_flight.contains(&key) {
                return Ok(ChunkOutcome::AlreadyKnown);
            }
            state.in_flight.insert(key);
            (state.generation, state.params.clone())
        };

        tracing::debug!(table = %self.table, chunk = %key, generation, "Fetching chunk");
        let filter = params
            .filter
            .clone()
            .unwrap_or_default()
            .with_time_range(key.time_start, key.time_end - 1);
        let result = self
            .repository
            .query_variables(
                &self.table,
                params.granularity,
                &params.variables,
                Some(&params.groups),
                Some(&filter),
            )
            .await;

        // Generation check and cache write under one lock.
        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(
                table = %self.table,
                chunk = %key,
                requested = generation,
                current = state.generation,
                "Discarding stale chunk"
            );
            return Ok(ChunkOutcome::Discarded);
        }
        state.in_flight.remove(&key);

        match result {
            Ok(rows) => {
                let groups = (0..params.groups.len())
                    .map(|i| {
                        rows.get(i)
                            .map(|group_rows| ChunkGroup::from_rows(group_rows, &params.variables, key))
                            .unwrap_or_default()
                    })
                    .collect();
                state.cache.insert(
                    key,
                    Arc::new(Chunk {
                        key,
                        generation,
                        groups,
                    }),
                );
                tracing::debug!(table = %self.table, chunk = %key, generation, "Chunk cached");
                Ok(ChunkOutcome::Cached { generation })
            }
            Err(source) => {
                tracing::warn!(table = %self.table, chunk = %key, "Chunk query failed: {:#}", source);
                Err(FetchError::BackingQuery {
                    table: self.table.clone(),
                    chunk: key,
                    source,
                })
            }
        }
    }

    /// Cached chunks overlapping `[time_start, time_end]`, ordered by start.
    /// Never triggers a fetch.
    pub fn get_chunks(&self, time_start: Timestamp, time_end: Timestamp) -> Vec<Arc<Chunk>> {
        let state = self.state();
        let mut chunks: Vec<Arc<Chunk>> = state
            .cache
            .values()
            .filter(|chunk| chunk.key.overlaps(time_start, time_end))
            .cloned()
            .collect();
        chunks.sort_by_key(|chunk| chunk.key.time_start);
        chunks
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.state().cache.len()
    }

    fn state(&self) -> MutexGuard<'_, FetcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
