use crate::builder::{BuildInputs, GraphBuilder};
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use lens_corpus::LensStore;
use lens_vector_store::EmbeddingSource;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Reference to one snapshot.
///
/// Holding a handle keeps its snapshot alive even after a rebuild swaps in
/// a newer one.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    graph: Arc<LensGraph>,
    generation: u64,
    degraded: bool,
}

impl SnapshotHandle {
    pub fn graph(&self) -> &Arc<LensGraph> {
        &self.graph
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The last rebuild failed and this is the previous good snapshot
    pub fn degraded(&self) -> bool {
        self.degraded
    }
}

impl Deref for SnapshotHandle {
    type Target = LensGraph;

    fn deref(&self) -> &LensGraph {
        &self.graph
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotStatus {
    pub generation: u64,
    pub age: Duration,
    pub invalidated: bool,
    pub degraded: bool,
    pub last_error: Option<String>,
}

struct Failure {
    at: Instant,
    message: String,
}

struct SnapshotState {
    graph: Arc<LensGraph>,
    generation: u64,
    built_at: Instant,
    invalidated: bool,
    /// Set by `invalidate` to bypass the retry backoff once
    force_retry: bool,
    last_failure: Option<Failure>,
}

impl SnapshotState {
    fn handle(&self) -> SnapshotHandle {
        SnapshotHandle {
            graph: Arc::clone(&self.graph),
            generation: self.generation,
            degraded: self.last_failure.is_some(),
        }
    }
}

/// Owns the active snapshot and rebuilds it from the collaborators.
///
/// Readers clone the current `Arc` and never wait on a rebuild. Rebuilds are
/// serialised; each one builds a complete new graph off the async runtime
/// and swaps it in at once. A failed rebuild leaves the old snapshot serving
/// and marks it degraded.
pub struct LensGraphService {
    store: Arc<dyn LensStore>,
    embeddings: Arc<dyn EmbeddingSource>,
    builder: GraphBuilder,
    state: RwLock<SnapshotState>,
    rebuild_lock: Mutex<()>,
}

impl LensGraphService {
    /// Build the first snapshot. Fails when it cannot be built, since there
    /// is nothing older to serve.
    pub async fn start(
        store: Arc<dyn LensStore>,
        embeddings: Arc<dyn EmbeddingSource>,
        config: GraphConfig,
    ) -> Result<Self> {
        Self::start_with(store, embeddings, GraphBuilder::new(config)).await
    }

    pub async fn start_with(
        store: Arc<dyn LensStore>,
        embeddings: Arc<dyn EmbeddingSource>,
        builder: GraphBuilder,
    ) -> Result<Self> {
        let started = Instant::now();
        let graph = build_snapshot(store.as_ref(), embeddings.as_ref(), &builder).await?;
        log::info!(
            "Lens graph generation 1 ready in {:?}",
            started.elapsed()
        );

        Ok(Self {
            store,
            embeddings,
            builder,
            state: RwLock::new(SnapshotState {
                graph: Arc::new(graph),
                generation: 1,
                built_at: Instant::now(),
                invalidated: false,
                force_retry: false,
                last_failure: None,
            }),
            rebuild_lock: Mutex::new(()),
        })
    }

    /// Active snapshot, without checking freshness
    pub fn snapshot(&self) -> SnapshotHandle {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handle()
    }

    /// Active snapshot, or `StaleSnapshot` when a rebuild is due
    pub(crate) fn check_fresh(&self) -> Result<SnapshotHandle> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.invalidated || state.built_at.elapsed() >= self.builder.config().snapshot_ttl() {
            return Err(GraphError::StaleSnapshot {
                generation: state.generation,
            });
        }
        Ok(state.handle())
    }

    /// Snapshot to answer queries with, rebuilding first when the TTL has
    /// expired or the snapshot was invalidated.
    ///
    /// Never fails: if the rebuild fails the previous snapshot is returned
    /// with its degraded flag set. After a failure, rebuilds are retried at
    /// most once per `snapshot.retry_secs`.
    pub async fn refresh(&self) -> SnapshotHandle {
        let generation = match self.check_fresh() {
            Ok(handle) => return handle,
            Err(GraphError::StaleSnapshot { generation }) => generation,
            Err(_) => return self.snapshot(),
        };

        if self.in_backoff() {
            return self.snapshot();
        }
        match self.rebuild_from(Some(generation)).await {
            Ok(handle) => handle,
            Err(_) => self.snapshot(),
        }
    }

    /// Rebuild now. On failure the old snapshot keeps serving and the error
    /// is returned.
    pub async fn rebuild(&self) -> Result<SnapshotHandle> {
        self.rebuild_from(None).await
    }

    /// Mark the active snapshot stale; the next `refresh` rebuilds it, even
    /// inside the retry backoff
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.invalidated = true;
        state.force_retry = true;
        log::debug!("Lens graph generation {} invalidated", state.generation);
    }

    pub fn status(&self) -> SnapshotStatus {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        SnapshotStatus {
            generation: state.generation,
            age: state.built_at.elapsed(),
            invalidated: state.invalidated,
            degraded: state.last_failure.is_some(),
            last_error: state.last_failure.as_ref().map(|f| f.message.clone()),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        self.builder.config()
    }

    /// Recently failed and not explicitly invalidated since
    fn in_backoff(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        !state.force_retry
            && state
                .last_failure
                .as_ref()
                .is_some_and(|f| f.at.elapsed() < self.builder.config().snapshot_retry())
    }

    /// Single-writer rebuild. With `seen`, skip the work when another caller
    /// already replaced that generation, or failed to, while we waited for
    /// the lock.
    async fn rebuild_from(&self, seen: Option<u64>) -> Result<SnapshotHandle> {
        let _guard = self.rebuild_lock.lock().await;

        if let Some(seen) = seen {
            let current = self.snapshot();
            if current.generation != seen {
                return Ok(current);
            }
            // A rebuild that failed while we waited starts a new backoff.
            if self.in_backoff() {
                return Ok(current);
            }
        }

        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .force_retry = false;

        let started = Instant::now();
        match build_snapshot(self.store.as_ref(), self.embeddings.as_ref(), &self.builder).await {
            Ok(graph) => {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                state.graph = Arc::new(graph);
                state.generation += 1;
                state.built_at = Instant::now();
                state.invalidated = false;
                state.last_failure = None;
                log::info!(
                    "Lens graph generation {} ready in {:?}",
                    state.generation,
                    started.elapsed()
                );
                Ok(state.handle())
            }
            Err(err) => {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                log::warn!(
                    "Lens graph rebuild failed, serving generation {} (degraded): {}",
                    state.generation,
                    err
                );
                state.last_failure = Some(Failure {
                    at: Instant::now(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

async fn build_snapshot(
    store: &dyn LensStore,
    embeddings: &dyn EmbeddingSource,
    builder: &GraphBuilder,
) -> Result<LensGraph> {
    let inputs = BuildInputs::fetch(store, embeddings).await?;
    let builder = builder.clone();
    tokio::task::spawn_blocking(move || builder.build_inputs(inputs))
        .await
        .map_err(|e| GraphError::BuildError(format!("Join error: {e}")))?
}
