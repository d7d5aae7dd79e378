//! # Lens Graph
//!
//! Graph-based discovery over a corpus of lenses (named thinking frameworks).
//!
//! ## Features
//!
//! - **Journeys** - k shortest paths between two lenses
//! - **Bridges** - lenses that mediate between several inputs
//! - **Dialectics** - contrast pairs, triads and learning progressions
//! - **Coverage** - frame coverage and gap-aware random selection
//!
//! ## Architecture
//!
//! ```text
//! LensStore + EmbeddingSource
//!     │
//!     ├──> Graph Builder
//!     │      ├─ semantic edges (top-K cosine neighbours)
//!     │      ├─ frame edges (weight shrinks with frame size)
//!     │      ├─ temporal edges (adjacent episodes)
//!     │      ├─ concept edges (Jaccard overlap)
//!     │      └─ contrast pairs (detected + curated overrides)
//!     │
//!     ├──> LensGraph snapshot (immutable, petgraph multigraph)
//!     │
//!     └──> Queries (pure, concurrent)
//!            ├─ journey / bridges / neighborhood / centrality
//!            ├─ contrasts / triads / progression
//!            └─ coverage / biased_random / gap_suggestions
//! ```
//!
//! [`LensGraphService`] owns the active snapshot, rebuilds it on TTL expiry
//! or invalidation and swaps it in atomically.
//!
//! ```no_run
//! use lens_corpus::LensCorpus;
//! use lens_graph::{GraphConfig, LensGraphService};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let corpus = Arc::new(LensCorpus::load("lenses.json").await?);
//! let service = LensGraphService::start(corpus.clone(), corpus, GraphConfig::default().with_env()).await?;
//!
//! let graph = service.refresh().await;
//! for path in graph.journey("Pace Layering", "Kintsugi", None)?.paths {
//!     println!("{}", path.insight);
//! }
//! # Ok(())
//! # }
//! ```

mod bridges;
mod builder;
mod centrality;
mod config;
mod contrast;
mod coverage;
mod dialectic;
mod error;
mod explore;
mod graph;
mod paths;
mod resolve;
mod snapshot;
mod types;

pub use bridges::Bridge;
pub use builder::{BuildInputs, BuildReport, GraphBuilder};
pub use centrality::{CentralityMeasure, CentralityRanking, CentralityScore};
pub use config::{
    BridgeConfig, ContrastConfig, GraphConfig, NameConfig, SemanticConfig, SnapshotConfig,
    ENV_FUZZY_NAMES, ENV_SEMANTIC_TOP_K, ENV_SNAPSHOT_TTL_SECS,
};
pub use contrast::{DialecticScorer, KeywordScore, OpposingTermsScorer, RejectedOverride};
pub use coverage::{BiasedPick, CoverageReport, FrameCount, GapReport, GapSuggestion, SelectionTier};
pub use dialectic::{ContrastCoverage, ContrastScore, Progression, ProgressionStep, Triad};
pub use error::{GraphError, Result};
pub use explore::{Cluster, Recommendation};
pub use graph::{FrameSummary, LensGraph};
pub use paths::{HopRing, Journey, JourneyPath, NeighborEntry, Neighborhood, PathStep};
pub use snapshot::{LensGraphService, SnapshotHandle, SnapshotStatus};
pub use types::{ContrastOrigin, ContrastPair, EdgeKind, EdgeRecord, LensEdge};
