use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_SNAPSHOT_TTL_SECS: &str = "LENS_GRAPH_SNAPSHOT_TTL_SECS";
pub const ENV_FUZZY_NAMES: &str = "LENS_GRAPH_FUZZY_NAMES";
pub const ENV_SEMANTIC_TOP_K: &str = "LENS_GRAPH_SEMANTIC_TOP_K";

/// Tunables for graph construction and queries.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// journey_k = 5
///
/// [contrast]
/// min_score = 0.4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub semantic: SemanticConfig,

    /// Base weight of a frame edge; scaled by `2 / frame_size`
    pub frame_weight: f32,

    /// Fixed weight of edges between adjacent episodes
    pub temporal_weight: f32,

    pub contrast: ContrastConfig,

    pub bridge: BridgeConfig,

    /// Default number of paths returned by `journey`
    pub journey_k: usize,

    /// Shortest paths considered when shaping a progression
    pub progression_candidates: usize,

    pub names: NameConfig,

    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Nearest neighbours linked per lens
    pub top_k: usize,

    /// Cosine similarity below which no semantic edge is created
    pub min_similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Embedding distance band a contrast must fall in
    pub min_distance: f32,
    pub max_distance: f32,

    pub embedding_weight: f32,
    pub keyword_weight: f32,

    /// Detected pairs must score strictly above this
    pub min_score: f32,

    /// Score given to curated overrides without an explicit score
    pub curated_score: f32,

    /// Detected pairs must share a frame or a related concept
    pub require_shared_territory: bool,

    /// Fail the build when a lens ends up without any contrast
    pub enforce_coverage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub reach_weight: f32,
    pub link_weight: f32,
    pub concept_weight: f32,

    /// Bridges returned per query
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    /// Fall back to fuzzy name matching when no exact match exists
    pub fuzzy_fallback: bool,

    /// Minimum fuzzy score relative to a perfect match
    pub fuzzy_min_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub ttl_secs: u64,

    /// Wait before retrying after a failed rebuild
    pub retry_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            semantic: SemanticConfig::default(),
            frame_weight: 0.6,
            temporal_weight: 0.1,
            contrast: ContrastConfig::default(),
            bridge: BridgeConfig::default(),
            journey_k: 3,
            progression_candidates: 8,
            names: NameConfig::default(),
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.55,
        }
    }
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.65,
            max_distance: 0.92,
            embedding_weight: 0.7,
            keyword_weight: 0.3,
            min_score: 0.30,
            curated_score: 0.91,
            require_shared_territory: true,
            enforce_coverage: false,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reach_weight: 0.5,
            link_weight: 0.3,
            concept_weight: 0.2,
            max_results: 10,
        }
    }
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            fuzzy_fallback: true,
            fuzzy_min_score: 0.6,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            retry_secs: 30,
        }
    }
}

impl GraphConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| GraphError::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Apply `LENS_GRAPH_*` environment overrides. Unparseable values keep
    /// the current setting.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_SNAPSHOT_TTL_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.snapshot.ttl_secs = secs,
                Err(_) => log::warn!("Ignoring {ENV_SNAPSHOT_TTL_SECS}={raw:?}"),
            }
        }
        if let Some(raw) = lookup(ENV_FUZZY_NAMES) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.names.fuzzy_fallback = true,
                "0" | "false" | "no" | "off" => self.names.fuzzy_fallback = false,
                _ => log::warn!("Ignoring {ENV_FUZZY_NAMES}={raw:?}"),
            }
        }
        if let Some(raw) = lookup(ENV_SEMANTIC_TOP_K) {
            match raw.trim().parse::<usize>() {
                Ok(k) if k > 0 => self.semantic.top_k = k,
                _ => log::warn!("Ignoring {ENV_SEMANTIC_TOP_K}={raw:?}"),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        fn unit_weight(name: &str, value: f32) -> Result<()> {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(GraphError::InvalidInput(format!(
                    "{name} must be in (0, 1], got {value}"
                )))
            }
        }

        unit_weight("semantic.min_similarity", self.semantic.min_similarity)?;
        unit_weight("frame_weight", self.frame_weight)?;
        unit_weight("temporal_weight", self.temporal_weight)?;
        unit_weight("contrast.curated_score", self.contrast.curated_score)?;

        let c = &self.contrast;
        if c.curated_score <= c.min_score {
            return Err(GraphError::InvalidInput(format!(
                "contrast.curated_score {} must exceed contrast.min_score {}",
                c.curated_score, c.min_score
            )));
        }
        if !(0.0..=2.0).contains(&c.min_distance) || c.min_distance >= c.max_distance {
            return Err(GraphError::InvalidInput(format!(
                "contrast distance band [{}, {}] is empty",
                c.min_distance, c.max_distance
            )));
        }
        if (c.embedding_weight + c.keyword_weight - 1.0).abs() > 1e-3
            || c.embedding_weight < 0.0
            || c.keyword_weight < 0.0
        {
            return Err(GraphError::InvalidInput(
                "contrast.embedding_weight + contrast.keyword_weight must be 1".to_string(),
            ));
        }
        if self.semantic.top_k == 0 || self.journey_k == 0 || self.progression_candidates == 0 {
            return Err(GraphError::InvalidInput(
                "semantic.top_k, journey_k and progression_candidates must be positive"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot.ttl_secs)
    }

    pub fn snapshot_retry(&self) -> Duration {
        Duration::from_secs(self.snapshot.retry_secs)
    }
}
