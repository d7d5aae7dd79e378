use serde::{Deserialize, Serialize};
use std::fmt;

/// Relation carried by an edge of the lens graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Nearest neighbours in embedding space
    Semantic,

    /// Both lenses belong to the same frame
    Frame,

    /// Lenses from adjacent episodes
    Temporal,

    /// Overlapping related concepts
    Concept,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 4] = [
        EdgeKind::Semantic,
        EdgeKind::Frame,
        EdgeKind::Temporal,
        EdgeKind::Concept,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Semantic => "semantic",
            EdgeKind::Frame => "frame",
            EdgeKind::Temporal => "temporal",
            EdgeKind::Concept => "concept",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge in the lens graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensEdge {
    pub kind: EdgeKind,

    /// Strength in (0, 1]
    pub weight: f32,

    /// Frame id or shared concepts behind the edge
    pub via: Option<String>,
}

/// Where a contrast pair came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastOrigin {
    Detected,
    Curated,
}

/// Two lenses in productive tension, seen from `lens_a`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastPair {
    pub lens_a: String,
    pub lens_b: String,
    pub embedding_distance: f32,
    pub dialectic_score: f32,
    pub insight: String,
    pub origin: ContrastOrigin,
}

/// Flat view of one edge, endpoints ordered by lens id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f32,
}
