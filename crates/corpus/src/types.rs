use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named thinking framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    /// Stable identifier (e.g., "lens_kintsugi")
    pub id: String,

    /// Display name (e.g., "Kintsugi")
    pub name: String,

    /// One-paragraph definition
    #[serde(default)]
    pub definition: String,

    /// Worked examples
    #[serde(default)]
    pub examples: Vec<String>,

    /// Episode the lens was introduced in
    #[serde(default)]
    pub episode: u32,

    /// Frame ids this lens belongs to
    #[serde(default, alias = "frame_ids")]
    pub frames: BTreeSet<String>,

    /// Free-form related concepts
    #[serde(default)]
    pub related_concepts: BTreeSet<String>,

    /// Precomputed embedding (empty when supplied by a separate source)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Lens {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            definition: String::new(),
            examples: Vec::new(),
            episode: 0,
            frames: BTreeSet::new(),
            related_concepts: BTreeSet::new(),
            embedding: Vec::new(),
        }
    }

    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = definition.into();
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn episode(mut self, episode: u32) -> Self {
        self.episode = episode;
        self
    }

    pub fn frame(mut self, frame_id: impl Into<String>) -> Self {
        self.frames.insert(frame_id.into());
        self
    }

    pub fn concept(mut self, concept: impl Into<String>) -> Self {
        self.related_concepts.insert(concept.into());
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Thematic grouping of lenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Member lens ids
    #[serde(default)]
    pub lens_ids: Vec<String>,
}

impl Frame {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            lens_ids: Vec::new(),
        }
    }

    pub fn member(mut self, lens_id: impl Into<String>) -> Self {
        self.lens_ids.push(lens_id.into());
        self
    }
}

/// Curated contrast between two lenses.
///
/// `lens_a`/`lens_b` hold a lens id or an exact lens name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastOverride {
    #[serde(alias = "source_id")]
    pub lens_a: String,

    #[serde(alias = "target_id")]
    pub lens_b: String,

    #[serde(default)]
    pub insight: Option<String>,

    /// Curator confidence; the engine default applies when absent
    #[serde(default, alias = "weight")]
    pub dialectic_score: Option<f32>,
}

impl ContrastOverride {
    pub fn new(lens_a: impl Into<String>, lens_b: impl Into<String>) -> Self {
        Self {
            lens_a: lens_a.into(),
            lens_b: lens_b.into(),
            insight: None,
            dialectic_score: None,
        }
    }

    pub fn insight(mut self, insight: impl Into<String>) -> Self {
        self.insight = Some(insight.into());
        self
    }

    pub fn score(mut self, score: f32) -> Self {
        self.dialectic_score = Some(score);
        self
    }
}
