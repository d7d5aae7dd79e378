use crate::config::ContrastConfig;
use crate::types::ContrastOrigin;
use lens_corpus::{ContrastOverride, Lens};
use lens_vector_store::VectorIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Keyword evidence that two lenses pull against each other
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordScore {
    /// Normalised to [0, 1]
    pub score: f32,

    /// Opposing terms as `(term in a, term in b)`
    pub opposing: Vec<(String, String)>,

    /// Tension markers found in either text
    pub markers: Vec<String>,
}

/// Scores the dialectic tension between two lenses from their text.
///
/// This is the keyword half of the contrast score; the embedding distance is
/// handled by the builder. Implementations must be deterministic.
pub trait DialecticScorer: Send + Sync + fmt::Debug {
    fn score(&self, a: &Lens, b: &Lens) -> KeywordScore;
}

const OPPOSING_TERMS: &[(&str, &str)] = &[
    ("fast", "slow"),
    ("quick", "patient"),
    ("break", "build"),
    ("explore", "exploit"),
    ("risk", "safe"),
    ("innovation", "stability"),
    ("change", "continuity"),
    ("short", "long"),
    ("individual", "collective"),
    ("chaos", "order"),
];

const TENSION_MARKERS: &[&str] = &[
    "tension",
    "paradox",
    "versus",
    "trade-off",
    "opposite",
    "balance",
    "contradiction",
];

const OPPOSING_PAIR_SCORE: f32 = 0.5;
const MARKER_SCORE: f32 = 0.25;

/// Default scorer: a fixed lexicon of opposing terms and tension markers.
///
/// An opposing pair counts when one side's term appears in one lens and the
/// other side's term in the other lens. Words match by prefix, so "risks"
/// and "breaking" count.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpposingTermsScorer;

fn words(lens: &Lens) -> Vec<String> {
    let mut text = String::with_capacity(lens.definition.len() + lens.name.len() + 1);
    text.push_str(&lens.name);
    text.push(' ');
    text.push_str(&lens.definition);
    for example in &lens.examples {
        text.push(' ');
        text.push_str(example);
    }
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn mentions(words: &[String], term: &str) -> bool {
    words.iter().any(|w| w.starts_with(term))
}

impl DialecticScorer for OpposingTermsScorer {
    fn score(&self, a: &Lens, b: &Lens) -> KeywordScore {
        let words_a = words(a);
        let words_b = words(b);

        let mut opposing = Vec::new();
        for &(left, right) in OPPOSING_TERMS {
            if mentions(&words_a, left) && mentions(&words_b, right) {
                opposing.push((left.to_string(), right.to_string()));
            } else if mentions(&words_a, right) && mentions(&words_b, left) {
                opposing.push((right.to_string(), left.to_string()));
            }
        }

        let markers: Vec<String> = TENSION_MARKERS
            .iter()
            .filter(|m| mentions(&words_a, m) || mentions(&words_b, m))
            .map(|m| m.to_string())
            .collect();

        let raw = opposing.len() as f32 * OPPOSING_PAIR_SCORE + markers.len() as f32 * MARKER_SCORE;
        KeywordScore {
            score: raw.min(1.0),
            opposing,
            markers,
        }
    }
}

/// What a contrast's insight text is built from, seen from the owning lens
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InsightBasis {
    /// `(own term, other term)`
    Terms(String, String),
    Concepts(Vec<String>),
    Plain,
    Curated(Option<String>),
}

impl InsightBasis {
    fn flipped(&self) -> Self {
        match self {
            InsightBasis::Terms(own, other) => InsightBasis::Terms(other.clone(), own.clone()),
            other => other.clone(),
        }
    }

    pub(crate) fn render(&self, own: &str, other: &str) -> String {
        match self {
            InsightBasis::Terms(a, b) => format!(
                "{own} leans toward {a} while {other} leans toward {b}; holding both exposes the trade-off."
            ),
            InsightBasis::Concepts(concepts) => format!(
                "{own} and {other} pull in opposite directions on {}.",
                concepts.join(", ")
            ),
            InsightBasis::Plain => format!(
                "{own} and {other} approach the same ground from opposing directions; use each to test the other's blind spots."
            ),
            InsightBasis::Curated(Some(text)) => text.clone(),
            InsightBasis::Curated(None) => {
                format!("{own} and {other} form a curated dialectic pair.")
            }
        }
    }
}

/// Contrast stored on the adjacency list of one lens
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StoredContrast {
    pub other: usize,
    pub distance: f32,
    pub score: f32,
    pub basis: InsightBasis,
    pub origin: ContrastOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub distance: f32,
    pub score: f32,
    /// Basis from the lower node's side
    pub basis: InsightBasis,
    pub origin: ContrastOrigin,
}

/// Override that could not be applied
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RejectedOverride {
    pub lens_a: String,
    pub lens_b: String,
    pub reason: String,
}

pub(crate) fn in_band(config: &ContrastConfig, distance: f32) -> bool {
    distance >= config.min_distance && distance <= config.max_distance
}

/// `embedding_weight * normalised distance + keyword_weight * keyword score`
pub(crate) fn contrast_score(config: &ContrastConfig, distance: f32, keyword: f32) -> f32 {
    let span = config.max_distance - config.min_distance;
    let normalised = ((distance - config.min_distance) / span).clamp(0.0, 1.0);
    config.embedding_weight * normalised + config.keyword_weight * keyword.clamp(0.0, 1.0)
}

/// Inputs shared by detection and override merging
pub(crate) struct ContrastContext<'a> {
    pub lenses: &'a [Lens],
    pub vectors: &'a VectorIndex,
    pub memberships: &'a [Vec<usize>],
    pub concepts: &'a [BTreeSet<String>],
    pub config: &'a ContrastConfig,
    pub scorer: &'a dyn DialecticScorer,
}

impl ContrastContext<'_> {
    fn distance(&self, a: usize, b: usize) -> Option<f32> {
        self.vectors
            .similarity(&self.lenses[a].id, &self.lenses[b].id)
            .map(|similarity| (1.0 - similarity).max(0.0))
    }

    fn shared_concepts(&self, a: usize, b: usize) -> Vec<String> {
        self.concepts[a]
            .intersection(&self.concepts[b])
            .cloned()
            .collect()
    }

    fn shares_frame(&self, a: usize, b: usize) -> bool {
        self.memberships[a]
            .iter()
            .any(|f| self.memberships[b].contains(f))
    }

    /// Automatic detection over all pairs; keys are `(lower, higher)` nodes
    pub(crate) fn detect(&self) -> BTreeMap<(usize, usize), Candidate> {
        let mut pairs = BTreeMap::new();
        let n = self.lenses.len();
        for a in 0..n {
            for b in (a + 1)..n {
                let Some(distance) = self.distance(a, b) else {
                    continue;
                };
                if !in_band(self.config, distance) {
                    continue;
                }
                let shared = self.shared_concepts(a, b);
                if self.config.require_shared_territory
                    && shared.is_empty()
                    && !self.shares_frame(a, b)
                {
                    continue;
                }

                let keyword = self.scorer.score(&self.lenses[a], &self.lenses[b]);
                let score = contrast_score(self.config, distance, keyword.score);
                if score <= self.config.min_score {
                    continue;
                }

                let basis = match keyword.opposing.first() {
                    Some((own, other)) => InsightBasis::Terms(own.clone(), other.clone()),
                    None if !shared.is_empty() => InsightBasis::Concepts(shared),
                    None => InsightBasis::Plain,
                };
                pairs.insert(
                    (a, b),
                    Candidate {
                        distance,
                        score,
                        basis,
                        origin: ContrastOrigin::Detected,
                    },
                );
            }
        }
        pairs
    }

    /// Apply curated overrides on top of detected pairs.
    ///
    /// Override ends resolve by lens id first, then exact name. A curated
    /// pair replaces any detected pair on the same two lenses. Like detected
    /// pairs, overrides must fall in the distance band and score above
    /// `min_score`.
    pub(crate) fn merge_overrides(
        &self,
        pairs: &mut BTreeMap<(usize, usize), Candidate>,
        overrides: &[ContrastOverride],
    ) -> Vec<RejectedOverride> {
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        for (node, lens) in self.lenses.iter().enumerate() {
            lookup.entry(lens.name.as_str()).or_insert(node);
        }
        for (node, lens) in self.lenses.iter().enumerate() {
            lookup.insert(lens.id.as_str(), node);
        }

        let mut rejected = Vec::new();
        let mut reject = |o: &ContrastOverride, reason: String| {
            log::warn!(
                "Rejected contrast override {} <-> {}: {}",
                o.lens_a,
                o.lens_b,
                reason
            );
            rejected.push(RejectedOverride {
                lens_a: o.lens_a.clone(),
                lens_b: o.lens_b.clone(),
                reason,
            });
        };

        for o in overrides {
            let (Some(&a), Some(&b)) = (lookup.get(o.lens_a.as_str()), lookup.get(o.lens_b.as_str()))
            else {
                reject(o, "unknown lens".to_string());
                continue;
            };
            if a == b {
                reject(o, "a lens cannot contrast with itself".to_string());
                continue;
            }
            let Some(distance) = self.distance(a, b) else {
                reject(o, "missing embedding".to_string());
                continue;
            };
            if !in_band(self.config, distance) {
                reject(
                    o,
                    format!(
                        "embedding distance {distance:.3} outside [{}, {}]",
                        self.config.min_distance, self.config.max_distance
                    ),
                );
                continue;
            }

            let score = o
                .dialectic_score
                .unwrap_or(self.config.curated_score)
                .clamp(0.0, 1.0);
            if score <= self.config.min_score {
                reject(
                    o,
                    format!(
                        "dialectic score {score:.3} not above minimum {}",
                        self.config.min_score
                    ),
                );
                continue;
            }
            let insight = o.insight.clone().filter(|text| !text.trim().is_empty());
            pairs.insert(
                (a.min(b), a.max(b)),
                Candidate {
                    distance,
                    score,
                    basis: InsightBasis::Curated(insight),
                    origin: ContrastOrigin::Curated,
                },
            );
        }
        rejected
    }
}

/// Spread pairs onto both lenses, strongest first, ties by node order
pub(crate) fn distribute(
    pairs: BTreeMap<(usize, usize), Candidate>,
    node_count: usize,
) -> Vec<Vec<StoredContrast>> {
    let mut per_node: Vec<Vec<StoredContrast>> = vec![Vec::new(); node_count];
    for ((a, b), candidate) in pairs {
        per_node[b].push(StoredContrast {
            other: a,
            distance: candidate.distance,
            score: candidate.score,
            basis: candidate.basis.flipped(),
            origin: candidate.origin,
        });
        per_node[a].push(StoredContrast {
            other: b,
            distance: candidate.distance,
            score: candidate.score,
            basis: candidate.basis,
            origin: candidate.origin,
        });
    }
    for contrasts in &mut per_node {
        contrasts.sort_by(|x, y| y.score.total_cmp(&x.score).then(x.other.cmp(&y.other)));
    }
    per_node
}
