use crate::contrast::{contrast_score, in_band, StoredContrast};
use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use crate::types::{ContrastPair, EdgeKind};
use lens_vector_store::cosine_similarity;
use serde::Serialize;
use std::collections::HashSet;

/// Contrast evaluation of an arbitrary lens pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastScore {
    pub embedding_distance: f32,
    pub keyword_score: f32,
    pub score: f32,
    pub in_band: bool,

    /// In band and above the minimum score
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastCoverage {
    pub total: usize,
    pub covered: usize,
    pub percent: f32,
    pub uncovered: Vec<String>,
}

/// Thesis, antithesis and a lens that bridges them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Triad {
    pub thesis: String,
    pub antithesis: String,
    pub synthesis: String,

    /// Bridge score of the synthesis between thesis and antithesis
    pub score: f32,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionStep {
    pub lens: String,
    pub lens_id: String,
    pub via: Option<EdgeKind>,

    /// Cosine similarity to the target; `None` without embeddings
    pub similarity_to_target: Option<f32>,
    pub insight: String,
}

/// Learning path that approaches the target step by step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progression {
    pub start: String,
    pub target: String,
    pub steps: Vec<ProgressionStep>,

    /// Similarity to the target never drops along the path
    pub monotone: bool,
    pub summary: String,
}

const SIMILARITY_EPSILON: f32 = 1e-6;

impl LensGraph {
    fn contrast_pair(&self, node: usize, stored: &StoredContrast) -> ContrastPair {
        let own = self.name_of(node);
        let other = self.name_of(stored.other);
        ContrastPair {
            lens_a: own.to_string(),
            lens_b: other.to_string(),
            embedding_distance: stored.distance,
            dialectic_score: stored.score,
            insight: stored.basis.render(own, other),
            origin: stored.origin,
        }
    }

    /// All valid contrast pairs of a lens, strongest first
    #[doc(alias = "find_contrasts")]
    pub fn contrasts(&self, lens: &str) -> Result<Vec<ContrastPair>> {
        let node = self.resolve(lens)?;
        Ok(self.contrasts[node]
            .iter()
            .map(|stored| self.contrast_pair(node, stored))
            .collect())
    }

    /// Score any two lenses, whether or not they form a stored pair.
    ///
    /// `None` when either lens has no embedding.
    pub fn contrast_score(&self, a: &str, b: &str) -> Result<Option<ContrastScore>> {
        let a = self.lens_at(self.resolve(a)?);
        let b = self.lens_at(self.resolve(b)?);
        if a.embedding.is_empty() || b.embedding.is_empty() {
            return Ok(None);
        }

        let cfg = &self.config.contrast;
        let embedding_distance = (1.0 - cosine_similarity(&a.embedding, &b.embedding)).max(0.0);
        let keyword_score = self.scorer.score(a, b).score;
        let score = contrast_score(cfg, embedding_distance, keyword_score);
        let in_band = in_band(cfg, embedding_distance);
        Ok(Some(ContrastScore {
            embedding_distance,
            keyword_score,
            score,
            in_band,
            valid: in_band && score > cfg.min_score,
        }))
    }

    /// How many lenses have at least one contrast
    pub fn contrast_coverage(&self) -> ContrastCoverage {
        let total = self.lens_count();
        let uncovered: Vec<String> = (0..total)
            .filter(|&node| self.contrasts[node].is_empty())
            .map(|node| self.name_of(node).to_string())
            .collect();
        let covered = total - uncovered.len();
        ContrastCoverage {
            total,
            covered,
            percent: if total == 0 {
                0.0
            } else {
                covered as f32 / total as f32 * 100.0
            },
            uncovered,
        }
    }

    /// Thesis/antithesis/synthesis triads for a lens.
    ///
    /// Every contrast of the lens is an antithesis; a synthesis must bridge
    /// both and must not be a contrast of either.
    #[doc(alias = "find_triads")]
    pub fn triads(&self, lens: &str, limit: usize) -> Result<Vec<Triad>> {
        if limit == 0 {
            return Err(GraphError::InvalidInput("limit must be at least 1".to_string()));
        }
        let thesis = self.resolve(lens)?;

        let mut triads: Vec<(f32, usize, usize)> = Vec::new();
        for anti in &self.contrasts[thesis] {
            let exclude: HashSet<usize> = self.contrasts[thesis]
                .iter()
                .chain(&self.contrasts[anti.other])
                .map(|c| c.other)
                .collect();
            for candidate in self.bridge_candidates(&[thesis, anti.other], &exclude) {
                triads.push((candidate.score, anti.other, candidate.node));
            }
        }
        triads.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| self.name_of(a.1).cmp(self.name_of(b.1)))
                .then_with(|| self.name_of(a.2).cmp(self.name_of(b.2)))
        });
        triads.truncate(limit);

        let thesis_name = self.name_of(thesis);
        Ok(triads
            .into_iter()
            .map(|(score, anti, synthesis)| {
                let (anti_name, synth_name) = (self.name_of(anti), self.name_of(synthesis));
                let insight = match self.shared_with_both(synthesis, thesis, anti) {
                    Some(concept) => format!(
                        "{synth_name} reconciles {thesis_name} and {anti_name} through their shared concern with {concept}."
                    ),
                    None => format!(
                        "{synth_name} holds {thesis_name} and {anti_name} together: it connects to both without taking either side."
                    ),
                };
                Triad {
                    thesis: thesis_name.to_string(),
                    antithesis: anti_name.to_string(),
                    synthesis: synth_name.to_string(),
                    score,
                    insight,
                }
            })
            .collect())
    }

    fn shared_with_both(&self, node: usize, a: usize, b: usize) -> Option<&str> {
        self.concepts[node]
            .iter()
            .find(|c| self.concepts[a].contains(*c) && self.concepts[b].contains(*c))
            .map(String::as_str)
    }

    fn similarity_to(&self, node: usize, target: usize) -> Option<f32> {
        let a = &self.lens_at(node).embedding;
        let b = &self.lens_at(target).embedding;
        (!a.is_empty() && !b.is_empty()).then(|| cosine_similarity(a, b))
    }

    /// Learning progression from `start` to `target` with at most
    /// `max_steps` lenses.
    ///
    /// Among the shortest paths that fit, the first whose similarity to the
    /// target never decreases wins; otherwise the one with the fewest drops.
    #[doc(alias = "find_progression")]
    pub fn progression(&self, start: &str, target: &str, max_steps: usize) -> Result<Progression> {
        if max_steps == 0 {
            return Err(GraphError::InvalidInput(
                "max_steps must be at least 1".to_string(),
            ));
        }
        let s = self.resolve(start)?;
        let t = self.resolve(target)?;

        let candidates: Vec<Vec<usize>> = self
            .k_shortest_paths(s, t, self.config.progression_candidates)
            .into_iter()
            .filter(|path| path.len() <= max_steps)
            .collect();

        let mut chosen: Option<(usize, Vec<Option<f32>>, &Vec<usize>)> = None;
        for path in &candidates {
            let sims: Vec<Option<f32>> = path.iter().map(|&n| self.similarity_to(n, t)).collect();
            let drops = regressions(&sims);
            if chosen.as_ref().map_or(true, |(best, _, _)| drops < *best) {
                chosen = Some((drops, sims, path));
            }
            if drops == 0 {
                break;
            }
        }
        let Some((drops, sims, path)) = chosen else {
            return Err(GraphError::NotFound(format!(
                "no progression from {} to {} within {} steps",
                self.name_of(s),
                self.name_of(t),
                max_steps
            )));
        };

        let target_name = self.name_of(t);
        let steps: Vec<ProgressionStep> = path
            .iter()
            .enumerate()
            .map(|(i, &node)| {
                let lens = self.lens_at(node);
                let via = (i > 0)
                    .then(|| self.link(path[i - 1], node).map(|l| l.kind))
                    .flatten();
                let insight = if i == 0 {
                    format!("Start with {}.", lens.name)
                } else if i == path.len() - 1 {
                    format!("Arrive at {target_name}.")
                } else {
                    let closer = match (sims[i - 1], sims[i]) {
                        (Some(prev), Some(cur)) => cur + SIMILARITY_EPSILON >= prev,
                        _ => true,
                    };
                    let kind = via.map_or("direct", EdgeKind::as_str);
                    if closer {
                        format!("{} moves you closer to {target_name} via a {kind} link.", lens.name)
                    } else {
                        format!("{} widens the view before closing in on {target_name}.", lens.name)
                    }
                };
                ProgressionStep {
                    lens: lens.name.clone(),
                    lens_id: lens.id.clone(),
                    via,
                    similarity_to_target: sims[i],
                    insight,
                }
            })
            .collect();

        let monotone = drops == 0;
        let start_name = self.name_of(s);
        let summary = if steps.len() == 1 {
            format!("{start_name} is already the target.")
        } else if monotone {
            format!(
                "A {}-step progression from {start_name} that steadily approaches {target_name}.",
                steps.len()
            )
        } else {
            format!(
                "A {}-step progression from {start_name} to {target_name} with {drops} detour(s).",
                steps.len()
            )
        };

        Ok(Progression {
            start: start_name.to_string(),
            target: target_name.to_string(),
            steps,
            monotone,
            summary,
        })
    }
}

/// Consecutive known similarities that drop
fn regressions(sims: &[Option<f32>]) -> usize {
    sims.windows(2)
        .filter(|w| matches!((w[0], w[1]), (Some(a), Some(b)) if b + SIMILARITY_EPSILON < a))
        .count()
}
