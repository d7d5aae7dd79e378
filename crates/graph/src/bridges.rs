use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Lens that mediates between several inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bridge {
    pub lens: String,
    pub lens_id: String,
    pub score: f32,

    /// Inputs within two hops, in input order
    pub connects: Vec<String>,
    pub mean_link: f32,
    pub total_weight: f32,

    /// Concepts of the bridge shared with at least one input
    pub shared_concepts: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BridgeCandidate {
    pub node: usize,
    pub score: f32,
    /// Positions in the input slice
    pub reached: Vec<usize>,
    pub mean_link: f32,
    pub total_weight: f32,
    pub shared_concepts: Vec<String>,
}

impl LensGraph {
    /// Link strength from `candidate` to `input`: the direct edge, or the
    /// best two-hop product through a lens that is not an input.
    fn link_strength(&self, candidate: usize, input: usize, inputs: &HashSet<usize>) -> f32 {
        if let Some(link) = self.link(candidate, input) {
            return link.weight;
        }
        self.adjacency[candidate]
            .iter()
            .filter(|mid| mid.to != input && !inputs.contains(&mid.to))
            .filter_map(|mid| self.link(mid.to, input).map(|l| mid.weight * l.weight))
            .fold(0.0, f32::max)
    }

    /// Score every lens outside `inputs` and `exclude` that reaches at
    /// least two inputs within two hops
    pub(crate) fn bridge_candidates(
        &self,
        inputs: &[usize],
        exclude: &HashSet<usize>,
    ) -> Vec<BridgeCandidate> {
        let input_set: HashSet<usize> = inputs.iter().copied().collect();
        let n = inputs.len() as f32;
        let cfg = &self.config.bridge;

        let mut candidates = Vec::new();
        for node in 0..self.lens_count() {
            if input_set.contains(&node) || exclude.contains(&node) {
                continue;
            }

            let mut reached = Vec::new();
            let mut total_weight = 0.0;
            for (pos, &input) in inputs.iter().enumerate() {
                let strength = self.link_strength(node, input, &input_set);
                if strength > 0.0 {
                    reached.push(pos);
                    total_weight += strength;
                }
            }
            if reached.len() < 2 {
                continue;
            }
            let mean_link = total_weight / reached.len() as f32;

            let own = &self.concepts[node];
            let concept_inputs = inputs
                .iter()
                .filter(|&&input| !own.is_disjoint(&self.concepts[input]))
                .count();
            let concept_term = if concept_inputs >= 2 {
                concept_inputs as f32 / n
            } else {
                0.0
            };
            let shared_concepts: BTreeSet<&String> = inputs
                .iter()
                .flat_map(|&input| own.intersection(&self.concepts[input]))
                .collect();

            let score = cfg.reach_weight * reached.len() as f32 / n
                + cfg.link_weight * mean_link
                + cfg.concept_weight * concept_term;

            candidates.push(BridgeCandidate {
                node,
                score,
                reached,
                mean_link,
                total_weight,
                shared_concepts: shared_concepts.into_iter().cloned().collect(),
            });
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.total_weight.total_cmp(&a.total_weight))
                .then_with(|| self.name_of(a.node).cmp(self.name_of(b.node)))
        });
        candidates
    }

    /// Lenses that connect at least two of the given lenses.
    ///
    /// Each candidate is scored by how many inputs it reaches within two
    /// hops, the mean strength of those links and its concept overlap with
    /// the inputs. Ties go to the higher total link weight.
    pub fn bridges<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Bridge>> {
        let inputs = self.resolve_all(names)?;
        if inputs.len() < 2 {
            return Err(GraphError::InvalidInput(
                "bridges needs at least 2 distinct lenses".to_string(),
            ));
        }

        let bridges: Vec<Bridge> = self
            .bridge_candidates(&inputs, &HashSet::new())
            .into_iter()
            .take(self.config.bridge.max_results)
            .map(|c| {
                let lens = self.lens_at(c.node);
                Bridge {
                    lens: lens.name.clone(),
                    lens_id: lens.id.clone(),
                    score: c.score,
                    connects: c
                        .reached
                        .iter()
                        .map(|&pos| self.name_of(inputs[pos]).to_string())
                        .collect(),
                    mean_link: c.mean_link,
                    total_weight: c.total_weight,
                    shared_concepts: c.shared_concepts,
                }
            })
            .collect();

        log::debug!("bridges over {} inputs: {} found", inputs.len(), bridges.len());
        Ok(bridges)
    }
}
