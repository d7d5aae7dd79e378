use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use petgraph::unionfind::UnionFind;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

const CLUSTER_TOP_CONCEPTS: usize = 5;

/// Connected group of lenses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub lenses: Vec<String>,

    /// Frame names, most members first
    pub frames: Vec<String>,
    pub top_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub lens: String,
    pub lens_id: String,
    pub score: f32,

    /// Current lenses it is adjacent to
    pub connected_to: Vec<String>,
}

fn by_frequency(counts: BTreeMap<&str, usize>) -> Vec<String> {
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}

impl LensGraph {
    /// Connected components with at least two lenses, largest first
    pub fn clusters(&self) -> Vec<Cluster> {
        let n = self.lens_count();
        let mut components = UnionFind::<usize>::new(n);
        for (a, links) in self.adjacency.iter().enumerate() {
            for link in links {
                components.union(a, link.to);
            }
        }

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for node in 0..n {
            groups.entry(components.find(node)).or_default().push(node);
        }

        let mut clusters: Vec<Cluster> = groups
            .into_values()
            .filter(|members| members.len() >= 2)
            .map(|members| {
                let mut frames: BTreeMap<&str, usize> = BTreeMap::new();
                let mut concepts: BTreeMap<&str, usize> = BTreeMap::new();
                for &node in &members {
                    for &pos in &self.memberships[node] {
                        *frames.entry(self.frames[pos].name.as_str()).or_default() += 1;
                    }
                    for concept in &self.concepts[node] {
                        *concepts.entry(concept.as_str()).or_default() += 1;
                    }
                }
                let mut lenses: Vec<String> =
                    members.iter().map(|&n| self.name_of(n).to_string()).collect();
                lenses.sort();
                let mut top_concepts = by_frequency(concepts);
                top_concepts.truncate(CLUSTER_TOP_CONCEPTS);
                Cluster {
                    lenses,
                    frames: by_frequency(frames),
                    top_concepts,
                }
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.lenses
                .len()
                .cmp(&a.lenses.len())
                .then_with(|| a.lenses.cmp(&b.lenses))
        });
        clusters
    }

    /// Neighbours of the current lenses, scored by summed strongest edge
    /// weight to the current set
    pub fn recommendations<S: AsRef<str>>(
        &self,
        current: &[S],
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let nodes = self.resolve_all(current)?;
        if nodes.is_empty() {
            return Err(GraphError::InvalidInput(
                "recommendations need at least one current lens".to_string(),
            ));
        }
        let current: HashSet<usize> = nodes.iter().copied().collect();

        let mut scored: BTreeMap<usize, (f32, Vec<usize>)> = BTreeMap::new();
        for &node in &nodes {
            for link in &self.adjacency[node] {
                if current.contains(&link.to) {
                    continue;
                }
                let entry = scored.entry(link.to).or_default();
                entry.0 += link.weight;
                entry.1.push(node);
            }
        }

        let mut ranked: Vec<Recommendation> = scored
            .into_iter()
            .map(|(node, (score, from))| {
                let lens = self.lens_at(node);
                Recommendation {
                    lens: lens.name.clone(),
                    lens_id: lens.id.clone(),
                    score,
                    connected_to: from.iter().map(|&n| self.name_of(n).to_string()).collect(),
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.lens.cmp(&b.lens)));
        ranked.truncate(limit);
        Ok(ranked)
    }
}
