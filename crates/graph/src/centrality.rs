use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const PAGERANK_DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityMeasure {
    Betweenness,
    PageRank,
    Eigenvector,
    Degree,
}

impl CentralityMeasure {
    pub fn as_str(self) -> &'static str {
        match self {
            CentralityMeasure::Betweenness => "betweenness",
            CentralityMeasure::PageRank => "pagerank",
            CentralityMeasure::Eigenvector => "eigenvector",
            CentralityMeasure::Degree => "degree",
        }
    }
}

impl fmt::Display for CentralityMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CentralityMeasure {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "betweenness" => Ok(CentralityMeasure::Betweenness),
            "pagerank" | "page_rank" => Ok(CentralityMeasure::PageRank),
            "eigenvector" => Ok(CentralityMeasure::Eigenvector),
            "degree" => Ok(CentralityMeasure::Degree),
            other => Err(GraphError::InvalidInput(format!(
                "unknown centrality measure: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityScore {
    pub lens: String,
    pub lens_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentralityRanking {
    pub requested: CentralityMeasure,

    /// Differs from `requested` when eigenvector iteration did not converge
    /// and degree centrality was used instead
    pub computed: CentralityMeasure,
    pub scores: Vec<CentralityScore>,
}

/// Per-snapshot memo; dropped together with the snapshot
#[derive(Debug, Default)]
pub(crate) struct CentralityCache {
    betweenness: OnceLock<Vec<f64>>,
    pagerank: OnceLock<Vec<f64>>,
    eigenvector: OnceLock<Option<Vec<f64>>>,
    degree: OnceLock<Vec<f64>>,
}

#[derive(Debug, PartialEq)]
struct Frontier {
    dist: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl LensGraph {
    /// Top `limit` lenses by a weighted centrality measure.
    ///
    /// Scores are computed once per snapshot and memoised. Betweenness uses
    /// `1 / weight` of the strongest edge as distance; PageRank, eigenvector
    /// and degree use the summed weight of parallel edges.
    pub fn centrality(&self, measure: CentralityMeasure, limit: usize) -> Result<CentralityRanking> {
        if limit == 0 {
            return Err(GraphError::InvalidInput("limit must be at least 1".to_string()));
        }

        let (computed, scores) = match measure {
            CentralityMeasure::Betweenness => (
                measure,
                self.centrality.betweenness.get_or_init(|| self.betweenness()),
            ),
            CentralityMeasure::PageRank => (
                measure,
                self.centrality.pagerank.get_or_init(|| self.pagerank()),
            ),
            CentralityMeasure::Degree => (
                measure,
                self.centrality.degree.get_or_init(|| self.degree()),
            ),
            CentralityMeasure::Eigenvector => {
                match self.centrality.eigenvector.get_or_init(|| self.eigenvector()) {
                    Some(scores) => (measure, scores),
                    None => (
                        CentralityMeasure::Degree,
                        self.centrality.degree.get_or_init(|| self.degree()),
                    ),
                }
            }
        };

        let mut ranked: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.name_of(a.0).cmp(self.name_of(b.0)))
        });
        ranked.truncate(limit);

        Ok(CentralityRanking {
            requested: measure,
            computed,
            scores: ranked
                .into_iter()
                .map(|(node, score)| {
                    let lens = self.lens_at(node);
                    CentralityScore {
                        lens: lens.name.clone(),
                        lens_id: lens.id.clone(),
                        score,
                    }
                })
                .collect(),
        })
    }

    /// Brandes' algorithm with Dijkstra, normalised by `1 / ((n-1)(n-2))`
    fn betweenness(&self) -> Vec<f64> {
        let n = self.lens_count();
        let mut centrality = vec![0.0f64; n];

        for s in 0..n {
            let mut stack = Vec::with_capacity(n);
            let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut dist: Vec<Option<f64>> = vec![None; n];
            let mut settled = vec![false; n];
            sigma[s] = 1.0;
            dist[s] = Some(0.0);

            let mut heap = BinaryHeap::new();
            heap.push(Frontier { dist: 0.0, node: s });
            while let Some(Frontier { dist: d, node: v }) = heap.pop() {
                if settled[v] {
                    continue;
                }
                settled[v] = true;
                stack.push(v);
                for link in &self.adjacency[v] {
                    let w = link.to;
                    let next = d + 1.0 / f64::from(link.weight);
                    match dist[w] {
                        Some(current) if (next - current).abs() <= 1e-12 * current.max(1.0) => {
                            if !settled[w] {
                                sigma[w] += sigma[v];
                                preds[w].push(v);
                            }
                        }
                        Some(current) if next > current => {}
                        _ => {
                            dist[w] = Some(next);
                            sigma[w] = sigma[v];
                            preds[w] = vec![v];
                            heap.push(Frontier { dist: next, node: w });
                        }
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &preds[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != s {
                    centrality[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            for value in &mut centrality {
                *value *= scale;
            }
        }
        centrality
    }

    fn strength(&self, node: usize) -> f64 {
        self.adjacency[node]
            .iter()
            .map(|l| f64::from(l.total))
            .sum()
    }

    fn pagerank(&self) -> Vec<f64> {
        let n = self.lens_count();
        if n == 0 {
            return Vec::new();
        }
        let nf = n as f64;
        let strengths: Vec<f64> = (0..n).map(|v| self.strength(v)).collect();
        let mut rank = vec![1.0 / nf; n];

        for iteration in 0..MAX_ITERATIONS {
            let dangling: f64 = (0..n)
                .filter(|&v| strengths[v] == 0.0)
                .map(|v| rank[v])
                .sum();
            let base = (1.0 - PAGERANK_DAMPING) / nf + PAGERANK_DAMPING * dangling / nf;
            let mut next = vec![base; n];
            for (u, links) in self.adjacency.iter().enumerate() {
                if strengths[u] == 0.0 {
                    continue;
                }
                let share = PAGERANK_DAMPING * rank[u] / strengths[u];
                for link in links {
                    next[link.to] += share * f64::from(link.total);
                }
            }

            let err: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
            rank = next;
            if err < nf * TOLERANCE {
                log::debug!("pagerank converged after {} iterations", iteration + 1);
                return rank;
            }
        }
        log::warn!("pagerank did not converge in {MAX_ITERATIONS} iterations");
        rank
    }

    /// Power iteration on `A + I`; `None` when it does not converge
    fn eigenvector(&self) -> Option<Vec<f64>> {
        let n = self.lens_count();
        if n == 0 {
            return Some(Vec::new());
        }
        let nf = n as f64;
        let mut x = vec![1.0 / nf; n];

        for _ in 0..MAX_ITERATIONS {
            let mut next = x.clone();
            for (v, links) in self.adjacency.iter().enumerate() {
                for link in links {
                    next[link.to] += x[v] * f64::from(link.total);
                }
            }
            let norm = next.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm == 0.0 {
                return None;
            }
            for value in &mut next {
                *value /= norm;
            }
            let err: f64 = next.iter().zip(&x).map(|(a, b)| (a - b).abs()).sum();
            x = next;
            if err < nf * TOLERANCE {
                return Some(x);
            }
        }
        log::warn!("eigenvector centrality did not converge; using degree");
        None
    }

    /// Summed edge weight over `n - 1`
    fn degree(&self) -> Vec<f64> {
        let n = self.lens_count();
        let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 1.0 };
        (0..n).map(|v| self.strength(v) * scale).collect()
    }
}
