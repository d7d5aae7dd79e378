use crate::builder::BuildReport;
use crate::centrality::CentralityCache;
use crate::config::GraphConfig;
use crate::contrast::{DialecticScorer, StoredContrast};
use crate::error::Result;
use crate::types::{EdgeKind, EdgeRecord, LensEdge};
use lens_corpus::Lens;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Strongest relation between two adjacent lenses.
///
/// Parallel edges of different kinds stay separate in the multigraph; this
/// collapsed view is what path finding and centrality walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Link {
    pub to: usize,
    /// Maximum weight over parallel edges
    pub weight: f32,
    /// Kind of the strongest edge
    pub kind: EdgeKind,
    /// Sum of parallel edge weights
    pub total: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct FrameInfo {
    pub id: String,
    pub name: String,
    pub members: Vec<usize>,
}

/// Public view of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSummary {
    pub id: String,
    pub name: String,
    pub lens_count: usize,
}

/// Immutable lens graph snapshot.
///
/// Built once by [`crate::GraphBuilder`] and only read afterwards; every
/// query is a `&self` method, so a snapshot can be shared across threads
/// behind an `Arc`. Node index `i` always refers to the `i`-th lens in id
/// order.
#[derive(Debug)]
pub struct LensGraph {
    pub(crate) graph: UnGraph<Lens, LensEdge>,
    pub(crate) frames: Vec<FrameInfo>,
    /// Node -> positions in `frames`
    pub(crate) memberships: Vec<Vec<usize>>,
    /// Node -> lowercased related concepts
    pub(crate) concepts: Vec<BTreeSet<String>>,
    pub(crate) adjacency: Vec<Vec<Link>>,
    pub(crate) contrasts: Vec<Vec<StoredContrast>>,
    pub(crate) id_index: HashMap<String, usize>,
    pub(crate) name_index: HashMap<String, usize>,
    pub(crate) folded_index: HashMap<String, usize>,
    pub(crate) frame_index: HashMap<String, usize>,
    pub(crate) config: GraphConfig,
    pub(crate) report: BuildReport,
    pub(crate) scorer: Arc<dyn DialecticScorer>,
    pub(crate) centrality: CentralityCache,
}

pub(crate) fn fold_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl LensGraph {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        graph: UnGraph<Lens, LensEdge>,
        frames: Vec<FrameInfo>,
        memberships: Vec<Vec<usize>>,
        concepts: Vec<BTreeSet<String>>,
        contrasts: Vec<Vec<StoredContrast>>,
        config: GraphConfig,
        report: BuildReport,
        scorer: Arc<dyn DialecticScorer>,
    ) -> Self {
        let mut id_index = HashMap::new();
        let mut name_index = HashMap::new();
        let mut folded_index = HashMap::new();
        for idx in graph.node_indices() {
            let lens = &graph[idx];
            id_index.insert(lens.id.clone(), idx.index());
            // First lens in id order wins on duplicate names
            name_index.entry(lens.name.clone()).or_insert(idx.index());
            folded_index
                .entry(fold_name(&lens.name))
                .or_insert(idx.index());
        }

        let mut frame_index = HashMap::new();
        for (pos, frame) in frames.iter().enumerate() {
            frame_index.insert(frame.id.clone(), pos);
        }
        for (pos, frame) in frames.iter().enumerate() {
            frame_index.entry(fold_name(&frame.name)).or_insert(pos);
        }

        let adjacency = collapse(&graph);

        Self {
            graph,
            frames,
            memberships,
            concepts,
            adjacency,
            contrasts,
            id_index,
            name_index,
            folded_index,
            frame_index,
            config,
            report,
            scorer,
            centrality: CentralityCache::default(),
        }
    }

    pub(crate) fn lens_at(&self, node: usize) -> &Lens {
        &self.graph[NodeIndex::new(node)]
    }

    pub(crate) fn name_of(&self, node: usize) -> &str {
        &self.lens_at(node).name
    }

    /// Strongest link between two nodes, if adjacent
    pub(crate) fn link(&self, a: usize, b: usize) -> Option<&Link> {
        let links = &self.adjacency[a];
        links
            .binary_search_by_key(&b, |l| l.to)
            .ok()
            .map(|pos| &links[pos])
    }

    pub fn lens_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.graph
            .edge_references()
            .filter(|e| e.weight().kind == kind)
            .count()
    }

    /// All lenses in id order
    pub fn lenses(&self) -> impl Iterator<Item = &Lens> {
        self.graph.node_weights()
    }

    /// Resolve a name and return the lens record
    pub fn get_lens(&self, name: &str) -> Result<&Lens> {
        let node = self.resolve(name)?;
        Ok(self.lens_at(node))
    }

    pub fn frames(&self) -> Vec<FrameSummary> {
        self.frames.iter().map(summary).collect()
    }

    /// Frames a lens belongs to
    pub fn frames_of(&self, name: &str) -> Result<Vec<FrameSummary>> {
        let node = self.resolve(name)?;
        Ok(self.memberships[node]
            .iter()
            .map(|&pos| summary(&self.frames[pos]))
            .collect())
    }

    /// Every edge, endpoints ordered by lens id, sorted
    pub fn edges(&self) -> Vec<EdgeRecord> {
        let mut records: Vec<EdgeRecord> = self
            .graph
            .edge_references()
            .map(|e| {
                let (s, t) = (e.source().index(), e.target().index());
                let (a, b) = (s.min(t), s.max(t));
                EdgeRecord {
                    source: self.lens_at(a).id.clone(),
                    target: self.lens_at(b).id.clone(),
                    kind: e.weight().kind,
                    weight: e.weight().weight,
                }
            })
            .collect();
        records.sort_by(|x, y| {
            (&x.source, &x.target, x.kind).cmp(&(&y.source, &y.target, y.kind))
        });
        records
    }

    /// Parallel edges between two lenses
    pub fn edges_between(&self, a: &str, b: &str) -> Result<Vec<LensEdge>> {
        let a = NodeIndex::new(self.resolve(a)?);
        let b = NodeIndex::new(self.resolve(b)?);
        let mut edges: Vec<LensEdge> = self
            .graph
            .edges_connecting(a, b)
            .map(|e| e.weight().clone())
            .collect();
        edges.sort_by_key(|e| e.kind);
        Ok(edges)
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
}

fn summary(frame: &FrameInfo) -> FrameSummary {
    FrameSummary {
        id: frame.id.clone(),
        name: frame.name.clone(),
        lens_count: frame.members.len(),
    }
}

fn collapse(graph: &UnGraph<Lens, LensEdge>) -> Vec<Vec<Link>> {
    let mut pairs: BTreeMap<(usize, usize), Link> = BTreeMap::new();
    for edge in graph.edge_references() {
        let (s, t) = (edge.source().index(), edge.target().index());
        let key = (s.min(t), s.max(t));
        let w = edge.weight();
        pairs
            .entry(key)
            .and_modify(|link| {
                link.total += w.weight;
                if w.weight > link.weight {
                    link.weight = w.weight;
                    link.kind = w.kind;
                }
            })
            .or_insert(Link {
                to: key.1,
                weight: w.weight,
                kind: w.kind,
                total: w.weight,
            });
    }

    let mut adjacency = vec![Vec::new(); graph.node_count()];
    for ((a, b), link) in pairs {
        adjacency[a].push(Link { to: b, ..link });
        adjacency[b].push(Link { to: a, ..link });
    }
    for links in &mut adjacency {
        links.sort_by_key(|l| l.to);
    }
    adjacency
}
