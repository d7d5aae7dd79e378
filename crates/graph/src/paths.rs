use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use crate::types::EdgeKind;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

/// One lens on a journey
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub lens: String,
    pub lens_id: String,

    /// Kind of the strongest edge from the previous step (`None` at the start)
    pub via: Option<EdgeKind>,
    pub weight: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyPath {
    pub steps: Vec<PathStep>,
    pub hops: usize,
    pub total_weight: f32,
    pub insight: String,
}

/// Up to `k` shortest paths between two lenses; empty when disconnected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Journey {
    pub source: String,
    pub target: String,
    pub paths: Vec<JourneyPath>,
}

impl Journey {
    pub fn is_connected(&self) -> bool {
        !self.paths.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborEntry {
    pub lens: String,
    pub weight: f32,

    /// Frame id or shared concepts of the connecting edge
    pub via: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HopRing {
    pub hop: usize,
    pub lenses: Vec<NeighborEntry>,
}

/// Bounded neighbourhood of one lens, per edge kind and hop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighborhood {
    pub center: String,
    pub radius: usize,
    pub by_kind: BTreeMap<EdgeKind, Vec<HopRing>>,
}

impl Neighborhood {
    /// Lenses across all kinds and hops, counted once per kind
    pub fn len(&self) -> usize {
        self.by_kind
            .values()
            .flat_map(|rings| rings.iter().map(|r| r.lenses.len()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lexicographic path cost: fewer hops first, then more weight
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost {
    hops: usize,
    weight: f32,
}

impl Cost {
    const ZERO: Cost = Cost {
        hops: 0,
        weight: 0.0,
    };

    fn step(self, weight: f32) -> Self {
        Cost {
            hops: self.hops + 1,
            weight: self.weight + weight,
        }
    }

    /// `Less` means better
    fn compare(&self, other: &Self) -> Ordering {
        self.hops
            .cmp(&other.hops)
            .then_with(|| other.weight.total_cmp(&self.weight))
    }
}

#[derive(Debug, PartialEq)]
struct State {
    cost: Cost,
    node: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap
        other
            .cost
            .compare(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Default)]
struct Blocked {
    nodes: HashSet<usize>,
    edges: HashSet<(usize, usize)>,
}

impl Blocked {
    fn edge(&self, a: usize, b: usize) -> bool {
        self.edges.contains(&(a.min(b), a.max(b)))
    }
}

impl LensGraph {
    fn path_cost(&self, path: &[usize]) -> Cost {
        path.windows(2).fold(Cost::ZERO, |cost, w| {
            cost.step(self.link(w[0], w[1]).map_or(0.0, |l| l.weight))
        })
    }

    fn shortest_path(&self, source: usize, target: usize, blocked: &Blocked) -> Option<Vec<usize>> {
        let n = self.lens_count();
        let mut best: Vec<Option<Cost>> = vec![None; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        best[source] = Some(Cost::ZERO);
        heap.push(State {
            cost: Cost::ZERO,
            node: source,
        });

        while let Some(State { cost, node }) = heap.pop() {
            if node == target {
                break;
            }
            if best[node].is_some_and(|b| cost.compare(&b) == Ordering::Greater) {
                continue;
            }
            for link in &self.adjacency[node] {
                if blocked.nodes.contains(&link.to) || blocked.edge(node, link.to) {
                    continue;
                }
                let next = cost.step(link.weight);
                let improves = match best[link.to] {
                    None => true,
                    Some(current) => next.compare(&current) == Ordering::Less,
                };
                if improves {
                    best[link.to] = Some(next);
                    prev[link.to] = Some(node);
                    heap.push(State {
                        cost: next,
                        node: link.to,
                    });
                }
            }
        }

        best[target]?;
        let mut path = vec![target];
        let mut current = target;
        while current != source {
            current = prev[current]?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    /// Yen's k shortest simple paths over the collapsed adjacency
    pub(crate) fn k_shortest_paths(&self, source: usize, target: usize, k: usize) -> Vec<Vec<usize>> {
        if source == target {
            return vec![vec![source]];
        }
        let Some(first) = self.shortest_path(source, target, &Blocked::default()) else {
            return Vec::new();
        };

        let mut accepted: Vec<Vec<usize>> = vec![first];
        let mut candidates: Vec<(Cost, Vec<usize>)> = Vec::new();

        while accepted.len() < k {
            let last = &accepted[accepted.len() - 1];
            for i in 0..last.len() - 1 {
                let spur = last[i];
                let root = &last[..=i];

                let mut blocked = Blocked::default();
                for path in &accepted {
                    if path.len() > i + 1 && path[..=i] == *root {
                        let (a, b) = (path[i], path[i + 1]);
                        blocked.edges.insert((a.min(b), a.max(b)));
                    }
                }
                blocked.nodes.extend(root[..i].iter().copied());

                if let Some(spur_path) = self.shortest_path(spur, target, &blocked) {
                    let mut full = root[..i].to_vec();
                    full.extend(spur_path);
                    if !accepted.contains(&full) && !candidates.iter().any(|(_, p)| *p == full) {
                        candidates.push((self.path_cost(&full), full));
                    }
                }
            }

            if candidates.is_empty() {
                break;
            }
            candidates.sort_by(|(ca, pa), (cb, pb)| ca.compare(cb).then_with(|| pa.cmp(pb)));
            let (_, best) = candidates.remove(0);
            accepted.push(best);
        }
        accepted
    }

    pub(crate) fn journey_path(&self, path: &[usize]) -> JourneyPath {
        let steps: Vec<PathStep> = path
            .iter()
            .enumerate()
            .map(|(i, &node)| {
                let link = (i > 0).then(|| self.link(path[i - 1], node)).flatten();
                let lens = self.lens_at(node);
                PathStep {
                    lens: lens.name.clone(),
                    lens_id: lens.id.clone(),
                    via: link.map(|l| l.kind),
                    weight: link.map(|l| l.weight),
                }
            })
            .collect();
        let cost = self.path_cost(path);
        let insight = self.path_insight(path);
        JourneyPath {
            steps,
            hops: cost.hops,
            total_weight: cost.weight,
            insight,
        }
    }

    fn path_insight(&self, path: &[usize]) -> String {
        let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
            return String::new();
        };
        let (from, to) = (self.name_of(first), self.name_of(last));
        match path.len() {
            1 => format!("{from} is where you already are."),
            2 => {
                let kind = self.link(first, last).map_or("direct", |l| l.kind.as_str());
                format!("{from} and {to} are directly connected through a {kind} link.")
            }
            3 => format!(
                "{from} and {to} connect through {}.",
                self.name_of(path[1])
            ),
            len => {
                let middle: Vec<&str> = path[1..len - 1].iter().map(|&n| self.name_of(n)).collect();
                format!(
                    "A {}-step journey from {from} to {to} through {}.",
                    len - 1,
                    middle.join(" → ")
                )
            }
        }
    }

    /// Up to `k` shortest paths from `source` to `target`.
    ///
    /// Paths are ranked by fewest edges, then by higher cumulative weight.
    /// `k = None` uses `journey_k` from the config. Disconnected lenses give
    /// an empty path list, not an error.
    pub fn journey(&self, source: &str, target: &str, k: Option<usize>) -> Result<Journey> {
        let k = k.unwrap_or(self.config.journey_k);
        if k == 0 {
            return Err(GraphError::InvalidInput("k must be at least 1".to_string()));
        }
        let s = self.resolve(source)?;
        let t = self.resolve(target)?;

        let paths: Vec<JourneyPath> = self
            .k_shortest_paths(s, t, k)
            .iter()
            .map(|path| self.journey_path(path))
            .collect();
        log::debug!(
            "journey {} -> {}: {} paths",
            self.name_of(s),
            self.name_of(t),
            paths.len()
        );

        Ok(Journey {
            source: self.name_of(s).to_string(),
            target: self.name_of(t).to_string(),
            paths,
        })
    }

    /// Lenses within `radius` hops (1 or 2), walked separately per edge kind.
    ///
    /// Hop 2 only expands through hop-1 lenses and never returns the center.
    /// Each entry carries the strongest edge that reached it.
    pub fn neighborhood(&self, lens: &str, radius: usize) -> Result<Neighborhood> {
        if !(1..=2).contains(&radius) {
            return Err(GraphError::InvalidInput(format!(
                "radius must be 1 or 2, got {radius}"
            )));
        }
        let center = self.resolve(lens)?;

        let mut by_kind = BTreeMap::new();
        for kind in EdgeKind::ALL {
            let ring1 = self.ring(kind, &[center], &HashSet::from([center]));
            if ring1.is_empty() {
                continue;
            }
            let mut rings = Vec::new();
            if radius == 2 {
                let mut seen: HashSet<usize> = ring1.keys().copied().collect();
                seen.insert(center);
                let frontier: Vec<usize> = ring1.keys().copied().collect();
                let ring2 = self.ring(kind, &frontier, &seen);
                rings.push(self.hop_ring(1, ring1));
                if !ring2.is_empty() {
                    rings.push(self.hop_ring(2, ring2));
                }
            } else {
                rings.push(self.hop_ring(1, ring1));
            }
            by_kind.insert(kind, rings);
        }

        Ok(Neighborhood {
            center: self.name_of(center).to_string(),
            radius,
            by_kind,
        })
    }

    /// Unvisited neighbours of `frontier` over edges of one kind, keeping
    /// the strongest edge per neighbour
    fn ring(
        &self,
        kind: EdgeKind,
        frontier: &[usize],
        visited: &HashSet<usize>,
    ) -> BTreeMap<usize, (f32, Option<String>)> {
        let mut found: BTreeMap<usize, (f32, Option<String>)> = BTreeMap::new();
        for &node in frontier {
            for edge in self.graph.edges(NodeIndex::new(node)) {
                let data = edge.weight();
                if data.kind != kind {
                    continue;
                }
                let other = if edge.source().index() == node {
                    edge.target().index()
                } else {
                    edge.source().index()
                };
                if visited.contains(&other) {
                    continue;
                }
                match found.get(&other) {
                    Some((w, _)) if *w >= data.weight => {}
                    _ => {
                        found.insert(other, (data.weight, data.via.clone()));
                    }
                }
            }
        }
        found
    }

    fn hop_ring(&self, hop: usize, found: BTreeMap<usize, (f32, Option<String>)>) -> HopRing {
        let mut lenses: Vec<NeighborEntry> = found
            .into_iter()
            .map(|(node, (weight, via))| NeighborEntry {
                lens: self.name_of(node).to_string(),
                weight,
                via,
            })
            .collect();
        lenses.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.lens.cmp(&b.lens)));
        HopRing { hop, lenses }
    }
}
