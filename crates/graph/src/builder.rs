use crate::config::GraphConfig;
use crate::contrast::{
    distribute, ContrastContext, DialecticScorer, OpposingTermsScorer, RejectedOverride,
};
use crate::error::{GraphError, Result};
use crate::graph::{FrameInfo, LensGraph};
use crate::types::{ContrastOrigin, EdgeKind, LensEdge};
use lens_corpus::{ContrastOverride, Frame, Lens, LensStore};
use lens_vector_store::{EmbeddingSource, VectorIndex};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Summary of one build, kept on the snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub lens_count: usize,
    pub frame_count: usize,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    pub detected_contrasts: usize,
    pub curated_contrasts: usize,
    pub rejected_overrides: Vec<RejectedOverride>,
    /// Lens ids with no usable embedding
    pub missing_embeddings: Vec<String>,
    /// Lens names left without any contrast
    pub uncovered_lenses: Vec<String>,
    /// Share of lenses with at least one contrast, in percent
    pub contrast_coverage: f32,
}

/// Everything a build needs, fetched from the collaborators
#[derive(Debug, Clone)]
pub struct BuildInputs {
    pub lenses: Vec<Lens>,
    pub frames: Vec<Frame>,
    pub overrides: Vec<ContrastOverride>,
    pub embeddings: VectorIndex,
}

impl BuildInputs {
    /// Read lenses, frames, overrides and embeddings.
    ///
    /// This is the only I/O on the build path.
    pub async fn fetch(store: &dyn LensStore, source: &dyn EmbeddingSource) -> Result<Self> {
        let lenses = store.list_lenses().await.map_err(GraphError::Source)?;
        let frames = store.list_frames().await.map_err(GraphError::Source)?;
        let overrides = store
            .list_contrast_overrides()
            .await
            .map_err(GraphError::Source)?;

        let ids: Vec<String> = lenses.iter().map(|l| l.id.clone()).collect();
        let (embeddings, missing) = VectorIndex::collect(source, &ids).await?;
        if !missing.is_empty() {
            log::debug!("Embedding source has no vector for {} lenses", missing.len());
        }

        Ok(Self {
            lenses,
            frames,
            overrides,
            embeddings,
        })
    }
}

/// Builds immutable [`LensGraph`] snapshots.
///
/// Building is a pure function of its inputs: lenses are ordered by id
/// before node insertion and every edge set is assembled in sorted order,
/// so identical inputs yield identical graphs.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    config: GraphConfig,
    scorer: Arc<dyn DialecticScorer>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            scorer: Arc::new(OpposingTermsScorer),
        }
    }

    /// Replace the keyword half of the contrast score
    #[must_use]
    pub fn with_scorer(mut self, scorer: impl DialecticScorer + 'static) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn build_inputs(&self, inputs: BuildInputs) -> Result<LensGraph> {
        self.build(
            inputs.lenses,
            inputs.frames,
            &inputs.overrides,
            &inputs.embeddings,
        )
    }

    /// Build a snapshot.
    ///
    /// Embeddings from `embeddings` take priority; a lens missing there falls
    /// back to its inline `embedding`. Lenses with neither get no semantic
    /// edges and no detected contrasts.
    pub fn build(
        &self,
        mut lenses: Vec<Lens>,
        frames: Vec<Frame>,
        overrides: &[ContrastOverride],
        embeddings: &VectorIndex,
    ) -> Result<LensGraph> {
        self.config.validate()?;

        lenses.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = lenses.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(GraphError::BuildError(format!(
                "Duplicate lens id: {}",
                pair[0].id
            )));
        }
        let node_of: HashMap<String, usize> = lenses
            .iter()
            .enumerate()
            .map(|(node, lens)| (lens.id.clone(), node))
            .collect();

        // Phase 1: embeddings
        let (vectors, missing_embeddings) = attach_embeddings(&mut lenses, embeddings)?;
        for id in &missing_embeddings {
            log::warn!("Lens {} has no embedding", id);
        }

        // Phase 2: frame membership
        let (frame_infos, memberships) = assign_frames(&lenses, frames, &node_of);

        let concepts: Vec<BTreeSet<String>> = lenses
            .iter()
            .map(|lens| {
                lens.related_concepts
                    .iter()
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .collect();

        // Phase 3: edges, one per (pair, kind), strongest wins
        let mut edges: BTreeMap<(usize, usize, EdgeKind), LensEdge> = BTreeMap::new();
        self.semantic_edges(&lenses, &vectors, &mut edges)?;
        self.frame_edges(&frame_infos, &mut edges);
        self.temporal_edges(&lenses, &mut edges);
        concept_edges(&concepts, &mut edges);

        // Phase 4: contrasts
        let context = ContrastContext {
            lenses: &lenses,
            vectors: &vectors,
            memberships: &memberships,
            concepts: &concepts,
            config: &self.config.contrast,
            scorer: self.scorer.as_ref(),
        };
        let mut pairs = context.detect();
        let detected_contrasts = pairs.len();
        let rejected_overrides = context.merge_overrides(&mut pairs, overrides);
        let curated_contrasts = pairs
            .values()
            .filter(|c| c.origin == ContrastOrigin::Curated)
            .count();
        let contrasts = distribute(pairs, lenses.len());

        let uncovered_lenses: Vec<String> = lenses
            .iter()
            .zip(&contrasts)
            .filter(|(_, c)| c.is_empty())
            .map(|(lens, _)| lens.name.clone())
            .collect();
        if self.config.contrast.enforce_coverage && !uncovered_lenses.is_empty() {
            return Err(GraphError::BuildError(format!(
                "{} lenses have no contrast: {}",
                uncovered_lenses.len(),
                uncovered_lenses.join(", ")
            )));
        }
        if !uncovered_lenses.is_empty() {
            log::warn!(
                "{} lenses have no contrast after merging overrides",
                uncovered_lenses.len()
            );
        }

        let mut graph: UnGraph<Lens, LensEdge> =
            UnGraph::with_capacity(lenses.len(), edges.len());
        let lens_count = lenses.len();
        for lens in lenses {
            graph.add_node(lens);
        }
        let mut edges_by_kind: BTreeMap<EdgeKind, usize> = BTreeMap::new();
        for ((a, b, kind), edge) in edges {
            *edges_by_kind.entry(kind).or_default() += 1;
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), edge);
        }

        let contrast_coverage = if lens_count == 0 {
            0.0
        } else {
            (lens_count - uncovered_lenses.len()) as f32 / lens_count as f32 * 100.0
        };
        let report = BuildReport {
            lens_count,
            frame_count: frame_infos.len(),
            edges_by_kind,
            detected_contrasts,
            curated_contrasts,
            rejected_overrides,
            missing_embeddings,
            uncovered_lenses,
            contrast_coverage,
        };

        log::info!(
            "Built lens graph: {} lenses, {} frames, {} edges {:?}",
            report.lens_count,
            report.frame_count,
            graph.edge_count(),
            report.edges_by_kind
        );
        log::info!(
            "Contrasts: {} detected, {} curated, coverage {:.1}%",
            report.detected_contrasts,
            report.curated_contrasts,
            report.contrast_coverage
        );

        Ok(LensGraph::assemble(
            graph,
            frame_infos,
            memberships,
            concepts,
            contrasts,
            self.config.clone(),
            report,
            Arc::clone(&self.scorer),
        ))
    }

    /// Top-K neighbours above the similarity floor; weight = similarity
    fn semantic_edges(
        &self,
        lenses: &[Lens],
        vectors: &VectorIndex,
        edges: &mut BTreeMap<(usize, usize, EdgeKind), LensEdge>,
    ) -> Result<()> {
        let node_of: HashMap<&str, usize> = lenses
            .iter()
            .enumerate()
            .map(|(node, lens)| (lens.id.as_str(), node))
            .collect();
        let cfg = &self.config.semantic;

        for (node, lens) in lenses.iter().enumerate() {
            if !vectors.contains(&lens.id) {
                continue;
            }
            for neighbor in vectors.nearest(&lens.id, cfg.top_k, cfg.min_similarity)? {
                let Some(&other) = node_of.get(neighbor.id.as_str()) else {
                    continue;
                };
                let weight = neighbor.similarity.min(1.0);
                if weight <= 0.0 {
                    continue;
                }
                insert_strongest(
                    edges,
                    node,
                    other,
                    LensEdge {
                        kind: EdgeKind::Semantic,
                        weight,
                        via: None,
                    },
                );
            }
        }
        Ok(())
    }

    /// Pairs sharing a frame; weight shrinks with frame size
    fn frame_edges(
        &self,
        frames: &[FrameInfo],
        edges: &mut BTreeMap<(usize, usize, EdgeKind), LensEdge>,
    ) {
        for frame in frames {
            let size = frame.members.len();
            if size < 2 {
                continue;
            }
            let weight = (self.config.frame_weight * 2.0 / size as f32).min(1.0);
            for (i, &a) in frame.members.iter().enumerate() {
                for &b in &frame.members[i + 1..] {
                    insert_strongest(
                        edges,
                        a,
                        b,
                        LensEdge {
                            kind: EdgeKind::Frame,
                            weight,
                            via: Some(frame.id.clone()),
                        },
                    );
                }
            }
        }
    }

    /// Episode `e` to episode `e + 1`; episode 0 means unassigned
    fn temporal_edges(
        &self,
        lenses: &[Lens],
        edges: &mut BTreeMap<(usize, usize, EdgeKind), LensEdge>,
    ) {
        let mut by_episode: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (node, lens) in lenses.iter().enumerate() {
            if lens.episode > 0 {
                by_episode.entry(lens.episode).or_default().push(node);
            }
        }
        for (&episode, nodes) in &by_episode {
            let Some(next) = episode.checked_add(1).and_then(|e| by_episode.get(&e)) else {
                continue;
            };
            for &a in nodes {
                for &b in next {
                    insert_strongest(
                        edges,
                        a,
                        b,
                        LensEdge {
                            kind: EdgeKind::Temporal,
                            weight: self.config.temporal_weight,
                            via: None,
                        },
                    );
                }
            }
        }
    }
}

/// Jaccard overlap of related concepts
fn concept_edges(
    concepts: &[BTreeSet<String>],
    edges: &mut BTreeMap<(usize, usize, EdgeKind), LensEdge>,
) {
    for a in 0..concepts.len() {
        if concepts[a].is_empty() {
            continue;
        }
        for b in (a + 1)..concepts.len() {
            let shared: Vec<&str> = concepts[a]
                .intersection(&concepts[b])
                .map(String::as_str)
                .collect();
            if shared.is_empty() {
                continue;
            }
            let union = concepts[a].union(&concepts[b]).count();
            insert_strongest(
                edges,
                a,
                b,
                LensEdge {
                    kind: EdgeKind::Concept,
                    weight: shared.len() as f32 / union as f32,
                    via: Some(shared.join(", ")),
                },
            );
        }
    }
}

fn insert_strongest(
    edges: &mut BTreeMap<(usize, usize, EdgeKind), LensEdge>,
    a: usize,
    b: usize,
    edge: LensEdge,
) {
    if a == b {
        return;
    }
    let key = (a.min(b), a.max(b), edge.kind);
    match edges.get(&key) {
        Some(existing) if existing.weight >= edge.weight => {}
        _ => {
            edges.insert(key, edge);
        }
    }
}

/// Fill each lens's `embedding` and index the ones that have one.
///
/// Returns the index and the ids left without a vector.
fn attach_embeddings(
    lenses: &mut [Lens],
    embeddings: &VectorIndex,
) -> Result<(VectorIndex, Vec<String>)> {
    let mut dimension = (!embeddings.is_empty()).then(|| embeddings.dimension());
    let mut missing = Vec::new();
    let mut entries = Vec::new();

    for lens in lenses.iter_mut() {
        if let Some(vector) = embeddings.vector(&lens.id) {
            lens.embedding = vector.to_vec();
        }
        if lens.embedding.is_empty() {
            missing.push(lens.id.clone());
            continue;
        }
        let expected = *dimension.get_or_insert(lens.embedding.len());
        if lens.embedding.len() != expected {
            log::warn!(
                "Dropping embedding of {}: dimension {} != {}",
                lens.id,
                lens.embedding.len(),
                expected
            );
            lens.embedding.clear();
            missing.push(lens.id.clone());
            continue;
        }
        entries.push((lens.id.clone(), lens.embedding.clone()));
    }

    Ok((VectorIndex::from_entries(entries)?, missing))
}

/// Union of `Frame::lens_ids` and `Lens::frames`, unknown ids dropped.
///
/// Frames are ordered by id and members by node, so frame positions are
/// stable across builds.
fn assign_frames(
    lenses: &[Lens],
    frames: Vec<Frame>,
    node_of: &HashMap<String, usize>,
) -> (Vec<FrameInfo>, Vec<Vec<usize>>) {
    let mut members: BTreeMap<String, (String, BTreeSet<usize>)> = BTreeMap::new();
    for frame in frames {
        let entry = members
            .entry(frame.id.clone())
            .or_insert_with(|| (frame.name.clone(), BTreeSet::new()));
        for lens_id in &frame.lens_ids {
            match node_of.get(lens_id) {
                Some(&node) => {
                    entry.1.insert(node);
                }
                None => log::warn!("Frame {} lists unknown lens {}", frame.id, lens_id),
            }
        }
    }
    for (node, lens) in lenses.iter().enumerate() {
        for frame_id in &lens.frames {
            match members.get_mut(frame_id) {
                Some(entry) => {
                    entry.1.insert(node);
                }
                None => log::warn!("Lens {} names unknown frame {}", lens.id, frame_id),
            }
        }
    }

    let mut memberships = vec![Vec::new(); lenses.len()];
    let infos: Vec<FrameInfo> = members
        .into_iter()
        .enumerate()
        .map(|(pos, (id, (name, nodes)))| {
            for &node in &nodes {
                memberships[node].push(pos);
            }
            FrameInfo {
                id,
                name,
                members: nodes.into_iter().collect(),
            }
        })
        .collect();
    (infos, memberships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lens(id: &str, v: Vec<f32>) -> Lens {
        Lens::new(id, id.to_uppercase()).embedding(v)
    }

    fn no_vectors() -> VectorIndex {
        VectorIndex::from_entries(Vec::<(String, Vec<f32>)>::new()).unwrap()
    }

    #[test]
    fn test_frame_membership_union_and_weight() {
        let lenses = vec![
            lens("a", vec![1.0, 0.0]).frame("f1"),
            lens("b", vec![1.0, 0.0]),
            lens("c", vec![0.0, 1.0]).frame("f1").frame("nope"),
        ];
        let frames = vec![Frame::new("f1", "One").member("b").member("ghost")];

        let graph = GraphBuilder::default()
            .build(lenses, frames, &[], &no_vectors())
            .unwrap();

        let edges = graph.edges_between("a", "c").unwrap();
        assert_eq!(
            edges,
            vec![LensEdge {
                kind: EdgeKind::Frame,
                weight: 0.6 * 2.0 / 3.0,
                via: Some("f1".to_string()),
            }]
        );
        assert_eq!(graph.frames()[0].lens_count, 3);
    }

    #[test]
    fn test_semantic_edges_respect_threshold() {
        let lenses = vec![
            lens("a", vec![1.0, 0.0]),
            lens("b", vec![0.9, 0.1]),
            lens("c", vec![0.0, 1.0]),
        ];
        let graph = GraphBuilder::default()
            .build(lenses, vec![], &[], &no_vectors())
            .unwrap();

        assert_eq!(graph.edge_count_of(EdgeKind::Semantic), 1);
        assert!(graph.edges_between("a", "c").unwrap().is_empty());
        let ab = graph.edges_between("a", "b").unwrap();
        assert_eq!(ab.len(), 1);
        assert!(ab[0].weight > 0.99 && ab[0].weight <= 1.0);
    }

    #[test]
    fn test_temporal_and_concept_edges() {
        let lenses = vec![
            Lens::new("a", "A").episode(1).concept("Systems").concept("time"),
            Lens::new("b", "B").episode(2).concept("systems"),
            Lens::new("c", "C").episode(4),
        ];
        let graph = GraphBuilder::default()
            .build(lenses, vec![], &[], &no_vectors())
            .unwrap();

        let ab = graph.edges_between("A", "B").unwrap();
        assert_eq!(ab.len(), 2);
        assert_eq!(ab[0].kind, EdgeKind::Temporal);
        assert_eq!(ab[0].weight, 0.1);
        assert_eq!(ab[1].kind, EdgeKind::Concept);
        assert_eq!(ab[1].weight, 0.5);
        assert_eq!(ab[1].via.as_deref(), Some("systems"));
        assert!(graph.edges_between("B", "C").unwrap().is_empty());
        assert_eq!(graph.report().missing_embeddings.len(), 3);
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let err = GraphBuilder::default()
            .build(
                vec![Lens::new("a", "A"), Lens::new("a", "B")],
                vec![],
                &[],
                &no_vectors(),
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::BuildError(_)));
    }
}
