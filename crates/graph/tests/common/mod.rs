#![allow(dead_code)]

use lens_corpus::{ContrastOverride, Frame, Lens, LensCorpus};
use lens_graph::{GraphBuilder, GraphConfig, LensGraph};
use lens_vector_store::VectorIndex;

/// Five lenses in three frames, one curated contrast per lens.
///
/// Edges: Pace Layering - Feedback Loops (semantic, frame F1, concept),
/// Feedback Loops - Innovation Cascade (semantic, concept),
/// Kintsugi - Fleet of Theseus (frame F3). Two components, no temporal edges.
pub fn scenario_corpus() -> LensCorpus {
    LensCorpus::from_parts(
        vec![
            Lens::new("pace_layering", "Pace Layering")
                .definition("Slow layers govern while fast layers innovate.")
                .episode(1)
                .frame("f1")
                .concept("systems")
                .concept("time")
                .embedding(vec![1.0, 0.0, 0.0, 0.0]),
            Lens::new("feedback_loops", "Feedback Loops")
                .definition("Outputs circle back to shape inputs.")
                .episode(3)
                .frame("f1")
                .concept("Systems")
                .concept("innovation")
                .embedding(vec![0.78, 0.58, 0.2, 0.0]),
            Lens::new("innovation_cascade", "Innovation Cascade")
                .definition("One breakthrough unlocks the next.")
                .episode(5)
                .frame("f2")
                .concept("innovation")
                .embedding(vec![0.2, 0.98, 0.0, 0.0]),
            Lens::new("kintsugi", "Kintsugi")
                .definition("Repair that honours the break.")
                .episode(7)
                .frame("f3")
                .embedding(vec![0.0, 0.0, 1.0, 0.0]),
            Lens::new("fleet_of_theseus", "Fleet of Theseus")
                .definition("Replace every plank and ask what remains.")
                .episode(9)
                .frame("f3")
                .embedding(vec![0.0, 0.0, 0.3, 0.954]),
        ],
        vec![
            Frame::new("f1", "Systems & Time"),
            Frame::new("f2", "Innovation"),
            Frame::new("f3", "Change & Identity"),
        ],
        vec![
            ContrastOverride::new("kintsugi", "fleet_of_theseus")
                .insight("Mend what broke, or replace it piece by piece."),
            ContrastOverride::new("Pace Layering", "Innovation Cascade"),
            ContrastOverride::new("feedback_loops", "kintsugi").score(0.8),
        ],
    )
    .expect("scenario corpus")
}

pub fn empty_index() -> VectorIndex {
    VectorIndex::from_entries(Vec::<(String, Vec<f32>)>::new()).expect("empty index")
}

pub fn build(corpus: &LensCorpus, config: GraphConfig) -> LensGraph {
    GraphBuilder::new(config)
        .build(
            corpus.lenses().cloned().collect(),
            corpus.frames().cloned().collect(),
            corpus.contrasts(),
            &empty_index(),
        )
        .expect("build graph")
}

pub fn scenario_graph() -> LensGraph {
    build(&scenario_corpus(), GraphConfig::default())
}
