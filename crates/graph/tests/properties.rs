mod common;

use common::empty_index;
use lens_corpus::{Frame, Lens};
use lens_graph::{GraphBuilder, GraphConfig, LensGraph};
use proptest::prelude::*;
use std::collections::HashSet;

const CONCEPTS: [&str; 5] = ["systems", "time", "change", "risk", "identity"];

#[derive(Debug, Clone)]
struct LensSpec {
    embedding: Vec<f32>,
    episode: u32,
    frame: usize,
    concepts: Vec<usize>,
}

fn lens_spec() -> impl Strategy<Value = LensSpec> {
    (
        (0.1f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0),
        0u32..6,
        0usize..3,
        prop::collection::vec(0usize..CONCEPTS.len(), 0..3),
    )
        .prop_map(|((a, b, c, d), episode, frame, concepts)| LensSpec {
            embedding: vec![a, b, c, d],
            episode,
            frame,
            concepts,
        })
}

fn lenses(specs: &[LensSpec]) -> Vec<Lens> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut lens = Lens::new(format!("l{i:02}"), format!("Lens {i:02}"))
                .episode(spec.episode)
                .frame(format!("f{}", spec.frame))
                .embedding(spec.embedding.clone());
            for &c in &spec.concepts {
                lens = lens.concept(CONCEPTS[c]);
            }
            lens
        })
        .collect()
}

fn frames() -> Vec<Frame> {
    (0..3)
        .map(|i| Frame::new(format!("f{i}"), format!("Frame {i}")))
        .collect()
}

fn build(lenses: Vec<Lens>) -> LensGraph {
    GraphBuilder::new(GraphConfig::default())
        .build(lenses, frames(), &[], &empty_index())
        .expect("build graph")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn build_is_independent_of_input_order(
        specs in prop::collection::vec(lens_spec(), 2..10),
    ) {
        let forward = build(lenses(&specs));
        let mut reversed = lenses(&specs);
        reversed.reverse();
        let backward = build(reversed);

        prop_assert_eq!(forward.edges(), backward.edges());
        for lens in forward.lenses() {
            prop_assert_eq!(
                forward.contrasts(&lens.id).expect("contrasts"),
                backward.contrasts(&lens.id).expect("contrasts")
            );
        }
    }

    #[test]
    fn journeys_walk_real_edges(
        specs in prop::collection::vec(lens_spec(), 2..10),
        from in 0usize..10,
        to in 0usize..10,
    ) {
        let graph = build(lenses(&specs));
        let source = format!("l{:02}", from % specs.len());
        let target = format!("l{:02}", to % specs.len());

        let journey = graph.journey(&source, &target, Some(4)).expect("journey");
        prop_assert!(journey.paths.len() <= 4);

        let mut last_hops = 0;
        for path in &journey.paths {
            let ids: Vec<&str> = path.steps.iter().map(|s| s.lens_id.as_str()).collect();
            prop_assert_eq!(ids.first().copied(), Some(source.as_str()));
            prop_assert_eq!(ids.last().copied(), Some(target.as_str()));
            prop_assert_eq!(path.hops, ids.len() - 1);

            let distinct: HashSet<&str> = ids.iter().copied().collect();
            prop_assert_eq!(distinct.len(), ids.len());

            for pair in ids.windows(2) {
                let edges = graph.edges_between(pair[0], pair[1]).expect("edges");
                prop_assert!(!edges.is_empty());
            }

            prop_assert!(path.hops >= last_hops);
            last_hops = path.hops;
        }
    }

    #[test]
    fn contrasts_are_symmetric_and_in_band(
        specs in prop::collection::vec(lens_spec(), 2..10),
    ) {
        let graph = build(lenses(&specs));
        let band = &graph.config().contrast;

        for lens in graph.lenses() {
            for pair in graph.contrasts(&lens.id).expect("contrasts") {
                prop_assert!(pair.embedding_distance >= band.min_distance);
                prop_assert!(pair.embedding_distance <= band.max_distance);
                prop_assert!(pair.dialectic_score > band.min_score);

                let back = graph.contrasts(&pair.lens_b).expect("contrasts");
                prop_assert!(back.iter().any(|p| p.lens_b == pair.lens_a));
            }
        }
    }
}
