mod common;

use common::{build, scenario_corpus, scenario_graph};
use lens_graph::{ContrastOrigin, EdgeKind, GraphConfig, GraphError};
use pretty_assertions::assert_eq;

#[test]
fn curated_contrast_is_returned_for_kintsugi() {
    let graph = scenario_graph();

    let contrasts = graph.contrasts("Kintsugi").expect("contrasts");
    let names: Vec<&str> = contrasts.iter().map(|c| c.lens_b.as_str()).collect();
    assert_eq!(names, vec!["Fleet of Theseus", "Feedback Loops"]);

    let theseus = &contrasts[0];
    assert_eq!(theseus.lens_a, "Kintsugi");
    assert_eq!(theseus.origin, ContrastOrigin::Curated);
    assert_eq!(theseus.dialectic_score, 0.91);
    assert_eq!(theseus.insight, "Mend what broke, or replace it piece by piece.");
    assert_eq!(contrasts[1].dialectic_score, 0.8);
}

#[test]
fn every_lens_has_an_in_band_contrast() {
    let graph = scenario_graph();

    for lens in graph.lenses() {
        let contrasts = graph.contrasts(&lens.name).expect("contrasts");
        assert!(!contrasts.is_empty(), "{} has no contrast", lens.name);
        for pair in contrasts {
            assert!(
                (0.65..=0.92).contains(&pair.embedding_distance),
                "{} <-> {} at distance {}",
                pair.lens_a,
                pair.lens_b,
                pair.embedding_distance
            );
        }
    }

    let coverage = graph.contrast_coverage();
    assert_eq!(coverage.covered, 5);
    assert_eq!(coverage.percent, 100.0);
    assert!(graph.report().uncovered_lenses.is_empty());
    assert_eq!(graph.report().curated_contrasts, 3);
}

#[test]
fn contrast_pairs_are_symmetric() {
    let graph = scenario_graph();

    let from_pace = graph.contrasts("Pace Layering").expect("contrasts");
    let from_cascade = graph.contrasts("Innovation Cascade").expect("contrasts");
    assert_eq!(from_pace.len(), 1);
    assert_eq!(from_cascade.len(), 1);
    assert_eq!(from_pace[0].lens_b, "Innovation Cascade");
    assert_eq!(from_cascade[0].lens_b, "Pace Layering");
    assert_eq!(
        from_pace[0].embedding_distance,
        from_cascade[0].embedding_distance
    );
    assert_eq!(
        from_pace[0].insight,
        "Pace Layering and Innovation Cascade form a curated dialectic pair."
    );
}

#[test]
fn coverage_of_one_frame() {
    let graph = scenario_graph();

    let report = graph
        .coverage(&["Pace Layering", "Feedback Loops"])
        .expect("coverage");

    assert_eq!(report.explored.len(), 1);
    assert_eq!(report.explored[0].frame_id, "f1");
    assert_eq!(report.explored[0].count, 2);
    assert!(report.underexplored.is_empty());
    let unexplored: Vec<&str> = report.unexplored.iter().map(|f| f.frame_id.as_str()).collect();
    assert_eq!(unexplored, vec!["f2", "f3"]);
    assert_eq!(report.counts["f1"], 2);
    assert_eq!(report.touched_frames, 1);
    assert!((report.coverage_percent - 100.0 / 3.0).abs() < 1e-4);
    assert_eq!(
        report.insight,
        "You've explored 1 of 3 conceptual dimensions (33%). Unexplored: Innovation, Change & Identity."
    );
}

#[test]
fn empty_context_has_zero_coverage() {
    let graph = scenario_graph();

    let report = graph.coverage::<&str>(&[]).expect("coverage");
    assert_eq!(report.coverage_percent, 0.0);
    assert_eq!(report.unexplored.len(), 3);
    assert!(report.explored.is_empty());
    assert!(report.underexplored.is_empty());
}

#[test]
fn repeated_context_lenses_count_once() {
    let graph = scenario_graph();

    let report = graph
        .coverage(&["Pace Layering", "pace layering", "pace_layering"])
        .expect("coverage");
    assert_eq!(report.context, vec!["Pace Layering".to_string()]);
    assert_eq!(report.underexplored.len(), 1);
    assert_eq!(report.underexplored[0].count, 1);
}

#[test]
fn feedback_loops_bridges_pace_layering_and_innovation_cascade() {
    let graph = scenario_graph();

    let bridges = graph
        .bridges(&["Pace Layering", "Innovation Cascade"])
        .expect("bridges");

    assert_eq!(bridges.len(), 1);
    let top = &bridges[0];
    assert_eq!(top.lens, "Feedback Loops");
    assert_eq!(
        top.connects,
        vec!["Pace Layering".to_string(), "Innovation Cascade".to_string()]
    );
    assert_eq!(
        top.shared_concepts,
        vec!["innovation".to_string(), "systems".to_string()]
    );
    assert!(top.score > 0.9);
}

#[test]
fn bridges_never_return_inputs() {
    let graph = scenario_graph();

    for pair in [
        ["Pace Layering", "Feedback Loops"],
        ["Feedback Loops", "Innovation Cascade"],
        ["Kintsugi", "Fleet of Theseus"],
    ] {
        let bridges = graph.bridges(&pair).expect("bridges");
        assert!(bridges.iter().all(|b| !pair.contains(&b.lens.as_str())));
    }
}

#[test]
fn bridges_need_two_distinct_lenses() {
    let graph = scenario_graph();

    assert!(matches!(
        graph.bridges(&["Kintsugi"]),
        Err(GraphError::InvalidInput(_))
    ));
    assert!(matches!(
        graph.bridges(&["Kintsugi", "kintsugi"]),
        Err(GraphError::InvalidInput(_))
    ));
    assert!(matches!(
        graph.bridges(&["Kintsugi", "Qqqzz"]),
        Err(GraphError::NotFound(_))
    ));
}

#[test]
fn edge_kinds_coexist_between_one_pair() {
    let graph = scenario_graph();

    let kinds: Vec<EdgeKind> = graph
        .edges_between("Pace Layering", "Feedback Loops")
        .expect("edges")
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![EdgeKind::Semantic, EdgeKind::Frame, EdgeKind::Concept]
    );
    assert_eq!(graph.edge_count_of(EdgeKind::Temporal), 0);
    assert!(graph.edges().iter().all(|e| e.weight > 0.0 && e.weight <= 1.0));
}

#[test]
fn out_of_band_override_is_rejected() {
    let mut corpus = scenario_corpus();
    corpus.add_contrast(lens_corpus::ContrastOverride::new(
        "pace_layering",
        "feedback_loops",
    ));
    corpus.add_contrast(lens_corpus::ContrastOverride::new("kintsugi", "Qqqzz"));

    let graph = build(&corpus, GraphConfig::default());
    let rejected = &graph.report().rejected_overrides;
    assert_eq!(rejected.len(), 2);
    assert!(rejected[0].reason.starts_with("embedding distance"));
    assert_eq!(rejected[1].reason, "unknown lens");

    let names: Vec<String> = graph
        .contrasts("Pace Layering")
        .expect("contrasts")
        .into_iter()
        .map(|c| c.lens_b)
        .collect();
    assert_eq!(names, vec!["Innovation Cascade".to_string()]);
}

#[test]
fn low_scoring_override_is_rejected() {
    let scenario = scenario_corpus();
    let corpus = lens_corpus::LensCorpus::from_parts(
        scenario.lenses().cloned().collect(),
        scenario.frames().cloned().collect(),
        vec![
            lens_corpus::ContrastOverride::new("kintsugi", "fleet_of_theseus"),
            lens_corpus::ContrastOverride::new("pace_layering", "innovation_cascade").score(0.05),
            lens_corpus::ContrastOverride::new("feedback_loops", "kintsugi").score(0.8),
        ],
    )
    .expect("corpus");

    let graph = build(&corpus, GraphConfig::default());
    let rejected = &graph.report().rejected_overrides;
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].lens_a, "pace_layering");
    assert!(rejected[0].reason.starts_with("dialectic score 0.050"));
    assert_eq!(graph.report().curated_contrasts, 2);

    assert!(graph.contrasts("Pace Layering").expect("contrasts").is_empty());
    assert_eq!(
        graph.report().uncovered_lenses,
        vec!["Innovation Cascade".to_string(), "Pace Layering".to_string()]
    );

    let min_score = graph.config().contrast.min_score;
    for lens in graph.lenses() {
        for pair in graph.contrasts(&lens.id).expect("contrasts") {
            assert!(pair.dialectic_score > min_score, "{pair:?}");
        }
    }
}

#[test]
fn enforce_coverage_fails_uncovered_builds() {
    let corpus = lens_corpus::LensCorpus::from_parts(
        scenario_corpus().lenses().cloned().collect(),
        scenario_corpus().frames().cloned().collect(),
        vec![],
    )
    .expect("corpus");

    let mut config = GraphConfig::default();
    config.contrast.enforce_coverage = true;
    let err = lens_graph::GraphBuilder::new(config)
        .build(
            corpus.lenses().cloned().collect(),
            corpus.frames().cloned().collect(),
            corpus.contrasts(),
            &common::empty_index(),
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::BuildError(_)));

    let graph = build(&corpus, GraphConfig::default());
    assert_eq!(graph.report().uncovered_lenses.len(), 5);
    assert_eq!(graph.contrast_coverage().percent, 0.0);
}
