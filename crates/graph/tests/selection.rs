mod common;

use common::{build, scenario_graph};
use lens_corpus::{Frame, Lens, LensCorpus};
use lens_graph::{GraphConfig, GraphError, SelectionTier};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

const DRAWS: usize = 4000;

fn tally(context: Option<&[&str]>, seed: u64) -> HashMap<SelectionTier, usize> {
    let graph = scenario_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut counts = HashMap::new();
    for _ in 0..DRAWS {
        let pick = graph.biased_random(context, &mut rng).expect("pick");
        *counts.entry(pick.tier).or_insert(0) += 1;
    }
    counts
}

fn share(counts: &HashMap<SelectionTier, usize>, tier: SelectionTier) -> f64 {
    counts.get(&tier).copied().unwrap_or(0) as f64 / DRAWS as f64
}

#[test]
fn selection_favours_unexplored_frames() {
    let counts = tally(Some(&["Pace Layering"][..]), 7);

    let unexplored = share(&counts, SelectionTier::Unexplored);
    let underexplored = share(&counts, SelectionTier::Underexplored);
    let random = share(&counts, SelectionTier::Random);
    assert!((0.75..=0.85).contains(&unexplored), "unexplored {unexplored}");
    assert!((0.10..=0.20).contains(&underexplored), "underexplored {underexplored}");
    assert!(random < 0.10, "random {random}");
}

/// One context lens in "Feedback", eight lenses spanning "Feedback" and the
/// unexplored "Uncharted", one in "Uncharted" only and ten in "Settled",
/// which the context explores twice.
fn overlapping_corpus() -> LensCorpus {
    let mut lenses = vec![
        Lens::new("context", "Context").frame("feedback"),
        Lens::new("uncharted_only", "Uncharted Only").frame("uncharted"),
    ];
    for i in 0..8 {
        lenses.push(
            Lens::new(format!("both_{i}"), format!("Both {i}"))
                .frame("feedback")
                .frame("uncharted"),
        );
    }
    for i in 0..10 {
        lenses.push(Lens::new(format!("settled_{i}"), format!("Settled {i}")).frame("settled"));
    }
    LensCorpus::from_parts(
        lenses,
        vec![
            Frame::new("feedback", "Feedback"),
            Frame::new("settled", "Settled"),
            Frame::new("uncharted", "Uncharted"),
        ],
        vec![],
    )
    .expect("overlapping corpus")
}

#[test]
fn lenses_in_a_gap_are_only_drawn_as_gaps() {
    let graph = build(&overlapping_corpus(), GraphConfig::default());
    let coverage = graph
        .coverage(&["context", "settled_0", "settled_1"])
        .expect("coverage");
    assert_eq!(coverage.underexplored.len(), 1);
    assert_eq!(coverage.unexplored[0].frame_id, "uncharted");

    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let mut gap_draws = 0;
    for _ in 0..DRAWS {
        let pick = graph.biased_select(&coverage, &mut rng).expect("pick");
        if pick.tier == SelectionTier::Underexplored {
            assert_eq!(pick.lens, "Context");
            assert!(!pick.gap.was_gap_biased);
        }
        if pick.gap.was_gap_biased {
            gap_draws += 1;
        }
    }

    // 0.80 from the gap tier plus 9 of 20 lenses in the random tier
    let share = gap_draws as f64 / DRAWS as f64;
    assert!((0.75..=0.85).contains(&share), "gap share {share}");
}

#[test]
fn empty_tier_passes_its_mass_on() {
    // Systems & Time is explored twice, nothing is underexplored
    let counts = tally(Some(&["Pace Layering", "Feedback Loops"][..]), 11);
    assert_eq!(counts.get(&SelectionTier::Underexplored), None);
    assert!(share(&counts, SelectionTier::Unexplored) > 0.7);

    // Every frame touched once, nothing is unexplored
    let counts = tally(
        Some(&["Pace Layering", "Innovation Cascade", "Kintsugi"][..]),
        13,
    );
    assert_eq!(counts.get(&SelectionTier::Unexplored), None);
    assert!(share(&counts, SelectionTier::Underexplored) > 0.85);
}

#[test]
fn no_context_is_uniform() {
    let graph = scenario_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let mut seen = HashMap::new();
    for _ in 0..500 {
        let pick = graph
            .biased_random::<&str, _>(None, &mut rng)
            .expect("pick");
        assert_eq!(pick.tier, SelectionTier::Random);
        assert_eq!(pick.gap.suggested_from_frame, None);
        assert_eq!(pick.gap.explored_frames, 0);
        *seen.entry(pick.lens).or_insert(0) += 1;
    }
    assert_eq!(seen.len(), 5);

    let empty: &[&str] = &[];
    let pick = graph.biased_random(Some(empty), &mut rng).expect("pick");
    assert_eq!(pick.tier, SelectionTier::Random);
}

#[test]
fn gap_report_names_the_source_frame() {
    let graph = scenario_graph();
    let coverage = graph.coverage(&["Pace Layering"]).expect("coverage");
    let mut rng = ChaCha8Rng::seed_from_u64(5);

    for _ in 0..200 {
        let pick = graph.biased_select(&coverage, &mut rng).expect("pick");
        assert_eq!(pick.gap.total_frames, 3);
        assert_eq!(pick.gap.explored_frames, 1);
        assert_eq!(pick.gap.unexplored_frames, 2);
        match pick.tier {
            SelectionTier::Unexplored => {
                assert!(pick.gap.was_gap_biased);
                assert!(matches!(
                    pick.gap.suggested_from_frame.as_deref(),
                    Some("Innovation") | Some("Change & Identity")
                ));
            }
            SelectionTier::Underexplored => {
                assert!(!pick.gap.was_gap_biased);
                assert_eq!(
                    pick.gap.suggested_from_frame.as_deref(),
                    Some("Systems & Time")
                );
            }
            SelectionTier::Random => assert_eq!(pick.gap.suggested_from_frame, None),
        }
    }
}

#[test]
fn same_seed_same_picks() {
    let graph = scenario_graph();
    let context = ["Kintsugi"];
    let draw = |seed| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..20)
            .map(|_| graph.biased_random(Some(&context[..]), &mut rng).expect("pick").lens)
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(42), draw(42));
}

#[test]
fn gap_suggestions_sample_unexplored_frames() {
    let graph = scenario_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    let suggestions = graph
        .gap_suggestions(&["Pace Layering"], 5, 1, &mut rng)
        .expect("suggestions");
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].frame_id, "f2");
    assert_eq!(suggestions[0].lenses, vec!["Innovation Cascade".to_string()]);
    assert_eq!(suggestions[1].frame_name, "Change & Identity");
    assert_eq!(suggestions[1].lenses.len(), 1);
    assert!(["Kintsugi", "Fleet of Theseus"].contains(&suggestions[1].lenses[0].as_str()));

    let first_only = graph
        .gap_suggestions(&["Pace Layering"], 1, 3, &mut rng)
        .expect("suggestions");
    assert_eq!(first_only.len(), 1);

    let everything = graph
        .gap_suggestions(&["Pace Layering", "Innovation Cascade", "Kintsugi"], 5, 2, &mut rng)
        .expect("suggestions");
    assert!(everything.is_empty());

    assert!(matches!(
        graph.gap_suggestions::<&str, _>(&[], 3, 2, &mut rng),
        Err(GraphError::InvalidInput(_))
    ));
}
