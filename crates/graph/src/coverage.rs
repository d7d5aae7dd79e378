//! Frame coverage and gap-aware selection.
//!
//! A frame is *touched* once any context lens belongs to it. Coverage
//! percentage counts touched frames. The tiers used for selection are
//! derived from the same counts: unexplored (0), underexplored (exactly 1)
//! and explored (2 or more). A lens in several frames is drawn through its
//! least explored one.

use crate::error::{GraphError, Result};
use crate::graph::LensGraph;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Probability mass of the unexplored, underexplored and random tiers
const TIER_MASS: [f64; 3] = [0.80, 0.15, 0.05];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameCount {
    pub frame_id: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Resolved context lens names, deduplicated
    pub context: Vec<String>,
    pub explored: Vec<FrameCount>,
    pub underexplored: Vec<FrameCount>,
    pub unexplored: Vec<FrameCount>,
    /// Frame id to number of context lenses in it, for every frame
    pub counts: BTreeMap<String, usize>,
    pub total_frames: usize,
    pub touched_frames: usize,
    pub coverage_percent: f32,
    pub insight: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionTier {
    Unexplored,
    Underexplored,
    Random,
}

/// Why a lens was picked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReport {
    pub tier: SelectionTier,

    /// Frame the pick was drawn from (`None` for the random tier)
    pub suggested_from_frame: Option<String>,

    /// The lens belongs to a frame the context has not touched
    pub was_gap_biased: bool,
    pub explored_frames: usize,
    pub unexplored_frames: usize,
    pub total_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasedPick {
    pub lens: String,
    pub lens_id: String,
    pub tier: SelectionTier,
    pub gap: GapReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapSuggestion {
    pub frame_id: String,
    pub frame_name: String,
    pub lenses: Vec<String>,
}

impl LensGraph {
    fn frame_counts(&self, nodes: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.frames.len()];
        for &node in nodes {
            for &pos in &self.memberships[node] {
                counts[pos] += 1;
            }
        }
        counts
    }

    /// Tally which frames a context has touched.
    ///
    /// Each distinct context lens adds one to every frame it belongs to.
    /// Unknown names fail with `NotFound`.
    #[doc(alias = "frame_coverage")]
    pub fn coverage<S: AsRef<str>>(&self, context: &[S]) -> Result<CoverageReport> {
        let nodes = self.resolve_all(context)?;
        let counts = self.frame_counts(&nodes);

        let mut tally = BTreeMap::new();
        let mut explored = Vec::new();
        let mut underexplored = Vec::new();
        let mut unexplored = Vec::new();
        for (frame, &count) in self.frames.iter().zip(&counts) {
            let entry = FrameCount {
                frame_id: frame.id.clone(),
                name: frame.name.clone(),
                count,
            };
            tally.insert(frame.id.clone(), count);
            match count {
                0 => unexplored.push(entry),
                1 => underexplored.push(entry),
                _ => explored.push(entry),
            }
        }

        let total_frames = self.frames.len();
        let touched_frames = explored.len() + underexplored.len();
        let coverage_percent = if total_frames == 0 {
            0.0
        } else {
            touched_frames as f32 / total_frames as f32 * 100.0
        };

        let mut insight = format!(
            "You've explored {touched_frames} of {total_frames} conceptual dimensions ({coverage_percent:.0}%)."
        );
        if !unexplored.is_empty() {
            let names: Vec<&str> = unexplored.iter().take(3).map(|f| f.name.as_str()).collect();
            insight.push_str(&format!(" Unexplored: {}.", names.join(", ")));
        }

        Ok(CoverageReport {
            context: nodes.iter().map(|&n| self.name_of(n).to_string()).collect(),
            explored,
            underexplored,
            unexplored,
            counts: tally,
            total_frames,
            touched_frames,
            coverage_percent,
            insight,
        })
    }

    fn members_of(&self, frames: &[FrameCount]) -> BTreeSet<usize> {
        frames
            .iter()
            .filter_map(|f| self.frame_index.get(&f.frame_id))
            .flat_map(|&pos| self.frames[pos].members.iter().copied())
            .collect()
    }

    /// Selection pools in node order.
    ///
    /// A lens in any unexplored frame belongs to the unexplored pool only,
    /// so the underexplored pool never draws from a gap.
    fn tier_pools(&self, coverage: &CoverageReport) -> [Vec<usize>; 3] {
        let unexplored = self.members_of(&coverage.unexplored);
        let underexplored: Vec<usize> = self
            .members_of(&coverage.underexplored)
            .difference(&unexplored)
            .copied()
            .collect();
        [
            unexplored.into_iter().collect(),
            underexplored,
            (0..self.lens_count()).collect(),
        ]
    }

    /// Draw a lens with 80/15/5 odds for unexplored, underexplored and any
    /// frame.
    ///
    /// An empty tier passes its mass on to the next tier. A context that
    /// touches nothing draws uniformly over all lenses.
    pub fn biased_select<R: Rng + ?Sized>(
        &self,
        coverage: &CoverageReport,
        rng: &mut R,
    ) -> Result<BiasedPick> {
        if self.lens_count() == 0 {
            return Err(GraphError::InvalidInput("the graph has no lenses".to_string()));
        }

        let [unexplored, underexplored, everything] = self.tier_pools(coverage);
        let (tier, pool) = if coverage.touched_frames == 0 {
            (SelectionTier::Random, everything)
        } else {
            let tiers = [
                SelectionTier::Unexplored,
                SelectionTier::Underexplored,
                SelectionTier::Random,
            ];
            let mut pools = vec![unexplored, underexplored, everything];

            let mut mass = TIER_MASS;
            for i in 0..2 {
                if pools[i].is_empty() {
                    mass[i + 1] += mass[i];
                    mass[i] = 0.0;
                }
            }

            let roll: f64 = rng.gen();
            let mut acc = 0.0;
            let mut chosen = 2;
            for (i, m) in mass.iter().enumerate() {
                acc += m;
                if *m > 0.0 && roll < acc {
                    chosen = i;
                    break;
                }
            }
            (tiers[chosen], pools.swap_remove(chosen))
        };

        let node = pool[rng.gen_range(0..pool.len())];
        let gap = self.gap_report(node, tier, coverage);
        let lens = self.lens_at(node);
        log::debug!("biased pick {} from {:?} tier", lens.name, tier);

        Ok(BiasedPick {
            lens: lens.name.clone(),
            lens_id: lens.id.clone(),
            tier,
            gap,
        })
    }

    fn gap_report(&self, node: usize, tier: SelectionTier, coverage: &CoverageReport) -> GapReport {
        let unexplored: BTreeSet<&str> = coverage
            .unexplored
            .iter()
            .map(|f| f.frame_id.as_str())
            .collect();
        let underexplored: BTreeSet<&str> = coverage
            .underexplored
            .iter()
            .map(|f| f.frame_id.as_str())
            .collect();

        let frames = self.memberships[node].iter().map(|&pos| &self.frames[pos]);
        let suggested_from_frame = match tier {
            SelectionTier::Unexplored => frames
                .clone()
                .find(|f| unexplored.contains(f.id.as_str()))
                .map(|f| f.name.clone()),
            SelectionTier::Underexplored => frames
                .clone()
                .find(|f| underexplored.contains(f.id.as_str()))
                .map(|f| f.name.clone()),
            SelectionTier::Random => None,
        };
        let was_gap_biased = frames.clone().any(|f| unexplored.contains(f.id.as_str()));

        GapReport {
            tier,
            suggested_from_frame,
            was_gap_biased,
            explored_frames: coverage.touched_frames,
            unexplored_frames: coverage.unexplored.len(),
            total_frames: coverage.total_frames,
        }
    }

    /// Gap-aware random lens; `None` or an empty context draws uniformly
    pub fn biased_random<S: AsRef<str>, R: Rng + ?Sized>(
        &self,
        context: Option<&[S]>,
        rng: &mut R,
    ) -> Result<BiasedPick> {
        let coverage = match context {
            Some(names) => self.coverage(names)?,
            None => self.coverage::<&str>(&[])?,
        };
        self.biased_select(&coverage, rng)
    }

    /// Sample up to `per_frame` lenses from each of the first `max_frames`
    /// unexplored frames
    pub fn gap_suggestions<S: AsRef<str>, R: Rng + ?Sized>(
        &self,
        context: &[S],
        max_frames: usize,
        per_frame: usize,
        rng: &mut R,
    ) -> Result<Vec<GapSuggestion>> {
        if context.is_empty() {
            return Err(GraphError::InvalidInput(
                "gap suggestions need a context".to_string(),
            ));
        }
        let coverage = self.coverage(context)?;

        let mut suggestions = Vec::new();
        for frame in coverage.unexplored.iter().take(max_frames) {
            let Some(&pos) = self.frame_index.get(&frame.frame_id) else {
                continue;
            };
            let lenses: Vec<String> = self.frames[pos]
                .members
                .choose_multiple(rng, per_frame)
                .map(|&node| self.name_of(node).to_string())
                .collect();
            if lenses.is_empty() {
                continue;
            }
            suggestions.push(GapSuggestion {
                frame_id: frame.frame_id.clone(),
                frame_name: frame.name.clone(),
                lenses,
            });
        }
        Ok(suggestions)
    }
}
