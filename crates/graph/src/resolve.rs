//! Name resolution.
//!
//! Lookups go through two stages with fixed precedence:
//!
//! 1. exact lens id, then exact display name, then the name with case and
//!    whitespace folded;
//! 2. fuzzy match over display names (only when `names.fuzzy_fallback` is on).
//!
//! Stage 2 never overrides a stage 1 hit. Fuzzy candidates are scored with
//! nucleo relative to a perfect match of the query and must reach
//! `names.fuzzy_min_score`; ties go to the shorter name, then the lower lens
//! id. The same query against the same snapshot always resolves the same way.

use crate::error::{GraphError, Result};
use crate::graph::{fold_name, LensGraph};
use lens_corpus::Lens;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Matcher, Utf32String};
use std::collections::BTreeSet;

impl LensGraph {
    pub(crate) fn resolve(&self, name: &str) -> Result<usize> {
        let query = name.trim();
        if query.is_empty() {
            return Err(GraphError::NotFound("empty lens name".to_string()));
        }

        if let Some(&node) = self
            .id_index
            .get(query)
            .or_else(|| self.name_index.get(query))
            .or_else(|| self.folded_index.get(&fold_name(query)))
        {
            return Ok(node);
        }

        if self.config.names.fuzzy_fallback {
            if let Some(node) = self.fuzzy_resolve(query) {
                log::debug!("Resolved {:?} to {:?} by fuzzy match", query, self.name_of(node));
                return Ok(node);
            }
        }

        Err(GraphError::NotFound(format!("lens '{name}'")))
    }

    /// Resolve a list of names, dropping repeats while keeping first-seen order
    pub(crate) fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut seen = BTreeSet::new();
        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            let node = self.resolve(name.as_ref())?;
            if seen.insert(node) {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    pub(crate) fn resolve_frame(&self, name: &str) -> Result<usize> {
        let query = name.trim();
        self.frame_index
            .get(query)
            .or_else(|| self.frame_index.get(&fold_name(query)))
            .copied()
            .ok_or_else(|| GraphError::NotFound(format!("frame '{name}'")))
    }

    /// Canonical display name for a lens name, id or near-miss spelling
    pub fn resolve_name(&self, name: &str) -> Result<&str> {
        Ok(self.name_of(self.resolve(name)?))
    }

    /// Lenses belonging to a frame, addressed by frame id or name
    pub fn frame_lenses(&self, frame: &str) -> Result<Vec<&Lens>> {
        let pos = self.resolve_frame(frame)?;
        Ok(self.frames[pos]
            .members
            .iter()
            .map(|&node| self.lens_at(node))
            .collect())
    }

    fn fuzzy_resolve(&self, query: &str) -> Option<usize> {
        let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);

        let own = Utf32String::from(query);
        let perfect = pattern.score(own.slice(..), &mut matcher)? as f32;
        if perfect <= 0.0 {
            return None;
        }

        let min_score = self.config.names.fuzzy_min_score;
        let mut best: Option<(f32, usize, usize)> = None;
        for idx in self.graph.node_indices() {
            let lens = &self.graph[idx];
            let haystack = Utf32String::from(lens.name.as_str());
            let Some(score) = pattern.score(haystack.slice(..), &mut matcher) else {
                continue;
            };
            let score = score as f32 / perfect;
            if score < min_score {
                continue;
            }
            let node = idx.index();
            let len = lens.name.chars().count();
            let better = match best {
                None => true,
                Some((s, l, n)) => score > s || (score == s && (len, node) < (l, n)),
            };
            if better {
                best = Some((score, len, node));
            }
        }
        best.map(|(_, _, node)| node)
    }
}
