use crate::error::{Result, VectorStoreError};
use crate::source::EmbeddingSource;
use ndarray::{Array2, ArrayView1, Axis};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Cosine similarity between two raw vectors.
///
/// Mismatched lengths and zero vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Neighbour returned by [`VectorIndex::nearest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub similarity: f32,
}

/// In-memory embedding index over precomputed lens vectors.
///
/// Rows are L2-normalised on construction, so similarity is a plain dot
/// product. Search is brute force: the corpus is a few hundred lenses.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Array2<f32>,
}

impl VectorIndex {
    /// Build an index from `(id, vector)` pairs.
    ///
    /// Every vector must share the dimension of the first one. Later duplicates
    /// of an id replace earlier ones.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut ids: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut vectors: Vec<Vec<f32>> = Vec::new();
        let mut dimension: Option<usize> = None;

        for (id, vector) in entries {
            let expected = *dimension.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    actual: vector.len(),
                });
            }
            match positions.get(&id) {
                Some(&pos) => vectors[pos] = vector,
                None => {
                    positions.insert(id.clone(), ids.len());
                    ids.push(id);
                    vectors.push(vector);
                }
            }
        }

        let dimension = dimension.unwrap_or(0);
        let flat: Vec<f32> = vectors.into_iter().flatten().collect();
        let mut rows = Array2::from_shape_vec((ids.len(), dimension), flat)
            .map_err(|e| VectorStoreError::IndexError(format!("Failed to shape matrix: {e}")))?;

        for mut row in rows.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }

        Ok(Self {
            ids,
            positions,
            rows,
        })
    }

    /// Fetch embeddings for `lens_ids` from `source` and index them.
    ///
    /// Returns the index together with the ids the source had no vector for.
    pub async fn collect(
        source: &dyn EmbeddingSource,
        lens_ids: &[String],
    ) -> Result<(Self, Vec<String>)> {
        let fetched = source
            .get_embeddings(lens_ids)
            .await
            .map_err(VectorStoreError::Source)?;

        let mut missing = Vec::new();
        let mut entries = Vec::with_capacity(fetched.len());
        for (id, vector) in lens_ids.iter().zip(fetched) {
            match vector {
                Some(vector) if !vector.is_empty() => entries.push((id.clone(), vector)),
                _ => missing.push(id.clone()),
            }
        }

        log::debug!(
            "Collected {} embeddings ({} missing)",
            entries.len(),
            missing.len()
        );

        Ok((Self::from_entries(entries)?, missing))
    }

    pub fn dimension(&self) -> usize {
        self.rows.ncols()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Normalised vector for `id`.
    pub fn vector(&self, id: &str) -> Option<ArrayView1<'_, f32>> {
        self.positions.get(id).map(|&pos| self.rows.row(pos))
    }

    /// Cosine similarity between two indexed ids.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let a = self.vector(a)?;
        let b = self.vector(b)?;
        Some(a.dot(&b))
    }

    /// Top `k` neighbours of an indexed id with similarity `>= min_similarity`.
    ///
    /// Sorted by similarity descending, ties by id. The id itself is excluded.
    pub fn nearest(&self, id: &str, k: usize, min_similarity: f32) -> Result<Vec<Neighbor>> {
        let query = self
            .vector(id)
            .ok_or_else(|| VectorStoreError::IndexError(format!("Unknown id: {id}")))?;
        Ok(self.rank(query, k, min_similarity, id))
    }

    fn rank(
        &self,
        query: ArrayView1<'_, f32>,
        k: usize,
        min_similarity: f32,
        exclude: &str,
    ) -> Vec<Neighbor> {
        let scores = self.rows.dot(&query);
        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(pos, score)| {
                *score >= min_similarity && self.ids[*pos] != exclude
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.ids[a.0].cmp(&self.ids[b.0]))
        });
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(pos, similarity)| Neighbor {
                id: self.ids[pos].clone(),
                similarity,
            })
            .collect()
    }
}
