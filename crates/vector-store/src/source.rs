use async_trait::async_trait;

/// Read-only provider of precomputed lens embeddings.
///
/// Implemented by whatever holds the vectors (a JSON file, a database
/// column). Only the snapshot rebuild path calls it.
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    /// Embedding for one lens, `None` if the lens has not been embedded.
    async fn get_embedding(&self, lens_id: &str) -> anyhow::Result<Option<Vec<f32>>>;

    /// Embeddings for many lenses, in the order of `lens_ids`.
    async fn get_embeddings(&self, lens_ids: &[String]) -> anyhow::Result<Vec<Option<Vec<f32>>>> {
        let mut out = Vec::with_capacity(lens_ids.len());
        for id in lens_ids {
            out.push(self.get_embedding(id).await?);
        }
        Ok(out)
    }
}
