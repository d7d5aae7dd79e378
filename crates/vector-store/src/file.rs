use crate::error::{Result, VectorStoreError};
use crate::source::EmbeddingSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const EMBEDDING_FILE_SCHEMA_VERSION: u32 = 1;

/// Precomputed lens embeddings persisted as JSON.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingFile {
    dimension: Option<usize>,
    embeddings: BTreeMap<String, Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEmbeddings {
    schema_version: u32,
    dimension: usize,
    embeddings: BTreeMap<String, Vec<f32>>,
}

impl EmbeddingFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading embeddings from {:?}", path);
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedEmbeddings = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != EMBEDDING_FILE_SCHEMA_VERSION {
            return Err(VectorStoreError::SchemaVersion {
                expected: EMBEDDING_FILE_SCHEMA_VERSION,
                found: persisted.schema_version,
            });
        }

        let mut file = Self::new();
        file.dimension = Some(persisted.dimension);
        for (id, vector) in persisted.embeddings {
            file.insert(id, vector)?;
        }
        log::info!("Loaded {} embeddings", file.len());
        Ok(file)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedEmbeddings {
            schema_version: EMBEDDING_FILE_SCHEMA_VERSION,
            dimension: self.dimension.unwrap_or(0),
            embeddings: self.embeddings.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Add or replace a vector. The first vector fixes the dimension.
    pub fn insert(&mut self, lens_id: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        let expected = *self.dimension.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(VectorStoreError::InvalidDimension {
                expected,
                actual: vector.len(),
            });
        }
        self.embeddings.insert(lens_id.into(), vector);
        Ok(())
    }

    pub fn get(&self, lens_id: &str) -> Option<&[f32]> {
        self.embeddings.get(lens_id).map(Vec::as_slice)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.embeddings.keys()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

#[async_trait]
impl EmbeddingSource for EmbeddingFile {
    async fn get_embedding(&self, lens_id: &str) -> anyhow::Result<Option<Vec<f32>>> {
        Ok(self.get(lens_id).map(<[f32]>::to_vec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VectorIndex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn embedding_file_roundtrip_and_collect() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("embeddings.json");

        let mut file = EmbeddingFile::new();
        file.insert("kintsugi", vec![1.0, 0.0]).unwrap();
        file.insert("pace-layering", vec![0.0, 1.0]).unwrap();
        assert!(file.insert("bad", vec![1.0]).is_err());
        file.save(&path).await.unwrap();

        let loaded = EmbeddingFile::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), Some(2));

        let ids = vec![
            "kintsugi".to_string(),
            "missing".to_string(),
            "pace-layering".to_string(),
        ];
        let (index, missing) = VectorIndex::collect(&loaded, &ids).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(missing, vec!["missing".to_string()]);
    }

    #[tokio::test]
    async fn rejects_unknown_schema_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("embeddings.json");
        tokio::fs::write(
            &path,
            r#"{"schema_version": 9, "dimension": 2, "embeddings": {}}"#,
        )
        .await
        .unwrap();

        let err = EmbeddingFile::load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::SchemaVersion { expected: 1, found: 9 }
        ));
    }
}
