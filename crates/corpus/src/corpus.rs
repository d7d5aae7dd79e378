use crate::error::{CorpusError, Result};
use crate::store::LensStore;
use crate::types::{ContrastOverride, Frame, Lens};
use async_trait::async_trait;
use lens_vector_store::EmbeddingSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const CORPUS_SCHEMA_VERSION: u32 = 1;

/// JSON-backed lens corpus.
///
/// Serves as both the [`LensStore`] and, for lenses that carry an inline
/// `embedding`, the [`EmbeddingSource`].
#[derive(Debug, Clone, Default)]
pub struct LensCorpus {
    lenses: BTreeMap<String, Lens>,
    frames: BTreeMap<String, Frame>,
    contrasts: Vec<ContrastOverride>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCorpus {
    schema_version: u32,
    lenses: Vec<Lens>,
    #[serde(default)]
    frames: Vec<Frame>,
    #[serde(default)]
    contrasts: Vec<ContrastOverride>,
}

impl LensCorpus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        lenses: Vec<Lens>,
        frames: Vec<Frame>,
        contrasts: Vec<ContrastOverride>,
    ) -> Result<Self> {
        let mut corpus = Self::new();
        for lens in lenses {
            corpus.add_lens(lens)?;
        }
        for frame in frames {
            corpus.add_frame(frame)?;
        }
        corpus.contrasts = contrasts;
        Ok(corpus)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading lens corpus from {:?}", path);
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedCorpus = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != CORPUS_SCHEMA_VERSION {
            return Err(CorpusError::SchemaVersion {
                expected: CORPUS_SCHEMA_VERSION,
                found: persisted.schema_version,
            });
        }
        let corpus = Self::from_parts(persisted.lenses, persisted.frames, persisted.contrasts)?;
        log::info!(
            "Loaded {} lenses, {} frames, {} curated contrasts",
            corpus.lenses.len(),
            corpus.frames.len(),
            corpus.contrasts.len()
        );
        Ok(corpus)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedCorpus {
            schema_version: CORPUS_SCHEMA_VERSION,
            lenses: self.lenses.values().cloned().collect(),
            frames: self.frames.values().cloned().collect(),
            contrasts: self.contrasts.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub fn add_lens(&mut self, lens: Lens) -> Result<()> {
        if self.lenses.contains_key(&lens.id) {
            return Err(CorpusError::DuplicateLens(lens.id));
        }
        self.lenses.insert(lens.id.clone(), lens);
        Ok(())
    }

    pub fn add_frame(&mut self, frame: Frame) -> Result<()> {
        if self.frames.contains_key(&frame.id) {
            return Err(CorpusError::DuplicateFrame(frame.id));
        }
        self.frames.insert(frame.id.clone(), frame);
        Ok(())
    }

    pub fn add_contrast(&mut self, contrast: ContrastOverride) {
        self.contrasts.push(contrast);
    }

    #[must_use]
    pub fn get_lens(&self, lens_id: &str) -> Option<&Lens> {
        self.lenses.get(lens_id)
    }

    pub fn lenses(&self) -> impl Iterator<Item = &Lens> {
        self.lenses.values()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    pub fn contrasts(&self) -> &[ContrastOverride] {
        &self.contrasts
    }

    #[must_use]
    pub fn lens_count(&self) -> usize {
        self.lenses.len()
    }
}

#[async_trait]
impl LensStore for LensCorpus {
    async fn list_lenses(&self) -> anyhow::Result<Vec<Lens>> {
        Ok(self.lenses.values().cloned().collect())
    }

    async fn list_frames(&self) -> anyhow::Result<Vec<Frame>> {
        Ok(self.frames.values().cloned().collect())
    }

    async fn list_contrast_overrides(&self) -> anyhow::Result<Vec<ContrastOverride>> {
        Ok(self.contrasts.clone())
    }
}

#[async_trait]
impl EmbeddingSource for LensCorpus {
    async fn get_embedding(&self, lens_id: &str) -> anyhow::Result<Option<Vec<f32>>> {
        Ok(self
            .lenses
            .get(lens_id)
            .filter(|lens| !lens.embedding.is_empty())
            .map(|lens| lens.embedding.clone()))
    }
}
