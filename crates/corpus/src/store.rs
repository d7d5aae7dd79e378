use crate::types::{ContrastOverride, Frame, Lens};
use async_trait::async_trait;

/// Read-only provider of curated lens records.
///
/// Only the snapshot rebuild path calls it; failures there leave the
/// previous snapshot serving.
#[async_trait]
pub trait LensStore: Send + Sync {
    async fn list_lenses(&self) -> anyhow::Result<Vec<Lens>>;

    async fn list_frames(&self) -> anyhow::Result<Vec<Frame>>;

    async fn list_contrast_overrides(&self) -> anyhow::Result<Vec<ContrastOverride>>;
}
