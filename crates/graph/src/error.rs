use lens_vector_store::VectorStoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// A lens or frame name did not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Raised internally while a rebuild is due; the service answers it by
    /// serving the last good snapshot
    #[error("Snapshot generation {generation} is stale")]
    StaleSnapshot { generation: u64 },

    /// Lens store or embedding source failed during rebuild
    #[error("Lens source failed: {0:#}")]
    Source(anyhow::Error),

    #[error("Graph build error: {0}")]
    BuildError(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<VectorStoreError> for GraphError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::Source(source) => GraphError::Source(source),
            other => GraphError::BuildError(other.to_string()),
        }
    }
}
