use thiserror::Error;

pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unsupported corpus schema_version {found} (expected {expected})")]
    SchemaVersion { expected: u32, found: u32 },

    #[error("Duplicate lens id: {0}")]
    DuplicateLens(String),

    #[error("Duplicate frame id: {0}")]
    DuplicateFrame(String),
}
