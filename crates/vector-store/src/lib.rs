//! # Lens Vector Store
//!
//! Embedding glue for the lens graph: precomputed vectors in, cosine
//! similarity out.
//!
//! ## Architecture
//!
//! ```text
//! EmbeddingSource (file, database, ...)
//!     │
//!     ├──> VectorIndex::collect
//!     │      └─> Row-normalised matrix [lenses x dimension]
//!     │
//!     └──> Queries
//!            ├─ similarity(a, b)
//!            └─ nearest(id, k, min_similarity)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lens_vector_store::{EmbeddingFile, VectorIndex};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let file = EmbeddingFile::load("lens_embeddings.json").await?;
//!     let ids: Vec<String> = file.ids().cloned().collect();
//!     let (index, missing) = VectorIndex::collect(&file, &ids).await?;
//!
//!     for neighbor in index.nearest(&ids[0], 5, 0.5)? {
//!         println!("{}: {:.3}", neighbor.id, neighbor.similarity);
//!     }
//!     assert!(missing.is_empty());
//!     Ok(())
//! }
//! ```

mod error;
mod file;
mod index;
mod source;

pub use error::{Result, VectorStoreError};
pub use file::{EmbeddingFile, EMBEDDING_FILE_SCHEMA_VERSION};
pub use index::{cosine_similarity, Neighbor, VectorIndex};
pub use source::EmbeddingSource;
