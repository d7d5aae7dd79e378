//! # Lens Corpus
//!
//! Records and the read-only store contract for the curated lens corpus.
//!
//! The corpus itself is authored offline. This crate only describes what a
//! store hands to the graph builder and ships a JSON-backed implementation:
//!
//! ```text
//! corpus.json
//!     ├─ lenses[]     (id, name, definition, episode, frames, concepts, embedding?)
//!     ├─ frames[]     (id, name, lens_ids)
//!     └─ contrasts[]  (curated overrides: lens_a, lens_b, insight?, score?)
//! ```

mod corpus;
mod error;
mod store;
mod types;

pub use corpus::{LensCorpus, CORPUS_SCHEMA_VERSION};
pub use error::{CorpusError, Result};
pub use store::LensStore;
pub use types::{ContrastOverride, Frame, Lens};
