//! Collaborator traits
//!
//! The retrieval core talks to the outside world through three seams only:
//!
//! ```text
//! Retrieval:
//!   - EmbeddingIndex: nearest-neighbour search over an external vector index
//!   - ChunkStore: full chunk listing and exact statute lookup
//!
//! Generation:
//!   - Generator: answer text plus the source ids it cited
//! ```

mod generation;
mod retrieval;

pub use generation::{GeneratedAnswer, Generator};
pub use retrieval::{ChunkStore, EmbeddingIndex, FilterOp, MetadataFilter, SearchFilters};
