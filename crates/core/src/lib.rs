//! Core traits and types for legal retrieval
//!
//! This crate provides the foundational types shared by the retrieval crates:
//! - Indexed chunk model with legal metadata (statute numbers, citations, currency)
//! - Per-query scoring types and the context packet handed to generation
//! - Confidence result and advisory flags
//! - Collaborator traits for the vector index, chunk store and generator
//! - Error types

pub mod chunk;
pub mod confidence;
pub mod context;
pub mod error;
pub mod scoring;
pub mod traits;

pub use chunk::{Chunk, DocType};
pub use confidence::{ConfidenceFlag, ConfidenceResult};
pub use context::{ContextPacket, ContextSource, RetrievalSignals, SourceKind};
pub use error::{Error, Result};
pub use scoring::{ChunkOrigin, ScoredChunk};

pub use traits::{
    // Retrieval collaborators
    ChunkStore,
    EmbeddingIndex,
    FilterOp,
    // Generation
    GeneratedAnswer,
    Generator,
    MetadataFilter,
    SearchFilters,
};
