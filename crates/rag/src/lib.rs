//! Legal retrieval and ranking
//!
//! Turns a natural-language or citation-form query into a bounded, diverse,
//! budget-constrained context packet, and scores the resulting answer.
//!
//! Features:
//! - Query enhancement with citation-safe abbreviation/synonym/spelling variants
//! - Semantic search adapter over an external vector index
//! - BM25 keyword search via Tantivy with citation-preserving tokenization
//! - Exact statute/case citation detection
//! - Hybrid scoring with jurisdiction, freshness and department boosts
//! - Depth-1 cross-reference expansion ("see also § 346.63")
//! - Budgeted, type-diverse context assembly
//! - Confidence estimation with advisory flags

pub mod confidence;
pub mod context;
pub mod cross_reference;
pub mod exact_match;
pub mod hybrid;
pub mod keyword_index;
pub mod lexicon;
pub mod pipeline;
pub mod query_enhancer;
pub mod relevance;
pub mod semantic;
pub mod store;

pub use confidence::{ConfidenceEstimator, ConfidenceInputs};
pub use context::{estimate_tokens, ContextAssembler, ContextBudget};
pub use cross_reference::{extract_references, CrossReferenceResolver, ResolutionStats};
pub use exact_match::{normalize_citation, normalize_statute, ExactMatchDetector, ExactMatches};
pub use hybrid::{rank, HybridScorer, ScoringContext};
pub use keyword_index::{KeywordIndex, KeywordIndexHandle, KeywordSearch};
pub use pipeline::{AnswerWithConfidence, LegalRetriever, LegalRetrieverBuilder};
pub use query_enhancer::{QueryEnhancer, QueryVariant, VariantSource};
pub use relevance::{BoostReason, RelevanceBooster};
pub use semantic::SemanticSearch;
pub use store::InMemoryChunkStore;

use thiserror::Error;

/// Retrieval errors
///
/// Only `InvalidConfig` and `BackendUnavailable` escape `retrieve`; the rest
/// are absorbed inside the component that raised them.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("All search backends unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Generation error: {0}")]
    Generation(String),
}

impl From<legal_rag_config::ConfigError> for RagError {
    fn from(err: legal_rag_config::ConfigError) -> Self {
        RagError::InvalidConfig(err.to_string())
    }
}

impl From<legal_rag_core::Error> for RagError {
    fn from(err: legal_rag_core::Error) -> Self {
        match err {
            legal_rag_core::Error::Timeout(msg) => RagError::Timeout(msg),
            other => RagError::Search(other.to_string()),
        }
    }
}

impl From<RagError> for legal_rag_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::InvalidConfig(msg) => legal_rag_core::Error::InvalidInput(msg),
            RagError::Timeout(msg) => legal_rag_core::Error::Timeout(msg),
            other => legal_rag_core::Error::Rag(other.to_string()),
        }
    }
}
