//! Per-query scoring types

use serde::{Deserialize, Serialize};

use crate::Chunk;

/// How a candidate entered the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkOrigin {
    /// Returned by semantic and/or keyword search
    Organic,
    /// Pulled in by a textual reference inside an organic chunk
    CrossReference {
        from_chunk_id: String,
        statute: String,
    },
}

/// A chunk with its retrieval signals for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub semantic_score: f32,
    pub keyword_score: f32,
    pub exact_bonus: f32,
    pub boost_adjustment: f32,
    pub final_score: f32,
    pub origin: ChunkOrigin,
}

impl ScoredChunk {
    pub fn chunk_id(&self) -> &str {
        &self.chunk.chunk_id
    }

    pub fn has_exact_bonus(&self) -> bool {
        self.exact_bonus > 0.0
    }

    pub fn is_cross_reference(&self) -> bool {
        matches!(self.origin, ChunkOrigin::CrossReference { .. })
    }

    /// Scale every score component by a variant weight
    pub fn scaled(mut self, weight: f32) -> Self {
        self.semantic_score *= weight;
        self.keyword_score *= weight;
        self.exact_bonus *= weight;
        self.boost_adjustment *= weight;
        self.final_score *= weight;
        self
    }
}
