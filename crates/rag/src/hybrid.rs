//! Hybrid scoring
//!
//! ```text
//! final = semantic_weight * semantic
//!       + keyword_weight  * keyword / max(keyword)
//!       + exact_bonus
//!       + boost_adjustment
//! ```
//!
//! Candidates are the union of both result sets; a chunk missing from one
//! side contributes 0 for that term. Variant passes are scaled by their
//! weight and folded into one pool keyed by chunk_id, keeping the higher
//! scaled score.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use legal_rag_config::RetrievalConfig;
use legal_rag_core::{Chunk, ChunkOrigin, ScoredChunk, SearchFilters};

use crate::exact_match::{ExactMatchDetector, ExactMatches};
use crate::relevance::RelevanceBooster;

/// Per-request inputs shared by every variant pass
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub filters: &'a SearchFilters,
    pub exact: &'a ExactMatches,
}

pub struct HybridScorer {
    semantic_weight: f32,
    keyword_weight: f32,
    detector: ExactMatchDetector,
    booster: RelevanceBooster,
}

impl HybridScorer {
    pub fn new(config: &RetrievalConfig, booster: RelevanceBooster) -> Self {
        Self {
            semantic_weight: config.semantic_weight,
            keyword_weight: config.keyword_weight,
            detector: ExactMatchDetector::new(config.exact_match_bonus),
            booster,
        }
    }

    pub fn detector(&self) -> &ExactMatchDetector {
        &self.detector
    }

    pub fn booster(&self) -> &RelevanceBooster {
        &self.booster
    }

    /// Score one variant's semantic and keyword hits, scaled by `weight`
    pub fn score_variant(
        &self,
        semantic: Vec<(Chunk, f32)>,
        keyword: Vec<(Chunk, f32)>,
        ctx: ScoringContext<'_>,
        weight: f32,
    ) -> Vec<ScoredChunk> {
        let max_keyword = keyword
            .iter()
            .map(|(_, s)| *s)
            .filter(|s| s.is_finite())
            .fold(0.0_f32, f32::max);

        // chunk_id -> (chunk, semantic, keyword); ordered map keeps output stable
        let mut pool: BTreeMap<String, (Chunk, f32, f32)> = BTreeMap::new();

        for (chunk, score) in semantic {
            let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
            let entry = pool
                .entry(chunk.chunk_id.clone())
                .or_insert_with(|| (chunk, 0.0, 0.0));
            entry.1 = entry.1.max(score);
        }

        for (chunk, score) in keyword {
            let normalized = if max_keyword > 0.0 && score.is_finite() {
                (score / max_keyword).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let entry = pool
                .entry(chunk.chunk_id.clone())
                .or_insert_with(|| (chunk, 0.0, 0.0));
            entry.2 = entry.2.max(normalized);
        }

        pool.into_values()
            .filter(|(chunk, _, _)| ctx.filters.admits(chunk))
            .map(|(chunk, semantic_score, keyword_score)| {
                let scored = self.score_one(chunk, semantic_score, keyword_score, ctx);
                if weight == 1.0 {
                    scored
                } else {
                    scored.scaled(weight)
                }
            })
            .collect()
    }

    fn score_one(
        &self,
        chunk: Chunk,
        semantic_score: f32,
        keyword_score: f32,
        ctx: ScoringContext<'_>,
    ) -> ScoredChunk {
        let exact_bonus = self.detector.bonus_for(ctx.exact, &chunk);
        let boosts = self.booster.evaluate(&chunk, ctx.filters);
        let boost_adjustment: f32 = boosts.iter().map(|b| b.amount).sum();

        let final_score = self.semantic_weight * semantic_score
            + self.keyword_weight * keyword_score
            + exact_bonus
            + boost_adjustment;

        tracing::trace!(
            chunk_id = %chunk.chunk_id,
            semantic = semantic_score,
            keyword = keyword_score,
            exact = exact_bonus,
            boosts = ?boosts.iter().map(|b| b.reason.to_string()).collect::<Vec<_>>(),
            final_score,
            "Scored candidate"
        );

        ScoredChunk {
            chunk,
            semantic_score,
            keyword_score,
            exact_bonus,
            boost_adjustment,
            final_score,
            origin: ChunkOrigin::Organic,
        }
    }

    /// Fold variant passes into one ranked pool, keeping each chunk's best
    /// scaled score
    pub fn merge_variants(&self, passes: Vec<Vec<ScoredChunk>>) -> Vec<ScoredChunk> {
        let mut pool: HashMap<String, ScoredChunk> = HashMap::new();
        for pass in passes {
            for candidate in pass {
                match pool.get(candidate.chunk_id()) {
                    Some(existing) if compare(existing, &candidate) != Ordering::Greater => {}
                    _ => {
                        pool.insert(candidate.chunk_id().to_string(), candidate);
                    }
                }
            }
        }

        let mut merged: Vec<ScoredChunk> = pool.into_values().collect();
        rank(&mut merged);
        merged
    }
}

/// Ranking order: `Less` means `a` ranks first
///
/// final_score desc, then exact bonus present, then doc type priority,
/// then chunk_id.
fn compare(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| b.has_exact_bonus().cmp(&a.has_exact_bonus()))
        .then_with(|| a.chunk.doc_type.priority().cmp(&b.chunk.doc_type.priority()))
        .then_with(|| a.chunk_id().cmp(b.chunk_id()))
}

/// Sort candidates into deterministic ranking order
pub fn rank(candidates: &mut [ScoredChunk]) {
    candidates.sort_by(compare);
}
