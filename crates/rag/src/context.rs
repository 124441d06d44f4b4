//! Context assembly
//!
//! Greedy, score-ordered selection under a chunk and token budget, followed
//! by one diversity pass that makes room for primary legal authority.

use unicode_segmentation::UnicodeSegmentation;

use legal_rag_config::ContextConfig;
use legal_rag_core::{ContextPacket, ContextSource, DocType, RetrievalSignals, ScoredChunk, SourceKind};

use crate::hybrid::rank;
use crate::RagError;

/// Approximate token count: grapheme clusters over `chars_per_token`,
/// rounded up
pub fn estimate_tokens(text: &str, chars_per_token: usize) -> usize {
    let graphemes = text.graphemes(true).count();
    graphemes.div_ceil(chars_per_token.max(1))
}

/// Per-request selection limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_chunks: usize,
    pub max_tokens: usize,
}

impl ContextBudget {
    pub fn new(max_chunks: usize, max_tokens: usize) -> Result<Self, RagError> {
        let budget = Self { max_chunks, max_tokens };
        budget.validate()?;
        Ok(budget)
    }

    fn validate(&self) -> Result<(), RagError> {
        if self.max_chunks == 0 {
            return Err(RagError::InvalidConfig("max_chunks must be greater than 0".into()));
        }
        if self.max_tokens == 0 {
            return Err(RagError::InvalidConfig("max_tokens must be greater than 0".into()));
        }
        Ok(())
    }
}

impl From<&ContextConfig> for ContextBudget {
    fn from(config: &ContextConfig) -> Self {
        Self {
            max_chunks: config.max_chunks,
            max_tokens: config.max_tokens,
        }
    }
}

/// Candidate with its rank position and token estimate
///
/// `position` orders presentation: the rank for greedy picks, the displaced
/// slot's position for diversity swaps.
struct Slot {
    rank: usize,
    tokens: usize,
    position: usize,
    swapped: bool,
}

impl Slot {
    fn new(rank: usize, tokens: usize) -> Self {
        Self {
            rank,
            tokens,
            position: rank,
            swapped: false,
        }
    }
}

pub struct ContextAssembler {
    chars_per_token: usize,
    enforce_diversity: bool,
}

impl ContextAssembler {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            chars_per_token: config.chars_per_token.max(1),
            enforce_diversity: config.enforce_diversity,
        }
    }

    /// Select sources from `candidates` within `budget`
    ///
    /// Candidates are never split. A best candidate larger than the whole
    /// token budget is included alone.
    pub fn assemble(
        &self,
        candidates: &[ScoredChunk],
        budget: ContextBudget,
        signals: RetrievalSignals,
    ) -> Result<ContextPacket, RagError> {
        budget.validate()?;

        if candidates.is_empty() {
            return Ok(ContextPacket::empty(budget.max_tokens, budget.max_chunks, signals));
        }

        let mut ranked = candidates.to_vec();
        rank(&mut ranked);
        let tokens: Vec<usize> = ranked
            .iter()
            .map(|c| estimate_tokens(&c.chunk.text, self.chars_per_token))
            .collect();

        let mut accepted: Vec<Slot> = Vec::new();
        let mut total = 0usize;
        let oversized = tokens[0] > budget.max_tokens;

        if oversized {
            tracing::debug!(
                tokens = tokens[0],
                budget = budget.max_tokens,
                "Best candidate exceeds token budget, including it alone"
            );
            accepted.push(Slot::new(0, tokens[0]));
            total = tokens[0];
        } else {
            for (i, &t) in tokens.iter().enumerate() {
                if accepted.len() >= budget.max_chunks {
                    break;
                }
                if total + t <= budget.max_tokens {
                    accepted.push(Slot::new(i, t));
                    total += t;
                }
            }
        }

        // an oversized sole source is never swapped out
        if self.enforce_diversity && !oversized {
            for wanted in [DocType::Statute, DocType::CaseLaw] {
                total = self.ensure_doc_type(wanted, &ranked, &tokens, &mut accepted, total, budget);
            }
        }

        // organic sources in rank order, then cross-references; swapped-in
        // chunks keep the slot they took
        accepted.sort_by_key(|s| (ranked[s.rank].is_cross_reference() && !s.swapped, s.position));

        let sources: Vec<ContextSource> = accepted
            .iter()
            .enumerate()
            .map(|(position, slot)| {
                let scored = ranked[slot.rank].clone();
                let prefix: String = scored.chunk.chunk_id.chars().take(20).collect();
                let kind = if scored.is_cross_reference() {
                    SourceKind::CrossReference
                } else {
                    SourceKind::Primary
                };
                ContextSource {
                    source_id: format!("src_{:03}_{}", position + 1, prefix),
                    scored,
                    tokens: slot.tokens,
                    kind,
                }
            })
            .collect();

        tracing::debug!(
            candidates = ranked.len(),
            selected = sources.len(),
            total_tokens = total,
            "Assembled context"
        );

        Ok(ContextPacket {
            sources,
            total_tokens: total,
            budget_tokens: budget.max_tokens,
            budget_chunks: budget.max_chunks,
            signals,
        })
    }

    /// Swap the best unselected `wanted` candidate in for the weakest
    /// selected non-authority chunk, if the budget allows. Returns the new
    /// token total.
    fn ensure_doc_type(
        &self,
        wanted: DocType,
        ranked: &[ScoredChunk],
        tokens: &[usize],
        accepted: &mut [Slot],
        total: usize,
        budget: ContextBudget,
    ) -> usize {
        if accepted.iter().any(|s| ranked[s.rank].chunk.doc_type == wanted) {
            return total;
        }

        let Some(incoming) = (0..ranked.len())
            .filter(|i| !accepted.iter().any(|s| s.rank == *i))
            .find(|&i| ranked[i].chunk.doc_type == wanted)
        else {
            return total;
        };

        // weakest first
        let mut victims: Vec<usize> = (0..accepted.len())
            .filter(|&j| !ranked[accepted[j].rank].chunk.doc_type.is_authority())
            .collect();
        victims.sort_by_key(|&j| std::cmp::Reverse(accepted[j].rank));

        for j in victims {
            let without = total - accepted[j].tokens;
            if without + tokens[incoming] <= budget.max_tokens {
                tracing::debug!(
                    doc_type = %wanted,
                    incoming = %ranked[incoming].chunk_id(),
                    outgoing = %ranked[accepted[j].rank].chunk_id(),
                    "Diversity swap"
                );
                let position = accepted[j].position;
                accepted[j] = Slot {
                    rank: incoming,
                    tokens: tokens[incoming],
                    position,
                    swapped: true,
                };
                return without + tokens[incoming];
            }
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::{Chunk, ChunkOrigin};

    fn candidate(id: &str, doc_type: DocType, score: f32, words: usize) -> ScoredChunk {
        // 4 chars per word with the trailing space -> one token per word
        let text = "abc ".repeat(words);
        ScoredChunk {
            chunk: Chunk::new(id, doc_type, text.trim_end(), "WI").with_id(id),
            semantic_score: score,
            keyword_score: 0.0,
            exact_bonus: 0.0,
            boost_adjustment: 0.0,
            final_score: score,
            origin: ChunkOrigin::Organic,
        }
    }

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(&ContextConfig::default())
    }

    fn ids(packet: &ContextPacket) -> Vec<&str> {
        packet.sources.iter().map(|s| s.chunk_id()).collect()
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("", 4), 0);
        assert_eq!(estimate_tokens("a", 4), 1);
        assert_eq!(estimate_tokens("abcdefgh", 4), 2);
        assert_eq!(estimate_tokens("abcdefghi", 4), 3);
        assert_eq!(estimate_tokens("§ 940.01", 4), 2);
    }

    #[test]
    fn test_invalid_budget_rejected() {
        assert!(matches!(ContextBudget::new(0, 100), Err(RagError::InvalidConfig(_))));
        assert!(matches!(ContextBudget::new(3, 0), Err(RagError::InvalidConfig(_))));

        let bad = ContextBudget {
            max_chunks: 3,
            max_tokens: 0,
        };
        let result = assembler().assemble(&[], bad, RetrievalSignals::default());
        assert!(matches!(result, Err(RagError::InvalidConfig(_))));
    }

    #[test]
    fn test_greedy_respects_budget() {
        let candidates = vec![
            candidate("a", DocType::Statute, 0.9, 40),
            candidate("b", DocType::Statute, 0.8, 70),
            candidate("c", DocType::CaseLaw, 0.7, 30),
            candidate("d", DocType::CaseLaw, 0.6, 30),
        ];
        let budget = ContextBudget::new(3, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        assert_eq!(ids(&packet), vec!["a", "c", "d"]);
        assert!(packet.total_tokens <= 100);
        assert!(packet.within_budget());
        assert_eq!(packet.sources[0].source_id, "src_001_a");
    }

    #[test]
    fn test_oversized_single_candidate_included() {
        let candidates = vec![
            candidate("huge", DocType::Statute, 0.9, 500),
            candidate("also-huge", DocType::Statute, 0.8, 400),
        ];
        let budget = ContextBudget::new(5, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        assert_eq!(ids(&packet), vec!["huge"]);
        assert!(packet.total_tokens > 100);
        assert!(packet.within_budget());
    }

    #[test]
    fn test_oversized_top_candidate_wins_over_smaller() {
        let mut top = candidate("exact-statute", DocType::Statute, 1.1, 500);
        top.exact_bonus = 0.2;
        let candidates = vec![
            top,
            candidate("small-a", DocType::CaseLaw, 0.5, 10),
            candidate("small-b", DocType::Policy, 0.4, 10),
        ];
        let budget = ContextBudget::new(5, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        assert_eq!(ids(&packet), vec!["exact-statute"]);
        assert!(packet.sources[0].scored.has_exact_bonus());
        assert_eq!(packet.total_tokens, 500);
        assert!(packet.within_budget());
    }

    #[test]
    fn test_oversized_lower_candidate_skipped() {
        let candidates = vec![
            candidate("a", DocType::Statute, 0.9, 10),
            candidate("huge", DocType::Statute, 0.8, 500),
            candidate("b", DocType::CaseLaw, 0.7, 10),
        ];
        let budget = ContextBudget::new(5, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        assert_eq!(ids(&packet), vec!["a", "b"]);
    }

    #[test]
    fn test_swapped_cross_reference_keeps_slot() {
        let mut xref = candidate("x", DocType::Statute, 0.3, 10);
        xref.origin = ChunkOrigin::CrossReference {
            from_chunk_id: "p1".into(),
            statute: "346.63".into(),
        };
        let candidates = vec![
            candidate("p1", DocType::Policy, 0.9, 10),
            candidate("p2", DocType::Policy, 0.85, 10),
            candidate("c1", DocType::CaseLaw, 0.8, 10),
            xref,
        ];
        let budget = ContextBudget::new(3, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        // p2 is the weakest non-authority pick; x takes its place
        assert_eq!(ids(&packet), vec!["p1", "x", "c1"]);
        assert_eq!(packet.sources[1].kind, SourceKind::CrossReference);
        assert_eq!(packet.sources[1].source_id, "src_002_x");
    }

    #[test]
    fn test_diversity_swaps_in_statute() {
        let candidates = vec![
            candidate("p1", DocType::Policy, 0.9, 10),
            candidate("p2", DocType::Policy, 0.85, 10),
            candidate("t1", DocType::Training, 0.8, 10),
            candidate("s1", DocType::Statute, 0.5, 10),
        ];
        let budget = ContextBudget::new(3, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        assert_eq!(ids(&packet), vec!["p1", "p2", "s1"]);
        assert!(packet.sources.iter().any(|s| s.scored.chunk.doc_type == DocType::Statute));
    }

    #[test]
    fn test_diversity_disabled() {
        let config = ContextConfig {
            enforce_diversity: false,
            ..Default::default()
        };
        let candidates = vec![
            candidate("p1", DocType::Policy, 0.9, 10),
            candidate("s1", DocType::Statute, 0.5, 10),
        ];
        let budget = ContextBudget::new(1, 100).unwrap();
        let packet = ContextAssembler::new(&config)
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();
        assert_eq!(ids(&packet), vec!["p1"]);
    }

    #[test]
    fn test_cross_references_follow_organic() {
        let mut xref = candidate("x", DocType::Statute, 0.95, 10);
        xref.origin = ChunkOrigin::CrossReference {
            from_chunk_id: "a".into(),
            statute: "346.63".into(),
        };
        let candidates = vec![xref, candidate("a", DocType::Statute, 0.9, 10)];
        let budget = ContextBudget::new(5, 100).unwrap();
        let packet = assembler()
            .assemble(&candidates, budget, RetrievalSignals::default())
            .unwrap();

        assert_eq!(ids(&packet), vec!["a", "x"]);
        assert_eq!(packet.sources[1].kind, SourceKind::CrossReference);
        assert_eq!(packet.sources[1].source_id, "src_002_x");
    }

    #[test]
    fn test_empty_candidates() {
        let budget = ContextBudget::new(5, 100).unwrap();
        let packet = assembler()
            .assemble(&[], budget, RetrievalSignals::default())
            .unwrap();
        assert!(packet.is_empty());
        assert_eq!(packet.total_tokens, 0);
    }
}
