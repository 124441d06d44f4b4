//! Context packet handed to the generation step

use serde::{Deserialize, Serialize};

use crate::ScoredChunk;

/// Role of a source in the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Primary,
    CrossReference,
}

/// A scored chunk promoted into the final context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSource {
    /// Citation handle, stable for the duration of one response
    pub source_id: String,
    pub scored: ScoredChunk,
    /// Estimated token count of the chunk text
    pub tokens: usize,
    pub kind: SourceKind,
}

impl ContextSource {
    pub fn chunk_id(&self) -> &str {
        &self.scored.chunk.chunk_id
    }

    pub fn final_score(&self) -> f32 {
        self.scored.final_score
    }
}

/// Retrieval signals carried alongside the packet for confidence estimation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSignals {
    /// Raw query as received
    pub query: String,
    /// Whether any chunk earned an exact citation bonus
    pub exact_match: bool,
    /// Citation literals recognized in the query
    #[serde(default)]
    pub literals: Vec<String>,
    /// Jurisdiction requested by the caller's filters
    #[serde(default)]
    pub requested_jurisdiction: Option<String>,
}

/// Ordered, budget-constrained set of sources
///
/// Order is presentation/citation order, not necessarily score order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPacket {
    pub sources: Vec<ContextSource>,
    pub total_tokens: usize,
    pub budget_tokens: usize,
    pub budget_chunks: usize,
    #[serde(default)]
    pub signals: RetrievalSignals,
}

impl ContextPacket {
    /// Empty packet for a query with no candidates
    pub fn empty(budget_tokens: usize, budget_chunks: usize, signals: RetrievalSignals) -> Self {
        Self {
            sources: Vec::new(),
            total_tokens: 0,
            budget_tokens,
            budget_chunks,
            signals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Look up a source by its citation handle
    pub fn source(&self, source_id: &str) -> Option<&ContextSource> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    /// Highest final score among selected sources
    pub fn top_score(&self) -> Option<f32> {
        self.sources
            .iter()
            .map(|s| s.final_score())
            .fold(None, |acc, s| Some(acc.map_or(s, |a: f32| a.max(s))))
    }

    /// Whether the packet respects its chunk and token budget
    ///
    /// A single source may exceed the token budget on its own.
    pub fn within_budget(&self) -> bool {
        let count_ok = self.sources.len() <= self.budget_chunks;
        let tokens_ok = self.total_tokens <= self.budget_tokens || self.sources.len() == 1;
        count_ok && tokens_ok
    }

    /// Render sources as `[Source <id>]` blocks for the generator prompt
    pub fn render(&self) -> String {
        self.sources
            .iter()
            .map(|s| {
                let chunk = &s.scored.chunk;
                let mut header = format!("[Source {}]", s.source_id);
                if let Some(ref statute) = chunk.statute_number {
                    header.push_str(&format!(" § {}", statute));
                }
                if let Some(ref citation) = chunk.case_citation {
                    header.push_str(&format!(" {}", citation));
                }
                format!("{}\n{}", header, chunk.text)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chunk, ChunkOrigin, DocType};

    fn source(id: &str, score: f32, tokens: usize) -> ContextSource {
        ContextSource {
            source_id: id.to_string(),
            scored: ScoredChunk {
                chunk: Chunk::new(id, DocType::Statute, format!("text of {}", id), "WI")
                    .with_statute_number("940.01"),
                semantic_score: score,
                keyword_score: 0.0,
                exact_bonus: 0.0,
                boost_adjustment: 0.0,
                final_score: score,
                origin: ChunkOrigin::Organic,
            },
            tokens,
            kind: SourceKind::Primary,
        }
    }

    #[test]
    fn test_top_score() {
        let mut packet = ContextPacket::empty(100, 5, RetrievalSignals::default());
        assert_eq!(packet.top_score(), None);

        packet.sources.push(source("a", 0.4, 10));
        packet.sources.push(source("b", 0.9, 10));
        assert_eq!(packet.top_score(), Some(0.9));
    }

    #[test]
    fn test_single_oversized_source_is_within_budget() {
        let mut packet = ContextPacket::empty(10, 5, RetrievalSignals::default());
        packet.sources.push(source("a", 0.4, 50));
        packet.total_tokens = 50;
        assert!(packet.within_budget());

        packet.sources.push(source("b", 0.3, 1));
        packet.total_tokens = 51;
        assert!(!packet.within_budget());
    }

    #[test]
    fn test_render_includes_source_ids() {
        let mut packet = ContextPacket::empty(100, 5, RetrievalSignals::default());
        packet.sources.push(source("src_000_a", 0.4, 10));
        let rendered = packet.render();
        assert!(rendered.starts_with("[Source src_000_a] § 940.01"));
        assert!(rendered.contains("text of src_000_a"));
    }
}
