//! Cross-reference expansion
//!
//! Scans the text of well-ranked organic chunks for phrases like
//! `see also § 346.63` and pulls the referenced statute in by exact
//! metadata lookup. Expansion is depth 1: text of a resolved chunk is
//! never scanned.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use legal_rag_config::CrossReferenceConfig;
use legal_rag_core::{ChunkOrigin, ChunkStore, ScoredChunk};

use crate::exact_match::normalize_statute;

const NUMBER: &str = r"\d+\.\d+(?:\([0-9A-Za-z]+\))*";

static REFERENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let section = r"(?:§§?\s*|sections?\s+|secs?\.\s*)?";
    Regex::new(&format!(
        r"(?i)\b(?:see\s+also|see|refer\s+to|cf\.|under|pursuant\s+to)\s+{section}(?P<first>{NUMBER})(?P<rest>(?:\s*(?:,|\band\b|\bor\b)\s*(?:§§?\s*)?{NUMBER})*)"
    ))
    .expect("reference pattern is valid")
});

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(NUMBER).expect("statute number pattern is valid"));

/// Statute numbers referenced in `text`, normalized, in order of first
/// appearance
pub fn extract_references(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for caps in REFERENCE_PATTERN.captures_iter(text) {
        let first = caps.name("first").map(|m| m.as_str());
        let rest = caps
            .name("rest")
            .into_iter()
            .flat_map(|m| NUMBER_PATTERN.find_iter(m.as_str()))
            .map(|m| m.as_str());

        for number in first.into_iter().chain(rest) {
            let normalized = normalize_statute(number);
            if seen.insert(normalized.clone()) {
                references.push(normalized);
            }
        }
    }

    references
}

/// Per-request resolution counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Organic chunks whose text was scanned
    pub scanned: usize,
    pub resolved: usize,
    /// References with no chunk in the store, or a failed lookup
    pub misses: usize,
    /// Referenced chunks already in the candidate pool
    pub skipped_duplicates: usize,
}

pub struct CrossReferenceResolver {
    config: CrossReferenceConfig,
}

impl CrossReferenceResolver {
    pub fn new(config: CrossReferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrossReferenceConfig {
        &self.config
    }

    /// Resolve references found in `ranked`, returning only the additions
    ///
    /// `ranked` must already be in ranking order. Additions score
    /// `tier_gap` below the weakest organic candidate.
    pub async fn resolve(
        &self,
        ranked: &[ScoredChunk],
        store: &dyn ChunkStore,
    ) -> (Vec<ScoredChunk>, ResolutionStats) {
        let mut stats = ResolutionStats::default();
        let mut additions: Vec<ScoredChunk> = Vec::new();

        if !self.config.enabled || self.config.max_depth == 0 || self.config.max_additions == 0 {
            return (additions, stats);
        }

        let organic: Vec<&ScoredChunk> = ranked.iter().filter(|c| !c.is_cross_reference()).collect();
        let Some(floor) = organic
            .iter()
            .map(|c| c.final_score)
            .reduce(f32::min)
        else {
            return (additions, stats);
        };
        let tier_score = floor - self.config.tier_gap;

        let present: HashSet<&str> = ranked.iter().map(|c| c.chunk_id()).collect();
        let mut added_ids: HashSet<String> = HashSet::new();
        let mut requested: HashSet<String> = HashSet::new();

        let scan = organic
            .iter()
            .filter(|c| c.final_score >= self.config.min_relevance)
            .take(self.config.scan_top_n);

        'scan: for source in scan {
            stats.scanned += 1;
            let own = source.chunk.statute_number.as_deref().map(normalize_statute);

            for reference in extract_references(&source.chunk.text) {
                if additions.len() >= self.config.max_additions {
                    break 'scan;
                }
                if own.as_deref() == Some(reference.as_str()) || !requested.insert(reference.clone()) {
                    continue;
                }

                match store.by_statute_number(&reference).await {
                    Ok(Some(chunk)) => {
                        if present.contains(chunk.chunk_id.as_str()) || added_ids.contains(&chunk.chunk_id) {
                            stats.skipped_duplicates += 1;
                            continue;
                        }
                        added_ids.insert(chunk.chunk_id.clone());
                        stats.resolved += 1;
                        additions.push(ScoredChunk {
                            chunk,
                            semantic_score: 0.0,
                            keyword_score: 0.0,
                            exact_bonus: 0.0,
                            boost_adjustment: 0.0,
                            final_score: tier_score,
                            origin: ChunkOrigin::CrossReference {
                                from_chunk_id: source.chunk_id().to_string(),
                                statute: reference,
                            },
                        });
                    }
                    Ok(None) => stats.misses += 1,
                    Err(e) => {
                        tracing::warn!(statute = %reference, error = %e, "Cross-reference lookup failed");
                        stats.misses += 1;
                    }
                }
            }
        }

        tracing::debug!(
            scanned = stats.scanned,
            resolved = stats.resolved,
            misses = stats.misses,
            skipped_duplicates = stats.skipped_duplicates,
            "Cross-reference resolution"
        );

        (additions, stats)
    }
}
