//! Confidence estimation
//!
//! ```text
//! confidence = base
//!            + exact_match bonus
//!            + top score tier        (negative below 0.4)
//!            + source count tier
//!            + citation count tier
//!            + consistency           (score variance)
//! ```
//!
//! clamped into `[floor, ceiling]`. Flags are evaluated independently of
//! each other; the estimator only signals, callers decide what to do.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use legal_rag_config::constants::confidence as tiers;
use legal_rag_config::ConfidenceConfig;
use legal_rag_core::{ConfidenceFlag, ConfidenceResult, ContextPacket, DocType};

use crate::lexicon::{JURISDICTION_INDICATORS, USE_OF_FORCE_KEYWORDS};
use crate::relevance::is_stale;

static USE_OF_FORCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternatives = USE_OF_FORCE_KEYWORDS
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).expect("use-of-force pattern is valid")
});

/// Indicators this short need whitespace or end of text after them
const SHORT_CODE_LEN: usize = 3;

static JURISDICTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    JURISDICTION_INDICATORS
        .iter()
        .map(|(phrase, code)| {
            // short codes ("wi", "usc") must stand alone: "wi-fi" is not Wisconsin
            let end = if phrase.len() <= SHORT_CODE_LEN {
                r"(?:$|\s|[.,;:?!)](?:\s|$))"
            } else {
                r"(?:$|[^\p{L}\p{N}])"
            };
            let pattern = format!(r"(?i)(?:^|[^\p{{L}}\p{{N}}]){}{}", regex::escape(phrase), end);
            (Regex::new(&pattern).expect("jurisdiction pattern is valid"), *code)
        })
        .collect()
});

/// Whether the query touches on use of force
pub fn mentions_use_of_force(query: &str) -> bool {
    USE_OF_FORCE_PATTERN.is_match(query)
}

/// Jurisdiction implied by the query text, if any
pub fn implied_jurisdiction(query: &str) -> Option<&'static str> {
    JURISDICTION_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(query))
        .map(|(_, code)| *code)
}

/// Numeric inputs to the confidence formula
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceInputs {
    pub exact_match: bool,
    pub top_score: Option<f32>,
    pub source_count: usize,
    pub cited_count: usize,
    /// Population variance of source final scores
    pub score_variance: f32,
}

impl ConfidenceInputs {
    /// Extract inputs from a packet and the ids the generator cited
    ///
    /// Only distinct ids naming a source in the packet are counted.
    pub fn from_packet(packet: &ContextPacket, cited_source_ids: &[String]) -> Self {
        let scores: Vec<f32> = packet.sources.iter().map(|s| s.final_score()).collect();
        let score_variance = if scores.is_empty() {
            0.0
        } else {
            let n = scores.len() as f32;
            let mean = scores.iter().sum::<f32>() / n;
            scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n
        };

        let cited: HashSet<&str> = cited_source_ids
            .iter()
            .map(String::as_str)
            .filter(|id| packet.source(id).is_some())
            .collect();

        Self {
            exact_match: packet.signals.exact_match,
            top_score: packet.top_score(),
            source_count: packet.len(),
            cited_count: cited.len(),
            score_variance,
        }
    }
}

pub struct ConfidenceEstimator {
    config: ConfidenceConfig,
    stale_years: i32,
    reference_date: NaiveDate,
}

impl ConfidenceEstimator {
    pub fn new(config: ConfidenceConfig, stale_years: i32) -> Self {
        Self {
            config,
            stale_years,
            reference_date: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Confidence score for the given inputs
    pub fn score(&self, inputs: &ConfidenceInputs) -> f32 {
        let c = &self.config;
        let Some(top) = inputs.top_score.filter(|_| inputs.source_count > 0) else {
            return c.floor;
        };

        let mut confidence = c.base;
        if inputs.exact_match {
            confidence += c.exact_match;
        }
        confidence += top_score_adjustment(top);
        confidence += tier_by_count(&tiers::SOURCE_COUNT_TIERS, inputs.source_count);
        confidence += tier_by_count(&tiers::CITATION_COUNT_TIERS, inputs.cited_count);
        confidence += consistency_adjustment(inputs.score_variance);

        confidence.clamp(c.floor, c.ceiling)
    }

    /// Score and flag a packet given the source ids the generator cited
    pub fn estimate(&self, packet: &ContextPacket, cited_source_ids: &[String]) -> ConfidenceResult {
        let inputs = ConfidenceInputs::from_packet(packet, cited_source_ids);
        let score = self.score(&inputs);

        let mut flags = BTreeSet::new();
        if score < self.config.low_threshold {
            flags.insert(ConfidenceFlag::LowConfidence);
        }
        if self.outdated_possible(packet) {
            flags.insert(ConfidenceFlag::OutdatedPossible);
        }
        if jurisdiction_differs(packet) {
            flags.insert(ConfidenceFlag::JurisdictionNote);
        }
        if use_of_force_unsupported(packet) {
            flags.insert(ConfidenceFlag::UseOfForceCaution);
        }

        tracing::debug!(
            score,
            exact_match = inputs.exact_match,
            top_score = ?inputs.top_score,
            sources = inputs.source_count,
            cited = inputs.cited_count,
            variance = inputs.score_variance,
            flags = ?flags,
            "Estimated confidence"
        );

        ConfidenceResult { score, flags }
    }

    fn outdated_possible(&self, packet: &ContextPacket) -> bool {
        packet.sources.iter().any(|s| {
            let chunk = &s.scored.chunk;
            chunk.currency_unknown() || is_stale(chunk, self.reference_date, self.stale_years)
        })
    }
}

fn top_score_adjustment(top: f32) -> f32 {
    if let Some((_, boost)) = tiers::TOP_SCORE_TIERS.iter().find(|(threshold, _)| top > *threshold) {
        return *boost;
    }
    tiers::TOP_SCORE_PENALTIES
        .iter()
        .find(|(threshold, _)| top < *threshold)
        .map_or(0.0, |(_, penalty)| *penalty)
}

fn tier_by_count(table: &[(usize, f32)], count: usize) -> f32 {
    table
        .iter()
        .find(|(min, _)| count >= *min)
        .map_or(0.0, |(_, boost)| *boost)
}

fn consistency_adjustment(variance: f32) -> f32 {
    if let Some((_, boost)) = tiers::LOW_VARIANCE_TIERS.iter().find(|(limit, _)| variance < *limit) {
        return *boost;
    }
    if variance > tiers::HIGH_VARIANCE {
        tiers::HIGH_VARIANCE_PENALTY
    } else {
        0.0
    }
}

fn jurisdiction_differs(packet: &ContextPacket) -> bool {
    let implied = packet
        .signals
        .requested_jurisdiction
        .as_deref()
        .filter(|j| !j.trim().is_empty())
        .or_else(|| implied_jurisdiction(&packet.signals.query));
    let (Some(implied), Some(top)) = (implied, top_source_jurisdiction(packet)) else {
        return false;
    };
    !top.is_empty() && !top.eq_ignore_ascii_case(implied.trim())
}

fn top_source_jurisdiction(packet: &ContextPacket) -> Option<&str> {
    packet
        .sources
        .iter()
        .max_by(|a, b| {
            a.final_score()
                .total_cmp(&b.final_score())
                // earlier source wins ties
                .then_with(|| b.source_id.cmp(&a.source_id))
        })
        .map(|s| s.scored.chunk.jurisdiction.as_str())
}

fn use_of_force_unsupported(packet: &ContextPacket) -> bool {
    if !mentions_use_of_force(&packet.signals.query) {
        return false;
    }
    !packet.sources.iter().any(|s| {
        let chunk = &s.scored.chunk;
        matches!(chunk.doc_type, DocType::Policy | DocType::Statute) || chunk.statute_number.is_some()
    })
}
