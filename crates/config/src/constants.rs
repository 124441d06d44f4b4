//! Centralized tuning constants
//!
//! Single source of truth for every default used by the retrieval core.
//! These are product-tuning values; the ranking properties hold for any
//! consistent choice of them, so change them here rather than inline.

/// Hybrid retrieval defaults
pub mod retrieval {
    /// Weight of the semantic (embedding) signal
    pub const SEMANTIC_WEIGHT: f32 = 0.65;

    /// Weight of the keyword (BM25) signal; sums to 1 with `SEMANTIC_WEIGHT`
    pub const KEYWORD_WEIGHT: f32 = 0.35;

    /// Bonus for a literal statute/citation match on chunk metadata
    pub const EXACT_MATCH_BONUS: f32 = 0.2;

    /// Weight applied to enhancer variants other than the original query
    pub const VARIANT_WEIGHT: f32 = 0.7;

    pub const SEMANTIC_TOP_K: usize = 20;
    pub const KEYWORD_TOP_K: usize = 20;

    /// Similarity floor below which semantic hits are dropped
    pub const SEMANTIC_FLOOR: f32 = 0.0;

    pub const SEARCH_TIMEOUT_MS: u64 = 5_000;
    pub const GENERATION_TIMEOUT_MS: u64 = 60_000;

    /// Original query included
    pub const MAX_VARIANTS: usize = 4;

    /// Alternatives tried per matched table entry
    pub const MAX_EXPANSIONS_PER_TERM: usize = 2;
}

/// Relevance boosts and penalties
pub mod boosts {
    pub const HOME_JURISDICTION: &str = "WI";
    pub const JURISDICTION_MATCH: f32 = 0.05;
    pub const JURISDICTION_MISMATCH: f32 = -0.03;
    pub const CURRENT: f32 = 0.03;
    pub const RECENT: f32 = 0.02;
    /// Effective date within this many years counts as recent
    pub const RECENT_YEARS: i32 = 2;
    pub const DEPARTMENT_POLICY: f32 = 0.05;
    pub const STALE: f32 = -0.05;
    /// Effective date older than this many years counts as stale
    pub const STALE_YEARS: i32 = 10;
}

/// Cross-reference expansion
pub mod cross_reference {
    pub const SCAN_TOP_N: usize = 10;
    pub const MIN_RELEVANCE: f32 = 0.3;
    pub const MAX_ADDITIONS: usize = 5;
    pub const MAX_DEPTH: usize = 1;
    /// Distance below the weakest organic score for resolved chunks
    pub const TIER_GAP: f32 = 0.05;
}

/// Context budget
pub mod context {
    pub const MAX_CHUNKS: usize = 8;
    pub const MAX_TOKENS: usize = 3_000;
    pub const CHARS_PER_TOKEN: usize = 4;
}

/// Confidence estimation
pub mod confidence {
    pub const BASE: f32 = 0.4;
    pub const EXACT_MATCH: f32 = 0.35;
    pub const FLOOR: f32 = 0.1;
    pub const CEILING: f32 = 1.0;
    pub const LOW_THRESHOLD: f32 = 0.5;

    /// `(threshold, boost)`, first `top_score > threshold` wins
    pub const TOP_SCORE_TIERS: [(f32, f32); 5] =
        [(0.9, 0.25), (0.8, 0.2), (0.7, 0.15), (0.6, 0.1), (0.5, 0.05)];

    /// `(threshold, penalty)`, first `top_score < threshold` wins
    pub const TOP_SCORE_PENALTIES: [(f32, f32); 2] = [(0.3, -0.25), (0.4, -0.15)];

    /// `(minimum count, boost)`
    pub const SOURCE_COUNT_TIERS: [(usize, f32); 3] = [(5, 0.15), (3, 0.1), (2, 0.05)];
    pub const CITATION_COUNT_TIERS: [(usize, f32); 3] = [(3, 0.1), (2, 0.05), (1, 0.02)];

    /// `(variance below, boost)`
    pub const LOW_VARIANCE_TIERS: [(f32, f32); 2] = [(0.05, 0.08), (0.1, 0.05)];
    pub const HIGH_VARIANCE: f32 = 0.5;
    pub const HIGH_VARIANCE_PENALTY: f32 = -0.1;
}

/// Logging defaults
pub mod observability {
    pub const LOG_LEVEL: &str = "info";
}
