//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{boosts, confidence, context, cross_reference, observability, retrieval};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Top-level settings for the retrieval core
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Hybrid search weights, top-k and timeouts
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Relevance boosts and penalties
    #[serde(default)]
    pub boosts: BoostConfig,

    #[serde(default)]
    pub cross_reference: CrossReferenceConfig,

    /// Context packet budget
    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_retrieval()?;
        self.validate_cross_reference()?;
        self.validate_context()?;
        self.validate_confidence()?;
        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;

        for (field, value) in [
            ("retrieval.semantic_weight", r.semantic_weight),
            ("retrieval.keyword_weight", r.keyword_weight),
            ("retrieval.variant_weight", r.variant_weight),
            ("retrieval.semantic_floor", r.semantic_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("Must be between 0.0 and 1.0, got {}", value)));
            }
        }

        let sum = r.semantic_weight + r.keyword_weight;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(invalid(
                "retrieval.keyword_weight",
                format!("Semantic and keyword weights must sum to 1.0, got {}", sum),
            ));
        }

        if r.exact_match_bonus < 0.0 {
            return Err(invalid(
                "retrieval.exact_match_bonus",
                format!("Must be non-negative, got {}", r.exact_match_bonus),
            ));
        }

        if r.semantic_top_k == 0 {
            return Err(invalid("retrieval.semantic_top_k", "Must be greater than 0"));
        }
        if r.keyword_top_k == 0 {
            return Err(invalid("retrieval.keyword_top_k", "Must be greater than 0"));
        }
        if r.max_variants == 0 {
            return Err(invalid("retrieval.max_variants", "Must allow at least the original query"));
        }
        if r.search_timeout_ms == 0 {
            return Err(invalid("retrieval.search_timeout_ms", "Must be greater than 0"));
        }
        if r.generation_timeout_ms == 0 {
            return Err(invalid("retrieval.generation_timeout_ms", "Must be greater than 0"));
        }

        Ok(())
    }

    fn validate_cross_reference(&self) -> Result<(), ConfigError> {
        let x = &self.cross_reference;

        if x.max_depth != 1 {
            return Err(invalid(
                "cross_reference.max_depth",
                format!("Only depth 1 expansion is supported, got {}", x.max_depth),
            ));
        }
        if x.max_additions > cross_reference::MAX_ADDITIONS {
            return Err(invalid(
                "cross_reference.max_additions",
                format!(
                    "At most {} additions per request, got {}",
                    cross_reference::MAX_ADDITIONS,
                    x.max_additions
                ),
            ));
        }
        // cross-references must rank strictly below organic chunks
        if !(x.tier_gap > 0.0 && x.tier_gap.is_finite()) {
            return Err(invalid(
                "cross_reference.tier_gap",
                format!("Must be positive, got {}", x.tier_gap),
            ));
        }
        if !(0.0..=1.0).contains(&x.min_relevance) {
            return Err(invalid(
                "cross_reference.min_relevance",
                format!("Must be in [0, 1], got {}", x.min_relevance),
            ));
        }

        Ok(())
    }

    fn validate_context(&self) -> Result<(), ConfigError> {
        let c = &self.context;

        if c.max_chunks == 0 {
            return Err(invalid("context.max_chunks", "Must be greater than 0"));
        }
        if c.max_tokens == 0 {
            return Err(invalid("context.max_tokens", "Must be greater than 0"));
        }
        if c.chars_per_token == 0 {
            return Err(invalid("context.chars_per_token", "Must be greater than 0"));
        }

        Ok(())
    }

    fn validate_confidence(&self) -> Result<(), ConfigError> {
        let c = &self.confidence;

        if !(0.0..=1.0).contains(&c.floor) || !(0.0..=1.0).contains(&c.ceiling) {
            return Err(invalid(
                "confidence.floor",
                "Floor and ceiling must be between 0.0 and 1.0",
            ));
        }
        if c.floor >= c.ceiling {
            return Err(invalid(
                "confidence.floor",
                format!("Floor {} must be below ceiling {}", c.floor, c.ceiling),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Hybrid retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    #[serde(default = "default_exact_match_bonus")]
    pub exact_match_bonus: f32,

    /// Weight applied to enhancer variants
    #[serde(default = "default_variant_weight")]
    pub variant_weight: f32,

    #[serde(default = "default_semantic_top_k")]
    pub semantic_top_k: usize,

    #[serde(default = "default_keyword_top_k")]
    pub keyword_top_k: usize,

    /// Minimum similarity for semantic hits
    #[serde(default)]
    pub semantic_floor: f32,

    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Maximum query variants, original included
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    #[serde(default = "default_max_expansions_per_term")]
    pub max_expansions_per_term: usize,
}

fn default_semantic_weight() -> f32 {
    retrieval::SEMANTIC_WEIGHT
}
fn default_keyword_weight() -> f32 {
    retrieval::KEYWORD_WEIGHT
}
fn default_exact_match_bonus() -> f32 {
    retrieval::EXACT_MATCH_BONUS
}
fn default_variant_weight() -> f32 {
    retrieval::VARIANT_WEIGHT
}
fn default_semantic_top_k() -> usize {
    retrieval::SEMANTIC_TOP_K
}
fn default_keyword_top_k() -> usize {
    retrieval::KEYWORD_TOP_K
}
fn default_search_timeout_ms() -> u64 {
    retrieval::SEARCH_TIMEOUT_MS
}
fn default_generation_timeout_ms() -> u64 {
    retrieval::GENERATION_TIMEOUT_MS
}
fn default_max_variants() -> usize {
    retrieval::MAX_VARIANTS
}
fn default_max_expansions_per_term() -> usize {
    retrieval::MAX_EXPANSIONS_PER_TERM
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            exact_match_bonus: default_exact_match_bonus(),
            variant_weight: default_variant_weight(),
            semantic_top_k: default_semantic_top_k(),
            keyword_top_k: default_keyword_top_k(),
            semantic_floor: retrieval::SEMANTIC_FLOOR,
            search_timeout_ms: default_search_timeout_ms(),
            generation_timeout_ms: default_generation_timeout_ms(),
            max_variants: default_max_variants(),
            max_expansions_per_term: default_max_expansions_per_term(),
        }
    }
}

/// Relevance boost configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Jurisdiction assumed when the request names none
    pub home_jurisdiction: String,
    pub jurisdiction_match: f32,
    pub jurisdiction_mismatch: f32,
    pub current: f32,
    pub recent: f32,
    pub recent_years: i32,
    pub department_policy: f32,
    pub stale: f32,
    pub stale_years: i32,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            home_jurisdiction: boosts::HOME_JURISDICTION.to_string(),
            jurisdiction_match: boosts::JURISDICTION_MATCH,
            jurisdiction_mismatch: boosts::JURISDICTION_MISMATCH,
            current: boosts::CURRENT,
            recent: boosts::RECENT,
            recent_years: boosts::RECENT_YEARS,
            department_policy: boosts::DEPARTMENT_POLICY,
            stale: boosts::STALE,
            stale_years: boosts::STALE_YEARS,
        }
    }
}

/// Cross-reference expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossReferenceConfig {
    pub enabled: bool,
    /// Organic candidates scanned for references
    pub scan_top_n: usize,
    pub min_relevance: f32,
    pub max_additions: usize,
    pub max_depth: usize,
    pub tier_gap: f32,
}

impl Default for CrossReferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_top_n: cross_reference::SCAN_TOP_N,
            min_relevance: cross_reference::MIN_RELEVANCE,
            max_additions: cross_reference::MAX_ADDITIONS,
            max_depth: cross_reference::MAX_DEPTH,
            tier_gap: cross_reference::TIER_GAP,
        }
    }
}

/// Context budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_chunks: usize,
    pub max_tokens: usize,
    /// Characters per estimated token
    pub chars_per_token: usize,
    /// Swap in statute/case law when the greedy pass selected none
    pub enforce_diversity: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chunks: context::MAX_CHUNKS,
            max_tokens: context::MAX_TOKENS,
            chars_per_token: context::CHARS_PER_TOKEN,
            enforce_diversity: true,
        }
    }
}

/// Confidence estimation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub base: f32,
    pub exact_match: f32,
    pub floor: f32,
    pub ceiling: f32,
    pub low_threshold: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: confidence::BASE,
            exact_match: confidence::EXACT_MATCH,
            floor: confidence::FLOOR,
            ceiling: confidence::CEILING,
            low_threshold: confidence::LOW_THRESHOLD,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    observability::LOG_LEVEL.to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and `LEGAL_RAG__*`
/// environment variables, in increasing precedence
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings rooted at an explicit config directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LEGAL_RAG")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        semantic_weight = settings.retrieval.semantic_weight,
        max_tokens = settings.context.max_tokens,
        "Loaded settings"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.semantic_weight, 0.65);
        assert_eq!(settings.context.max_chunks, 8);
        assert_eq!(settings.boosts.home_jurisdiction, "WI");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_weight_validation() {
        let mut settings = Settings::default();
        settings.retrieval.semantic_weight = 1.5;
        assert!(settings.validate().is_err());

        settings.retrieval.semantic_weight = 0.5;
        assert!(settings.validate().is_err(), "0.5 + 0.35 does not sum to 1");

        settings.retrieval.keyword_weight = 0.5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut settings = Settings::default();
        settings.context.max_tokens = 0;
        match settings.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "context.max_tokens"),
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_must_be_one() {
        let mut settings = Settings::default();
        settings.cross_reference.max_depth = 2;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_cross_reference_tier_gap_must_be_positive() {
        let mut settings = Settings::default();
        settings.cross_reference.tier_gap = 0.0;
        match settings.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "cross_reference.tier_gap")
            }
            other => panic!("expected invalid value, got {:?}", other),
        }

        settings.cross_reference.tier_gap = 0.01;
        assert!(settings.validate().is_ok());

        settings.cross_reference.min_relevance = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inverted_confidence_bounds_rejected() {
        let mut settings = Settings::default();
        settings.confidence.floor = 0.9;
        settings.confidence.ceiling = 0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[retrieval]\nsemantic_weight = 0.6\nkeyword_weight = 0.4\n\n[context]\nmax_tokens = 1200"
        )
        .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert_eq!(settings.retrieval.semantic_weight, 0.6);
        assert_eq!(settings.context.max_tokens, 1200);
        // untouched sections keep their defaults
        assert_eq!(settings.context.max_chunks, 8);
        assert_eq!(settings.retrieval.exact_match_bonus, 0.2);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.toml");
        std::fs::write(&path, "[context]\nmax_chunks = 0\n").unwrap();

        assert!(load_settings_from(dir.path().to_str().unwrap(), None).is_err());
    }
}
