//! Query enhancement
//!
//! Produces weighted query variants from:
//! - Abbreviation expansion and contraction (`OWI` <-> `operating while intoxicated`)
//! - Legal synonyms (`terry stop` -> `investigatory detention`)
//! - Spelling fixes drawn from a closed legal vocabulary
//!
//! Citation literals are swapped for opaque `⟦n⟧` placeholders before any
//! rewriting and restored afterwards, so `§ 940.01(1)` or `State v. Smith`
//! always reach the search backends verbatim.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashSet;

use legal_rag_config::RetrievalConfig;

use crate::exact_match::citation_spans;
use crate::lexicon::{ABBREVIATIONS, REVERSE_ABBREVIATIONS, SPELLING, SYNONYMS};

/// Query enhancer configuration
#[derive(Debug, Clone)]
pub struct QueryEnhancerConfig {
    /// Weight of every variant other than the original
    pub variant_weight: f32,
    /// Maximum variants returned, original included
    pub max_variants: usize,
    /// Alternatives tried per matched table entry
    pub max_expansions_per_term: usize,
    pub enable_abbreviations: bool,
    pub enable_synonyms: bool,
    pub enable_spelling: bool,
}

impl Default for QueryEnhancerConfig {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for QueryEnhancerConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            variant_weight: config.variant_weight,
            max_variants: config.max_variants,
            max_expansions_per_term: config.max_expansions_per_term,
            enable_abbreviations: true,
            enable_synonyms: true,
            enable_spelling: true,
        }
    }
}

/// Where a variant came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSource {
    Original,
    Abbreviation,
    Synonym,
    SpellCorrection,
}

/// One weighted query string
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryVariant {
    pub text: String,
    pub weight: f32,
    pub source: VariantSource,
}

impl QueryVariant {
    pub fn original(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: 1.0,
            source: VariantSource::Original,
        }
    }

    pub fn is_original(&self) -> bool {
        self.source == VariantSource::Original
    }
}

/// A compiled table entry: whole-word, case-insensitive pattern plus its
/// replacements
struct Rule {
    pattern: Regex,
    replacements: Vec<&'static str>,
}

fn compile(table: &[(&'static str, Vec<&'static str>)]) -> Vec<Rule> {
    table
        .iter()
        .filter_map(|(term, replacements)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            match Regex::new(&pattern) {
                Ok(pattern) => Some(Rule {
                    pattern,
                    replacements: replacements.clone(),
                }),
                Err(e) => {
                    tracing::warn!(term = %term, error = %e, "Skipping unusable lexicon entry");
                    None
                }
            }
        })
        .collect()
}

static ABBREVIATION_RULES: Lazy<Vec<Rule>> = Lazy::new(|| compile(&ABBREVIATIONS));
static CONTRACTION_RULES: Lazy<Vec<Rule>> = Lazy::new(|| compile(&REVERSE_ABBREVIATIONS));
static SYNONYM_RULES: Lazy<Vec<Rule>> = Lazy::new(|| compile(&SYNONYMS));
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").expect("word pattern is valid"));
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"⟦(\d+)⟧").expect("placeholder pattern is valid"));

/// Citation-safe query enhancer
pub struct QueryEnhancer {
    config: QueryEnhancerConfig,
}

impl QueryEnhancer {
    pub fn new(config: QueryEnhancerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryEnhancerConfig {
        &self.config
    }

    /// Enhance a query into weighted variants, original first at weight 1.0
    pub fn enhance(&self, query: &str) -> Vec<QueryVariant> {
        let mut variants = vec![QueryVariant::original(query)];
        if query.trim().is_empty() || self.config.max_variants <= 1 {
            return variants;
        }

        let (protected, literals) = protect(query);
        let mut candidates: Vec<(String, VariantSource)> = Vec::new();
        let per_term = self.config.max_expansions_per_term.max(1);

        if self.config.enable_abbreviations {
            let rules = ABBREVIATION_RULES
                .iter()
                .map(|r| (r, Casing::FollowMatch))
                .chain(CONTRACTION_RULES.iter().map(|r| (r, Casing::Upper)));
            for (rule, casing) in rules {
                for replacement in rule.replacements.iter().take(per_term) {
                    if let Some(rewritten) =
                        substitute(&rule.pattern, &protected, replacement, casing)
                    {
                        candidates.push((rewritten, VariantSource::Abbreviation));
                    }
                }
            }
        }

        if self.config.enable_synonyms {
            for rule in SYNONYM_RULES.iter() {
                for replacement in rule.replacements.iter().take(per_term) {
                    if let Some(rewritten) =
                        substitute(&rule.pattern, &protected, replacement, Casing::AsIs)
                    {
                        candidates.push((rewritten, VariantSource::Synonym));
                    }
                }
            }
        }

        if self.config.enable_spelling {
            if let Some(corrected) = correct_spelling(&protected) {
                candidates.push((corrected, VariantSource::SpellCorrection));
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(query.trim().to_lowercase());

        for (text, source) in candidates {
            if variants.len() >= self.config.max_variants {
                break;
            }
            let Some(restored) = restore(&text, &literals) else {
                tracing::debug!(variant = %text, "Dropping variant with unresolved placeholder");
                continue;
            };
            if seen.insert(restored.trim().to_lowercase()) {
                variants.push(QueryVariant {
                    text: restored,
                    weight: self.config.variant_weight,
                    source,
                });
            }
        }

        if variants.len() > 1 {
            tracing::debug!(
                query = %query,
                variants = ?variants.iter().map(|v| v.text.as_str()).collect::<Vec<_>>(),
                "Enhanced query"
            );
        }

        variants
    }
}

impl Default for QueryEnhancer {
    fn default() -> Self {
        Self::new(QueryEnhancerConfig::default())
    }
}

/// Replace citation literals with `⟦n⟧` placeholders
fn protect(query: &str) -> (String, Vec<String>) {
    let mut protected = String::with_capacity(query.len());
    let mut literals = Vec::new();
    let mut cursor = 0;

    for span in citation_spans(query) {
        protected.push_str(&query[cursor..span.start]);
        protected.push_str(&format!("⟦{}⟧", literals.len()));
        literals.push(query[span.clone()].to_string());
        cursor = span.end;
    }
    protected.push_str(&query[cursor..]);

    (protected, literals)
}

/// Put the literals back; `None` if a placeholder was lost or mangled
fn restore(text: &str, literals: &[String]) -> Option<String> {
    let mut missing = false;
    let restored = PLACEHOLDER.replace_all(text, |caps: &Captures| {
        match caps[1].parse::<usize>().ok().and_then(|i| literals.get(i)) {
            Some(literal) => literal.clone(),
            None => {
                missing = true;
                String::new()
            }
        }
    });

    let expected = literals.len();
    let kept = PLACEHOLDER.find_iter(text).count();
    if missing || kept != expected || restored.contains('⟦') {
        return None;
    }
    Some(restored.into_owned())
}

/// Replace every whole-word match; `None` when nothing changed
fn substitute(pattern: &Regex, text: &str, replacement: &str, casing: Casing) -> Option<String> {
    if !pattern.is_match(text) {
        return None;
    }
    let rewritten =
        pattern.replace_all(text, |caps: &Captures| apply_casing(casing, &caps[0], replacement));
    if rewritten == text {
        None
    } else {
        Some(rewritten.into_owned())
    }
}

/// How replacement text is cased
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Casing {
    /// Single-word replacements of an all-caps match are written in caps
    FollowMatch,
    /// Replacements are abbreviations and always written in caps
    Upper,
    AsIs,
}

fn apply_casing(casing: Casing, matched: &str, replacement: &str) -> String {
    match casing {
        Casing::Upper => replacement.to_uppercase(),
        Casing::FollowMatch => {
            let all_caps = matched.chars().any(|c| c.is_alphabetic())
                && matched.chars().all(|c| !c.is_lowercase());
            if all_caps && !replacement.contains(' ') {
                replacement.to_uppercase()
            } else {
                replacement.to_string()
            }
        }
        Casing::AsIs => replacement.to_string(),
    }
}

/// Apply the closed spelling vocabulary to every word outside placeholders
fn correct_spelling(text: &str) -> Option<String> {
    let mut changed = false;
    let corrected = WORD.replace_all(text, |caps: &Captures| {
        let word = &caps[0];
        match SPELLING.get(word.to_lowercase().as_str()) {
            Some(fixed) => {
                changed = true;
                fixed.to_string()
            }
            None => word.to_string(),
        }
    });
    changed.then(|| corrected.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(variants: &[QueryVariant]) -> Vec<String> {
        variants.iter().map(|v| v.text.clone()).collect()
    }

    #[test]
    fn test_original_always_first() {
        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("elements of battery to a peace officer");
        assert_eq!(variants[0].text, "elements of battery to a peace officer");
        assert_eq!(variants[0].weight, 1.0);
        assert!(variants[0].is_original());
    }

    #[test]
    fn test_owi_expands_to_dui() {
        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("OWI 3rd offense elements");

        let dui = variants
            .iter()
            .find(|v| v.text.contains("DUI"))
            .expect("DUI variant");
        assert_eq!(dui.text, "DUI 3rd offense elements");
        assert_eq!(dui.weight, 0.7);
        assert_eq!(dui.source, VariantSource::Abbreviation);

        assert!(texts(&variants).contains(&"operating while intoxicated 3rd offense elements".to_string()));
    }

    #[test]
    fn test_contraction() {
        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("probable cause for a blood draw");
        assert!(texts(&variants).contains(&"PC for a blood draw".to_string()));
    }

    #[test]
    fn test_citations_are_never_rewritten() {
        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("is homocide under § 940.01(1)(a) or State v. Smith");

        assert!(variants.len() > 1);
        for variant in &variants {
            assert!(variant.text.contains("§ 940.01(1)(a)"), "{}", variant.text);
            assert!(variant.text.contains("State v. Smith"), "{}", variant.text);
        }
        assert!(variants
            .iter()
            .any(|v| v.source == VariantSource::SpellCorrection && v.text.contains("homicide")));
    }

    #[test]
    fn test_statute_like_tokens_not_abbreviated() {
        // "stat" inside a protected literal must survive
        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("Wis. Stat. 346.63");
        for variant in &variants {
            assert!(variant.text.contains("Wis. Stat. 346.63"), "{}", variant.text);
        }
    }

    #[test]
    fn test_unknown_tokens_not_corrected() {
        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("recieve notise of hearing");
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn test_fails_soft_on_empty_or_plain() {
        let enhancer = QueryEnhancer::default();
        assert_eq!(enhancer.enhance("").len(), 1);
        assert_eq!(enhancer.enhance("   ").len(), 1);
        assert_eq!(enhancer.enhance("parking ticket appeal").len(), 1);
    }

    #[test]
    fn test_variants_capped_and_deduplicated() {
        let enhancer = QueryEnhancer::new(QueryEnhancerConfig {
            max_variants: 2,
            ..Default::default()
        });
        let variants = enhancer.enhance("OWI terry stop homicide");
        assert_eq!(variants.len(), 2);

        let enhancer = QueryEnhancer::default();
        let variants = enhancer.enhance("OWI terry stop homicide");
        let unique: HashSet<String> = variants.iter().map(|v| v.text.to_lowercase()).collect();
        assert_eq!(unique.len(), variants.len());
        assert!(variants.len() <= 4);
    }

    #[test]
    fn test_protect_and_restore() {
        let (protected, literals) = protect("see § 346.63 and Terry v. Ohio");
        assert_eq!(protected, "see ⟦0⟧ and ⟦1⟧");
        assert_eq!(literals, vec!["§ 346.63".to_string(), "Terry v. Ohio".to_string()]);
        assert_eq!(
            restore(&protected, &literals).as_deref(),
            Some("see § 346.63 and Terry v. Ohio")
        );
        assert_eq!(restore("see ⟦0⟧", &literals), None);
    }
}
