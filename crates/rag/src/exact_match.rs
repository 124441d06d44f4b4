//! Exact citation detection
//!
//! Recognizes literal statute numbers and case citations in a query and
//! flags chunks whose metadata matches one of them exactly.
//!
//! Statute grammar: optional `§`/`§§`/`Section`/`Sec.`/`Wis. Stat.`/`W.S.A.`
//! prefix, then `digits.digits`, then any number of `(x)` subsection groups.
//!
//! Case grammar: `Name v. Name [Name...]`, optionally followed by
//! `, <volume> <reporter> <page> [(year)]` or `, <year>`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use legal_rag_core::Chunk;

pub(crate) static STATUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:(?:§§?|section|sec\.|wis\.?\s*stats?\.?|w\.s\.a\.?)\s*)?\b(\d+\.\d+(?:\([0-9a-z]+\))*)",
    )
    .expect("statute pattern is valid")
});

static CASE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?P<name>[A-Z][A-Za-z'&-]+\s+v\.?\s+[A-Z][A-Za-z'&.-]*[A-Za-z](?:\s+[A-Z][A-Za-z'&.-]*[A-Za-z])*)(?:,\s*(?P<reporter>\d+\s+(?:[A-Z0-9][A-Za-z.0-9]*\s+)+\d+(?:\s*\(\d{4}\))?|\d{4}))?",
    )
    .expect("case pattern is valid")
});

static STATUTE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:§§?|section|sec\.|wis\.?\s*stats?\.?|w\.s\.a\.?)\s*")
        .expect("prefix pattern is valid")
});

static VERSUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\sv\.?\s").expect("versus pattern is valid"));

/// Normalize a statute number for comparison: prefix stripped, no
/// whitespace, lowercase
pub fn normalize_statute(value: &str) -> String {
    let trimmed = value.trim();
    let stripped = STATUTE_PREFIX.replace(trimmed, "");
    stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a case citation for comparison: lowercase, single spaces,
/// `v` written as `v.`, trailing punctuation dropped
pub fn normalize_citation(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    let versus = VERSUS.replace_all(&lowered, " v. ");
    versus
        .trim()
        .trim_end_matches(|c| c == '.' || c == ',' || c == ';')
        .to_string()
}

/// Literal citations found in a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExactMatches {
    /// Normalized statute numbers
    pub statutes: Vec<String>,
    /// Normalized case citations (full form and name-only form)
    pub cases: Vec<String>,
    /// Literals as they appeared in the query
    pub literals: Vec<String>,
}

impl ExactMatches {
    pub fn is_empty(&self) -> bool {
        self.statutes.is_empty() && self.cases.is_empty()
    }

    /// Whether the chunk's metadata equals one of the literals
    pub fn matches(&self, chunk: &Chunk) -> bool {
        let statute_hit = chunk
            .statute_number
            .as_deref()
            .map(normalize_statute)
            .is_some_and(|s| !s.is_empty() && self.statutes.contains(&s));

        let case_hit = chunk
            .case_citation
            .as_deref()
            .map(normalize_citation)
            .is_some_and(|c| !c.is_empty() && self.cases.contains(&c));

        statute_hit || case_hit
    }
}

/// Pattern-based citation detector
#[derive(Debug, Clone)]
pub struct ExactMatchDetector {
    bonus: f32,
}

impl ExactMatchDetector {
    pub fn new(bonus: f32) -> Self {
        Self { bonus }
    }

    pub fn bonus(&self) -> f32 {
        self.bonus
    }

    /// Extract literal citations; never fails, unparseable input yields none
    pub fn detect(&self, query: &str) -> ExactMatches {
        let mut found = ExactMatches::default();

        for caps in STATUTE_PATTERN.captures_iter(query) {
            if let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) {
                let normalized = normalize_statute(number.as_str());
                if !found.statutes.contains(&normalized) {
                    found.statutes.push(normalized);
                    found.literals.push(whole.as_str().trim().to_string());
                }
            }
        }

        for caps in CASE_PATTERN.captures_iter(query) {
            let Some(whole) = caps.get(0) else { continue };
            let mut forms = vec![normalize_citation(whole.as_str())];
            if let Some(name) = caps.name("name") {
                forms.push(normalize_citation(name.as_str()));
            }
            for form in forms {
                if !found.cases.contains(&form) {
                    found.cases.push(form);
                }
            }
            found.literals.push(whole.as_str().trim().to_string());
        }

        if !found.is_empty() {
            tracing::debug!(
                statutes = ?found.statutes,
                cases = ?found.cases,
                "Detected citation literals"
            );
        }

        found
    }

    /// Bonus earned by a chunk for the given literals (0 or the fixed bonus)
    pub fn bonus_for(&self, matches: &ExactMatches, chunk: &Chunk) -> f32 {
        if matches.matches(chunk) {
            self.bonus
        } else {
            0.0
        }
    }
}

/// Byte ranges of every citation literal in `text`, sorted and non-overlapping
pub fn citation_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = STATUTE_PATTERN
        .find_iter(text)
        .chain(CASE_PATTERN.find_iter(text))
        .map(|m| m.range())
        .collect();
    spans.sort_by_key(|r| (r.start, std::cmp::Reverse(r.end)));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start < last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::DocType;

    fn detector() -> ExactMatchDetector {
        ExactMatchDetector::new(0.2)
    }

    #[test]
    fn test_statute_forms() {
        for query in [
            "§ 940.01",
            "§940.01",
            "Section 940.01",
            "sec. 940.01",
            "Wis. Stat. 940.01",
            "what does 940.01 say",
        ] {
            let found = detector().detect(query);
            assert_eq!(found.statutes, vec!["940.01".to_string()], "query: {}", query);
        }
    }

    #[test]
    fn test_statute_with_subsections() {
        let found = detector().detect("elements under § 939.50(3)(a)");
        assert_eq!(found.statutes, vec!["939.50(3)(a)".to_string()]);
        assert_eq!(found.literals, vec!["§ 939.50(3)(a)".to_string()]);
    }

    #[test]
    fn test_case_citation_forms() {
        let found = detector().detect("Is Terry v. Ohio, 392 U.S. 1 (1968) still good law?");
        assert!(found.cases.contains(&"terry v. ohio, 392 u.s. 1 (1968)".to_string()));
        assert!(found.cases.contains(&"terry v. ohio".to_string()));

        let found = detector().detect("State v Smith, 2023");
        assert!(found.cases.contains(&"state v. smith".to_string()));
        assert!(found.cases.contains(&"state v. smith, 2023".to_string()));
    }

    #[test]
    fn test_malformed_input_finds_nothing() {
        for query in ["", "§", "section", "v.", "940.", "(((", "what is owi"] {
            assert!(detector().detect(query).is_empty(), "query: {}", query);
        }
    }

    #[test]
    fn test_exact_match_only() {
        let found = detector().detect("§ 940.01");
        let exact = Chunk::new("d", DocType::Statute, "t", "WI").with_statute_number("940.01");
        let sub = Chunk::new("d", DocType::Statute, "u", "WI").with_statute_number("940.01(1)");
        let other = Chunk::new("d", DocType::Statute, "v", "WI").with_statute_number("940.011");

        assert_eq!(detector().bonus_for(&found, &exact), 0.2);
        assert_eq!(detector().bonus_for(&found, &sub), 0.0);
        assert_eq!(detector().bonus_for(&found, &other), 0.0);
    }

    #[test]
    fn test_case_match_is_whitespace_and_case_insensitive() {
        let found = detector().detect("terry  v.  ohio");
        // lowercase names do not match the case grammar
        assert!(found.cases.is_empty());

        let found = detector().detect("Terry  v  Ohio");
        let chunk = Chunk::new("d", DocType::CaseLaw, "t", "US").with_case_citation("TERRY V. OHIO");
        assert!(found.matches(&chunk));
    }

    #[test]
    fn test_normalize_statute() {
        assert_eq!(normalize_statute("§ 346.63(1)(a)"), "346.63(1)(a)");
        assert_eq!(normalize_statute(" 940.01 "), "940.01");
        assert_eq!(normalize_statute("Wis. Stat. 940.01"), "940.01");
    }

    #[test]
    fn test_citation_spans_merge() {
        let text = "see § 940.01 and State v. Smith";
        let spans = citation_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].clone()], "§ 940.01");
        assert_eq!(&text[spans[1].clone()], "State v. Smith");
    }
}
