//! Confidence result and advisory flags

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Advisory flag raised alongside a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceFlag {
    /// Confidence fell below the low-confidence threshold
    LowConfidence,
    /// A selected source is stale or its currency is unknown
    OutdatedPossible,
    /// The query implies a jurisdiction the top source does not match
    JurisdictionNote,
    /// Use-of-force query without policy or statute support; the caller must
    /// substitute a caution message for the generated answer
    UseOfForceCaution,
}

impl ConfidenceFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidence => "LOW_CONFIDENCE",
            Self::OutdatedPossible => "OUTDATED_POSSIBLE",
            Self::JurisdictionNote => "JURISDICTION_NOTE",
            Self::UseOfForceCaution => "USE_OF_FORCE_CAUTION",
        }
    }
}

impl fmt::Display for ConfidenceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded confidence score plus flags, computed fresh per response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub score: f32,
    pub flags: BTreeSet<ConfidenceFlag>,
}

impl ConfidenceResult {
    pub fn has(&self, flag: ConfidenceFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// The generated answer must be replaced by a caution message
    pub fn requires_caution_message(&self) -> bool {
        self.has(ConfidenceFlag::UseOfForceCaution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_serialization() {
        let json = serde_json::to_string(&ConfidenceFlag::OutdatedPossible).unwrap();
        assert_eq!(json, "\"OUTDATED_POSSIBLE\"");
        assert_eq!(ConfidenceFlag::UseOfForceCaution.to_string(), "USE_OF_FORCE_CAUTION");
    }

    #[test]
    fn test_requires_caution_message() {
        let mut result = ConfidenceResult {
            score: 0.5,
            flags: BTreeSet::new(),
        };
        assert!(!result.requires_caution_message());
        result.flags.insert(ConfidenceFlag::UseOfForceCaution);
        assert!(result.requires_caution_message());
    }
}
