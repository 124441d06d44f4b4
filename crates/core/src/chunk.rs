//! Indexed chunk model
//!
//! A chunk is the unit the index layer hands to retrieval. Chunks are
//! immutable once created and replaced wholesale on reindex.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Source document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Statute,
    CaseLaw,
    Policy,
    Training,
}

impl DocType {
    /// All doc types in priority order
    pub const ALL: [DocType; 4] = [Self::Statute, Self::CaseLaw, Self::Policy, Self::Training];

    /// Tie-break priority (lower ranks first)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Statute => 0,
            Self::CaseLaw => 1,
            Self::Policy => 2,
            Self::Training => 3,
        }
    }

    /// Whether an outdated document of this type is likely wrong rather than just old
    pub fn currency_matters(&self) -> bool {
        matches!(self, Self::Statute | Self::Policy)
    }

    /// Statutes and case law are the authoritative types
    pub fn is_authority(&self) -> bool {
        matches!(self, Self::Statute | Self::CaseLaw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statute => "statute",
            Self::CaseLaw => "case_law",
            Self::Policy => "policy",
            Self::Training => "training",
        }
    }

    /// Parse from a metadata string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "statute" | "statutes" => Some(Self::Statute),
            "case_law" | "case" | "caselaw" => Some(Self::CaseLaw),
            "policy" => Some(Self::Policy),
            "training" => Some(Self::Training),
            _ => None,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An indexed unit of source text with legal metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable, content-derived identifier (unique across the index)
    pub chunk_id: String,
    /// Owning document
    pub doc_id: String,
    pub doc_type: DocType,
    pub text: String,
    /// Structural labels, outermost first (chapter, section, subsection)
    #[serde(default)]
    pub hierarchy_path: Vec<String>,
    #[serde(default)]
    pub statute_number: Option<String>,
    #[serde(default)]
    pub case_citation: Option<String>,
    pub jurisdiction: String,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: Option<bool>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_uri: String,
    /// Issuing department (policy documents)
    #[serde(default)]
    pub department: Option<String>,
}

impl Chunk {
    /// Create a chunk with a content-derived id and no optional metadata
    pub fn new(
        doc_id: impl Into<String>,
        doc_type: DocType,
        text: impl Into<String>,
        jurisdiction: impl Into<String>,
    ) -> Self {
        let doc_id = doc_id.into();
        let text = text.into();
        Self {
            chunk_id: Self::content_id(&doc_id, &text),
            doc_id,
            doc_type,
            text,
            hierarchy_path: Vec::new(),
            statute_number: None,
            case_citation: None,
            jurisdiction: jurisdiction.into(),
            effective_date: None,
            is_current: None,
            title: String::new(),
            source_uri: String::new(),
            department: None,
        }
    }

    /// Derive a stable id from the owning document and the chunk text
    pub fn content_id(doc_id: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }

    pub fn with_id(mut self, chunk_id: impl Into<String>) -> Self {
        self.chunk_id = chunk_id.into();
        self
    }

    pub fn with_statute_number(mut self, statute_number: impl Into<String>) -> Self {
        self.statute_number = Some(statute_number.into());
        self
    }

    pub fn with_case_citation(mut self, citation: impl Into<String>) -> Self {
        self.case_citation = Some(citation.into());
        self
    }

    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }

    pub fn with_current(mut self, is_current: bool) -> Self {
        self.is_current = Some(is_current);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_hierarchy(mut self, path: &[&str]) -> Self {
        self.hierarchy_path = path.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Hierarchy rendered as `Chapter 940 > Section 940.01`
    pub fn hierarchy_label(&self) -> String {
        self.hierarchy_path.join(" > ")
    }

    /// Neither a currency flag nor an effective date is known
    pub fn currency_unknown(&self) -> bool {
        self.is_current.is_none() && self.effective_date.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_stable() {
        let a = Chunk::new("doc-1", DocType::Statute, "Whoever causes the death", "WI");
        let b = Chunk::new("doc-1", DocType::Statute, "Whoever causes the death", "WI");
        let c = Chunk::new("doc-2", DocType::Statute, "Whoever causes the death", "WI");

        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 16);
    }

    #[test]
    fn test_doc_type_priority_order() {
        let mut types = vec![DocType::Training, DocType::Policy, DocType::Statute, DocType::CaseLaw];
        types.sort_by_key(|t| t.priority());
        assert_eq!(types, DocType::ALL.to_vec());
    }

    #[test]
    fn test_doc_type_parse() {
        assert_eq!(DocType::parse("case_law"), Some(DocType::CaseLaw));
        assert_eq!(DocType::parse(" Statute "), Some(DocType::Statute));
        assert_eq!(DocType::parse("memo"), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&DocType::CaseLaw).unwrap();
        assert_eq!(json, "\"case_law\"");
    }

    #[test]
    fn test_currency_unknown() {
        let chunk = Chunk::new("d", DocType::Policy, "text", "WI");
        assert!(chunk.currency_unknown());
        assert!(!chunk.with_current(true).currency_unknown());
    }
}
