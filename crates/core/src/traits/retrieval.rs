//! Retrieval collaborator traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Chunk, DocType, Result};

/// External vector index
///
/// Implementations return `(chunk, similarity)` pairs ordered by descending
/// similarity. Ranking logic does not belong here.
///
/// # Example
///
/// ```ignore
/// let index: Arc<dyn EmbeddingIndex> = Arc::new(QdrantIndex::new(config));
/// let filters = SearchFilters::default().with_jurisdiction("WI").to_metadata_filters();
/// let hits = index.search("operating while intoxicated", &filters, 20).await?;
/// ```
#[async_trait]
pub trait EmbeddingIndex: Send + Sync + 'static {
    async fn search(
        &self,
        text: &str,
        filters: &[MetadataFilter],
        top_k: usize,
    ) -> Result<Vec<(Chunk, f32)>>;

    /// Index name for logging
    fn name(&self) -> &str;
}

/// Chunk store backing the keyword index and cross-reference lookups
#[async_trait]
pub trait ChunkStore: Send + Sync + 'static {
    /// Every chunk currently indexed
    async fn all(&self) -> Result<Vec<Chunk>>;

    /// Exact lookup by statute number, `None` when absent
    async fn by_statute_number(&self, statute_number: &str) -> Result<Option<Chunk>>;
}

/// Caller-supplied retrieval filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Requesting jurisdiction, e.g. `WI`
    #[serde(default)]
    pub jurisdiction: Option<String>,
    /// Requesting department, matched against policy chunks
    #[serde(default)]
    pub department: Option<String>,
    /// Restrict to these doc types (empty = all)
    #[serde(default)]
    pub doc_types: Vec<DocType>,
}

impl SearchFilters {
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_doc_type(mut self, doc_type: DocType) -> Self {
        if !self.doc_types.contains(&doc_type) {
            self.doc_types.push(doc_type);
        }
        self
    }

    /// Whether a chunk passes the doc type restriction
    ///
    /// Jurisdiction and department only influence boosts, never exclusion.
    pub fn admits(&self, chunk: &Chunk) -> bool {
        self.doc_types.is_empty() || self.doc_types.contains(&chunk.doc_type)
    }

    /// Translate into vector index metadata filters
    pub fn to_metadata_filters(&self) -> Vec<MetadataFilter> {
        let mut filters = Vec::new();
        match self.doc_types.as_slice() {
            [] => {}
            [single] => filters.push(MetadataFilter::eq("doc_type", single.as_str())),
            many => filters.push(MetadataFilter::any_of(
                "doc_type",
                many.iter().map(|t| t.as_str().into()).collect(),
            )),
        }
        filters
    }
}

/// Metadata filter for the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: serde_json::Value,
}

impl MetadataFilter {
    /// Create an equals filter
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equals,
            value: value.into(),
        }
    }

    /// Create a membership filter
    pub fn any_of(field: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::In,
            value: serde_json::Value::Array(values),
        }
    }

    /// Evaluate against a chunk, for indexes without native filtering
    pub fn matches(&self, chunk: &Chunk) -> bool {
        let actual = match self.field.as_str() {
            "doc_type" => Some(chunk.doc_type.as_str().to_string()),
            "jurisdiction" => Some(chunk.jurisdiction.clone()),
            "department" => chunk.department.clone(),
            "statute_number" => chunk.statute_number.clone(),
            "doc_id" => Some(chunk.doc_id.clone()),
            _ => None,
        };
        let Some(actual) = actual else {
            return matches!(self.op, FilterOp::NotEquals);
        };
        match (&self.op, &self.value) {
            (FilterOp::Equals, serde_json::Value::String(v)) => actual.eq_ignore_ascii_case(v),
            (FilterOp::NotEquals, serde_json::Value::String(v)) => !actual.eq_ignore_ascii_case(v),
            (FilterOp::Contains, serde_json::Value::String(v)) => {
                actual.to_lowercase().contains(&v.to_lowercase())
            }
            (FilterOp::In, serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str())
                .any(|v| actual.eq_ignore_ascii_case(v)),
            _ => false,
        }
    }
}

/// Filter operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Equals,
    NotEquals,
    Contains,
    In,
}
