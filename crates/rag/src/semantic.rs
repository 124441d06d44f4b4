//! Semantic search adapter
//!
//! Thin wrapper over an external [`EmbeddingIndex`]: translates filters,
//! normalizes similarities into `[0, 1]` and applies the similarity floor.
//! No ranking logic lives here.

use std::collections::HashSet;
use std::sync::Arc;

use legal_rag_core::{Chunk, EmbeddingIndex, Result, SearchFilters};

pub struct SemanticSearch {
    index: Arc<dyn EmbeddingIndex>,
    floor: f32,
}

impl SemanticSearch {
    pub fn new(index: Arc<dyn EmbeddingIndex>, floor: f32) -> Self {
        Self {
            index,
            floor: floor.clamp(0.0, 1.0),
        }
    }

    pub fn name(&self) -> &str {
        self.index.name()
    }

    /// Top-k chunks by similarity, best first
    ///
    /// An empty index or no hit above the floor yields an empty list.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<(Chunk, f32)>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let metadata_filters = filters.to_metadata_filters();
        let raw = self.index.search(query, &metadata_filters, top_k).await?;
        let raw_len = raw.len();

        let mut hits: Vec<(Chunk, f32)> = raw
            .into_iter()
            .filter(|(chunk, score)| !score.is_nan() && filters.admits(chunk))
            .map(|(chunk, score)| (chunk, score.clamp(0.0, 1.0)))
            .filter(|(_, score)| *score >= self.floor)
            .collect();

        hits.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.chunk_id.cmp(&b.0.chunk_id))
        });

        let mut seen = HashSet::new();
        hits.retain(|(chunk, _)| seen.insert(chunk.chunk_id.clone()));
        hits.truncate(top_k);

        tracing::debug!(
            index = self.index.name(),
            raw = raw_len,
            kept = hits.len(),
            "Semantic search"
        );

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use legal_rag_core::{DocType, MetadataFilter};

    struct FixedIndex {
        hits: Vec<(Chunk, f32)>,
    }

    #[async_trait]
    impl EmbeddingIndex for FixedIndex {
        async fn search(
            &self,
            _text: &str,
            filters: &[MetadataFilter],
            _top_k: usize,
        ) -> Result<Vec<(Chunk, f32)>> {
            Ok(self
                .hits
                .iter()
                .filter(|(c, _)| filters.iter().all(|f| f.matches(c)))
                .cloned()
                .collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn chunk(id: &str, doc_type: DocType) -> Chunk {
        Chunk::new(id, doc_type, format!("text {}", id), "WI").with_id(id)
    }

    #[tokio::test]
    async fn test_normalizes_and_orders() {
        let index = FixedIndex {
            hits: vec![
                (chunk("b", DocType::Statute), 0.4),
                (chunk("a", DocType::Statute), 1.3),
                (chunk("c", DocType::Policy), f32::NAN),
                (chunk("d", DocType::Policy), 0.4),
                (chunk("b", DocType::Statute), 0.2),
            ],
        };
        let search = SemanticSearch::new(Arc::new(index), 0.0);
        let hits = search.search("q", &SearchFilters::default(), 10).await.unwrap();

        let ids: Vec<&str> = hits.iter().map(|(c, _)| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d"]);
        assert_eq!(hits[0].1, 1.0);
    }

    #[tokio::test]
    async fn test_floor_and_empty() {
        let index = FixedIndex {
            hits: vec![(chunk("a", DocType::Statute), 0.2), (chunk("b", DocType::Statute), 0.6)],
        };
        let search = SemanticSearch::new(Arc::new(index), 0.5);
        let hits = search.search("q", &SearchFilters::default(), 10).await.unwrap();
        assert_eq!(hits.len(), 1);

        let empty = SemanticSearch::new(Arc::new(FixedIndex { hits: vec![] }), 0.0);
        assert!(empty.search("q", &SearchFilters::default(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_doc_type_filter_applied() {
        let index = FixedIndex {
            hits: vec![(chunk("a", DocType::Statute), 0.9), (chunk("b", DocType::Policy), 0.8)],
        };
        let search = SemanticSearch::new(Arc::new(index), 0.0);
        let filters = SearchFilters::default().with_doc_type(DocType::Policy);
        let hits = search.search("q", &filters, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.chunk_id, "b");
    }
}
