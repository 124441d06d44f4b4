//! In-memory chunk store
//!
//! Serves the keyword index build and exact statute lookups for the
//! cross-reference resolver.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use legal_rag_core::{Chunk, ChunkStore, Result};

use crate::exact_match::normalize_statute;

#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: RwLock<Vec<Chunk>>,
    /// normalized statute number -> position in `chunks`
    by_statute: RwLock<HashMap<String, usize>>,
}

impl InMemoryChunkStore {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let store = Self::default();
        store.replace(chunks);
        store
    }

    /// Replace the stored chunks
    ///
    /// The first chunk carrying a given statute number wins the lookup key.
    pub fn replace(&self, chunks: Vec<Chunk>) {
        let mut keys = HashMap::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if let Some(ref number) = chunk.statute_number {
                keys.entry(normalize_statute(number)).or_insert(i);
            }
        }

        let mut guard = self.chunks.write();
        *guard = chunks;
        *self.by_statute.write() = keys;
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn all(&self) -> Result<Vec<Chunk>> {
        Ok(self.chunks.read().clone())
    }

    async fn by_statute_number(&self, statute_number: &str) -> Result<Option<Chunk>> {
        let key = normalize_statute(statute_number);
        let chunks = self.chunks.read();
        let found = self
            .by_statute
            .read()
            .get(&key)
            .and_then(|&i| chunks.get(i))
            .cloned();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::DocType;

    #[tokio::test]
    async fn test_lookup_is_normalized() {
        let store = InMemoryChunkStore::new(vec![
            Chunk::new("wis-940", DocType::Statute, "First-degree intentional homicide", "WI")
                .with_statute_number("940.01(1)(a)"),
            Chunk::new("wis-346", DocType::Statute, "Operating under influence", "WI")
                .with_statute_number("346.63"),
        ]);

        let hit = store.by_statute_number("§ 940.01(1)(A)").await.unwrap();
        assert_eq!(hit.map(|c| c.doc_id), Some("wis-940".to_string()));
        assert!(store.by_statute_number("940.02").await.unwrap().is_none());
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_swaps_contents() {
        let store = InMemoryChunkStore::default();
        assert!(store.is_empty());

        store.replace(vec![
            Chunk::new("wis-346", DocType::Statute, "Operating under influence", "WI").with_statute_number("346.63"),
        ]);
        assert_eq!(store.len(), 1);
        assert!(store.by_statute_number("346.63").await.unwrap().is_some());
    }
}
