//! Keyword search using Tantivy (BM25)
//!
//! The index is built once from the full chunk set and never mutated.
//! Rebuilds construct a fresh index off to the side and publish it through
//! [`KeywordIndexHandle`], so in-flight queries keep the snapshot they
//! started with.
//!
//! Tokenization keeps statute numbers whole: `§ 346.63(1)(a)` indexes as
//! `346.63(1)(a)` and `§346.63(1)(a)` as `§346.63(1)(a)`, so citation
//! lookups work through the same index as plain words.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tantivy::{
    collector::TopDocs,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::{
        Field, IndexRecordOption, OwnedValue, Schema, TextFieldIndexing, TextOptions, STORED,
        STRING,
    },
    tokenizer::{LowerCaser, RegexTokenizer, RemoveLongFilter, TextAnalyzer, TokenStream},
    Index, IndexReader, TantivyDocument, Term,
};

use legal_rag_core::Chunk;

use crate::RagError;

/// Name the analyzer is registered under
const ANALYZER: &str = "legal";

/// Statute numbers (with optional `§` and subsection groups) or plain words
const TOKEN_PATTERN: &str = r"§?\d+(?:\.\d+)+(?:\([0-9A-Za-z]+\))*|[\p{L}\p{N}]+";

/// Writer heap for one-shot builds
const WRITER_HEAP_BYTES: usize = 50_000_000;

fn build_analyzer() -> Result<TextAnalyzer, RagError> {
    let tokenizer = RegexTokenizer::new(TOKEN_PATTERN).map_err(|e| RagError::Index(e.to_string()))?;
    Ok(TextAnalyzer::builder(tokenizer)
        .filter(RemoveLongFilter::limit(100))
        .filter(LowerCaser)
        .build())
}

/// Tokenize text the way the index does
pub fn tokenize(text: &str) -> Result<Vec<String>, RagError> {
    let mut analyzer = build_analyzer()?;
    Ok(collect_tokens(&mut analyzer, text))
}

fn collect_tokens(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut stream = analyzer.token_stream(text);
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    tokens
}

/// Lexical search capability behind the swap handle
///
/// Implementations are synchronous and may be CPU-bound; callers run them
/// on the blocking pool.
pub trait KeywordSearch: Send + Sync {
    /// Best-first `(chunk, score)` pairs with positive scores only
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<(Chunk, f32)>, RagError>;

    /// Number of indexed chunks
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Immutable BM25 index over a chunk snapshot
pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    id_field: Field,
    text_field: Field,
    chunks: HashMap<String, Chunk>,
}

impl KeywordIndex {
    /// Build an index over every chunk
    pub fn build(chunks: Vec<Chunk>) -> Result<Self, RagError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(ANALYZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let id_field = schema_builder.add_text_field("chunk_id", STRING | STORED);
        let text_field = schema_builder.add_text_field("text", text_options);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index.tokenizers().register(ANALYZER, build_analyzer()?);

        let mut writer = index
            .writer_with_num_threads::<TantivyDocument>(1, WRITER_HEAP_BYTES)
            .map_err(|e| RagError::Index(e.to_string()))?;

        let mut by_id = HashMap::with_capacity(chunks.len());
        for chunk in chunks {
            if by_id.contains_key(&chunk.chunk_id) {
                tracing::warn!(chunk_id = %chunk.chunk_id, "Duplicate chunk id, keeping first");
                continue;
            }

            let mut doc = TantivyDocument::default();
            doc.add_text(id_field, &chunk.chunk_id);
            doc.add_text(text_field, searchable_text(&chunk));
            writer
                .add_document(doc)
                .map_err(|e| RagError::Index(e.to_string()))?;

            by_id.insert(chunk.chunk_id.clone(), chunk);
        }

        writer
            .commit()
            .map_err(|e| RagError::Index(e.to_string()))?;

        let reader = index.reader().map_err(|e| RagError::Index(e.to_string()))?;
        reader
            .reload()
            .map_err(|e| RagError::Index(e.to_string()))?;

        tracing::info!(chunks = by_id.len(), "Keyword index built");

        Ok(Self {
            index,
            reader,
            id_field,
            text_field,
            chunks: by_id,
        })
    }

    /// Index with no chunks
    pub fn empty() -> Result<Self, RagError> {
        Self::build(Vec::new())
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.get(chunk_id)
    }
}

impl KeywordSearch for KeywordIndex {
    /// BM25 search; returns positive scores only, best first, ties by chunk_id
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<(Chunk, f32)>, RagError> {
        if top_k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut analyzer = self
            .index
            .tokenizers()
            .get(ANALYZER)
            .ok_or_else(|| RagError::Index(format!("analyzer '{}' not registered", ANALYZER)))?;

        let mut terms = collect_tokens(&mut analyzer, query);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|t| {
                let term = Term::from_field_text(self.text_field, t);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(top_k))
            .map_err(|e| RagError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            if score.is_nan() || score <= 0.0 {
                continue;
            }
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| RagError::Search(e.to_string()))?;

            let id = match doc.get_first(self.id_field) {
                Some(OwnedValue::Str(s)) => s.as_str(),
                _ => continue,
            };
            if let Some(chunk) = self.chunks.get(id) {
                results.push((chunk.clone(), score));
            }
        }

        results.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.chunk_id.cmp(&b.0.chunk_id))
        });

        tracing::debug!(terms = ?terms, hits = results.len(), "Keyword search");
        Ok(results)
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}

/// Text indexed for a chunk: body plus title, hierarchy and citation metadata
fn searchable_text(chunk: &Chunk) -> String {
    let mut parts: Vec<String> = vec![chunk.text.clone()];
    if !chunk.title.is_empty() {
        parts.push(chunk.title.clone());
    }
    if !chunk.hierarchy_path.is_empty() {
        parts.push(chunk.hierarchy_path.join(" "));
    }
    if let Some(ref statute) = chunk.statute_number {
        parts.push(statute.clone());
        parts.push(format!("§{}", statute));
    }
    if let Some(ref citation) = chunk.case_citation {
        parts.push(citation.clone());
    }
    parts.join("\n")
}

/// Process-wide keyword index with atomic swap-on-rebuild
pub struct KeywordIndexHandle {
    inner: RwLock<Arc<dyn KeywordSearch>>,
}

impl KeywordIndexHandle {
    pub fn new(index: Arc<dyn KeywordSearch>) -> Self {
        Self {
            inner: RwLock::new(index),
        }
    }

    /// Snapshot of the current index; stays valid across a concurrent swap
    pub fn current(&self) -> Arc<dyn KeywordSearch> {
        Arc::clone(&self.inner.read())
    }

    /// Publish a fully built index
    pub fn replace(&self, index: Arc<dyn KeywordSearch>) {
        let chunks = index.len();
        let name = index.name().to_string();
        *self.inner.write() = index;
        tracing::info!(chunks, index = %name, "Keyword index swapped");
    }

    /// Build a new Tantivy index from `chunks` off to the side, then swap it in
    pub fn rebuild(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        let index = KeywordIndex::build(chunks)?;
        self.replace(Arc::new(index));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::DocType;

    fn statute(number: &str, text: &str) -> Chunk {
        Chunk::new(format!("wis-{}", number), DocType::Statute, text, "WI")
            .with_statute_number(number)
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            statute(
                "346.63",
                "No person may drive or operate a motor vehicle while under the influence of an intoxicant.",
            ),
            statute(
                "940.01",
                "Whoever causes the death of another human being with intent to kill that person is guilty of a Class A felony.",
            ),
            Chunk::new(
                "training-1",
                DocType::Training,
                "DUI enforcement training covers field sobriety testing and implied consent.",
                "WI",
            ),
        ]
    }

    #[test]
    fn test_tokenizer_keeps_statute_numbers() {
        let tokens = tokenize("See § 346.63(1)(a), and §940.01!").unwrap();
        assert_eq!(tokens, vec!["see", "346.63(1)(a)", "and", "§940.01"]);
    }

    #[test]
    fn test_tokenizer_strips_punctuation_and_case() {
        let tokens = tokenize("Operating-While INTOXICATED?").unwrap();
        assert_eq!(tokens, vec!["operating", "while", "intoxicated"]);
    }

    #[test]
    fn test_search_ranks_matching_chunk() {
        let index = KeywordIndex::build(corpus()).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search("death with intent to kill", 10).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0.statute_number.as_deref(), Some("940.01"));
        assert!(results.iter().all(|(_, s)| *s > 0.0));
    }

    #[test]
    fn test_citation_lookup_through_index() {
        let index = KeywordIndex::build(corpus()).unwrap();
        let results = index.search("§ 346.63", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.statute_number.as_deref(), Some("346.63"));

        let results = index.search("§346.63", 10).unwrap();
        assert_eq!(results[0].0.statute_number.as_deref(), Some("346.63"));
    }

    #[test]
    fn test_rare_terms_score_higher() {
        let chunks = vec![
            Chunk::new("a", DocType::Training, "vehicle stop vehicle", "WI").with_id("a"),
            Chunk::new("b", DocType::Training, "vehicle chokehold", "WI").with_id("b"),
            Chunk::new("c", DocType::Training, "vehicle search", "WI").with_id("c"),
        ];
        let index = KeywordIndex::build(chunks).unwrap();
        let results = index.search("vehicle chokehold", 10).unwrap();
        assert_eq!(results[0].0.chunk_id, "b");
    }

    #[test]
    fn test_no_match_and_empty_query() {
        let index = KeywordIndex::build(corpus()).unwrap();
        assert!(index.search("zoning variance", 10).unwrap().is_empty());
        assert!(index.search("   ", 10).unwrap().is_empty());
        assert!(index.search("((§", 10).unwrap().is_empty());
        assert!(KeywordIndex::empty().unwrap().search("death", 10).unwrap().is_empty());
    }

    #[test]
    fn test_handle_swap_keeps_old_snapshot() {
        let handle = KeywordIndexHandle::new(Arc::new(KeywordIndex::build(corpus()).unwrap()));
        let before = handle.current();

        handle.rebuild(vec![statute("940.02", "reckless homicide")]).unwrap();
        let after = handle.current();

        assert_eq!(before.len(), 3);
        assert!(!before.search("intoxicant", 5).unwrap().is_empty());
        assert_eq!(after.len(), 1);
        assert_eq!(after.name(), "tantivy");
        assert!(after.search("intoxicant", 5).unwrap().is_empty());
    }
}
