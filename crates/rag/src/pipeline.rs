//! End-to-end retrieval pipeline
//!
//! enhance -> (semantic || keyword) per variant -> hybrid score -> merge
//! -> cross-reference expansion -> context assembly
//!
//! Each variant runs its two searches concurrently under the search
//! timeout. A failed or timed-out backend degrades that variant to the
//! other signal; only losing both backends on the original query fails the
//! request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;

use legal_rag_config::Settings;
use legal_rag_core::{
    Chunk, ChunkStore, ConfidenceResult, ContextPacket, EmbeddingIndex, GeneratedAnswer, Generator,
    RetrievalSignals, SearchFilters,
};

use crate::confidence::ConfidenceEstimator;
use crate::context::{ContextAssembler, ContextBudget};
use crate::cross_reference::CrossReferenceResolver;
use crate::hybrid::{HybridScorer, ScoringContext};
use crate::keyword_index::{KeywordIndex, KeywordIndexHandle, KeywordSearch};
use crate::query_enhancer::{QueryEnhancer, QueryEnhancerConfig, QueryVariant};
use crate::relevance::RelevanceBooster;
use crate::semantic::SemanticSearch;
use crate::RagError;

/// Generated answer with the confidence computed from its citations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerWithConfidence {
    pub answer: GeneratedAnswer,
    pub confidence: ConfidenceResult,
}

impl AnswerWithConfidence {
    pub fn requires_caution_message(&self) -> bool {
        self.confidence.requires_caution_message()
    }
}

/// Raw hits for one variant; `None` marks a failed backend
struct VariantHits {
    semantic: Option<Vec<(Chunk, f32)>>,
    keyword: Option<Vec<(Chunk, f32)>>,
}

pub struct LegalRetrieverBuilder {
    settings: Settings,
    embedding_index: Option<Arc<dyn EmbeddingIndex>>,
    chunk_store: Option<Arc<dyn ChunkStore>>,
    keyword_search: Option<Arc<dyn KeywordSearch>>,
    reference_date: Option<NaiveDate>,
}

impl LegalRetrieverBuilder {
    pub fn embedding_index(mut self, index: Arc<dyn EmbeddingIndex>) -> Self {
        self.embedding_index = Some(index);
        self
    }

    pub fn chunk_store(mut self, store: Arc<dyn ChunkStore>) -> Self {
        self.chunk_store = Some(store);
        self
    }

    /// Initial keyword backend (defaults to an empty Tantivy index)
    ///
    /// [`LegalRetriever::reindex`] replaces it with a Tantivy index built
    /// from the chunk store.
    pub fn keyword_search(mut self, search: Arc<dyn KeywordSearch>) -> Self {
        self.keyword_search = Some(search);
        self
    }

    /// Date freshness and staleness are judged against (defaults to today)
    pub fn reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Validate settings and wire components
    ///
    /// The keyword index starts empty; call [`LegalRetriever::reindex`] to
    /// load it from the chunk store.
    pub fn build(self) -> Result<LegalRetriever, RagError> {
        self.settings.validate()?;

        let embedding_index = self
            .embedding_index
            .ok_or_else(|| RagError::InvalidConfig("embedding index is required".into()))?;
        let store = self
            .chunk_store
            .ok_or_else(|| RagError::InvalidConfig("chunk store is required".into()))?;
        let keyword_search: Arc<dyn KeywordSearch> = match self.keyword_search {
            Some(search) => search,
            None => Arc::new(KeywordIndex::empty()?),
        };

        let s = &self.settings;
        let mut booster = RelevanceBooster::new(s.boosts.clone());
        let mut estimator = ConfidenceEstimator::new(s.confidence.clone(), s.boosts.stale_years);
        if let Some(date) = self.reference_date {
            booster = booster.with_reference_date(date);
            estimator = estimator.with_reference_date(date);
        }

        tracing::info!(
            index = embedding_index.name(),
            keyword = keyword_search.name(),
            semantic_weight = s.retrieval.semantic_weight,
            keyword_weight = s.retrieval.keyword_weight,
            max_chunks = s.context.max_chunks,
            max_tokens = s.context.max_tokens,
            "Legal retriever initialized"
        );

        Ok(LegalRetriever {
            enhancer: QueryEnhancer::new(QueryEnhancerConfig::from(&s.retrieval)),
            semantic: SemanticSearch::new(embedding_index, s.retrieval.semantic_floor),
            keyword: KeywordIndexHandle::new(keyword_search),
            scorer: HybridScorer::new(&s.retrieval, booster),
            resolver: CrossReferenceResolver::new(s.cross_reference.clone()),
            assembler: ContextAssembler::new(&s.context),
            estimator,
            store,
            settings: self.settings,
        })
    }
}

pub struct LegalRetriever {
    settings: Settings,
    enhancer: QueryEnhancer,
    semantic: SemanticSearch,
    keyword: KeywordIndexHandle,
    scorer: HybridScorer,
    resolver: CrossReferenceResolver,
    assembler: ContextAssembler,
    estimator: ConfidenceEstimator,
    store: Arc<dyn ChunkStore>,
}

impl LegalRetriever {
    pub fn builder(settings: Settings) -> LegalRetrieverBuilder {
        LegalRetrieverBuilder {
            settings,
            embedding_index: None,
            chunk_store: None,
            keyword_search: None,
            reference_date: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn keyword_index(&self) -> &KeywordIndexHandle {
        &self.keyword
    }

    /// Rebuild the keyword index from the chunk store and swap it in
    ///
    /// In-flight queries keep the snapshot they started with.
    pub async fn reindex(&self) -> Result<usize, RagError> {
        let chunks = self
            .store
            .all()
            .await
            .map_err(|e| RagError::Index(format!("Failed to load chunks: {}", e)))?;

        let index = tokio::task::spawn_blocking(move || KeywordIndex::build(chunks))
            .await
            .map_err(|e| RagError::Index(format!("Index build task failed: {}", e)))??;

        let count = index.len();
        self.keyword.replace(Arc::new(index));
        Ok(count)
    }

    /// Retrieve a budgeted context packet for `query`
    pub async fn retrieve(&self, query: &str, filters: &SearchFilters) -> Result<ContextPacket, RagError> {
        let started = Instant::now();
        let budget = ContextBudget::from(&self.settings.context);

        let exact = self.scorer.detector().detect(query);
        let mut signals = RetrievalSignals {
            query: query.to_string(),
            exact_match: false,
            literals: exact.literals.clone(),
            requested_jurisdiction: filters.jurisdiction.clone(),
        };

        if query.trim().is_empty() {
            return self.assembler.assemble(&[], budget, signals);
        }

        let variants = self.enhancer.enhance(query);
        // one snapshot for the whole request
        let keyword_index = self.keyword.current();

        let hits = join_all(
            variants
                .iter()
                .map(|v| self.search_variant(v, filters, Arc::clone(&keyword_index))),
        )
        .await;

        let ctx = ScoringContext {
            filters,
            exact: &exact,
        };
        let mut passes = Vec::with_capacity(variants.len());
        for (variant, hits) in variants.iter().zip(hits) {
            if hits.semantic.is_none() && hits.keyword.is_none() {
                if variant.is_original() {
                    return Err(RagError::BackendUnavailable(format!(
                        "semantic ({}) and keyword search both failed",
                        self.semantic.name()
                    )));
                }
                tracing::warn!(variant = %variant.text, "Skipping variant, both backends failed");
                continue;
            }
            passes.push(self.scorer.score_variant(
                hits.semantic.unwrap_or_default(),
                hits.keyword.unwrap_or_default(),
                ctx,
                variant.weight,
            ));
        }

        let ranked = self.scorer.merge_variants(passes);
        let (additions, _stats) = self.resolver.resolve(&ranked, self.store.as_ref()).await;

        signals.exact_match = ranked.iter().any(|c| c.has_exact_bonus());
        let organic = ranked.len();
        let mut candidates = ranked;
        candidates.extend(additions);

        let packet = self.assembler.assemble(&candidates, budget, signals)?;

        tracing::info!(
            variants = variants.len(),
            candidates = organic,
            cross_references = candidates.len() - organic,
            sources = packet.len(),
            total_tokens = packet.total_tokens,
            exact_match = packet.signals.exact_match,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Retrieval complete"
        );

        Ok(packet)
    }

    /// Run both searches for one variant concurrently
    async fn search_variant(
        &self,
        variant: &QueryVariant,
        filters: &SearchFilters,
        keyword_index: Arc<dyn KeywordSearch>,
    ) -> VariantHits {
        let timeout = Duration::from_millis(self.settings.retrieval.search_timeout_ms);
        let semantic_top_k = self.settings.retrieval.semantic_top_k;
        let keyword_top_k = self.settings.retrieval.keyword_top_k;

        let semantic_future = async {
            match tokio::time::timeout(timeout, self.semantic.search(&variant.text, filters, semantic_top_k)).await {
                Ok(Ok(hits)) => Some(hits),
                Ok(Err(e)) => {
                    tracing::warn!(variant = %variant.text, error = %e, "Semantic search failed, degrading to keyword only");
                    None
                }
                Err(_) => {
                    tracing::warn!(variant = %variant.text, timeout_ms = timeout.as_millis() as u64, "Semantic search timed out");
                    None
                }
            }
        };

        // Tantivy search is CPU-bound, keep it off the async executor
        let query_owned = variant.text.clone();
        let keyword_future = async move {
            let task = tokio::task::spawn_blocking(move || keyword_index.search(&query_owned, keyword_top_k));
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(Ok(hits))) => Some(hits),
                Ok(Ok(Err(e))) => {
                    tracing::warn!(error = %e, "Keyword search failed, degrading to semantic only");
                    None
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Keyword search task failed");
                    None
                }
                Err(_) => {
                    tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Keyword search timed out");
                    None
                }
            }
        };

        let (semantic, keyword) = tokio::join!(semantic_future, keyword_future);
        VariantHits { semantic, keyword }
    }

    /// Confidence for a packet given the source ids a generator cited
    pub fn estimate_confidence(&self, packet: &ContextPacket, cited_source_ids: &[String]) -> ConfidenceResult {
        self.estimator.estimate(packet, cited_source_ids)
    }

    /// Ask `generator` to answer from `packet`, then score the answer
    ///
    /// When the result requires a caution message the caller must show
    /// that instead of the generated text.
    pub async fn answer(
        &self,
        query: &str,
        packet: &ContextPacket,
        generator: &dyn Generator,
    ) -> Result<AnswerWithConfidence, RagError> {
        let timeout = Duration::from_millis(self.settings.retrieval.generation_timeout_ms);
        let answer = tokio::time::timeout(timeout, generator.answer(query, packet))
            .await
            .map_err(|_| RagError::Timeout(format!("{} exceeded {:?}", generator.name(), timeout)))?
            .map_err(|e| RagError::Generation(e.to_string()))?;

        let confidence = self.estimate_confidence(packet, &answer.cited_source_ids);
        if confidence.requires_caution_message() {
            tracing::warn!(query, "Use-of-force query without supporting policy or statute");
        }

        Ok(AnswerWithConfidence { answer, confidence })
    }
}
