//! Retrieval pipeline: expand → search per phrase → merge → filter → rank.

use std::{collections::HashSet, sync::Arc, time::Instant};

use futures::{FutureExt, StreamExt, future::BoxFuture, stream};
use product_index::{Hit, Item, ProductIndex, TextEmbedder, l2_normalize};
use tracing::{debug, info, warn};

use crate::{
    cfg::RetrieverConfig,
    error::RetrieverError,
    expand::expand_query,
    llm::LanguageModel,
    prompt::Expansion,
    relevance::{Candidate, filter_relevant},
};

/// Read-only query engine over a loaded [`ProductIndex`].
///
/// Safe to share across concurrent queries.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<ProductIndex>,
    embedder: Arc<dyn TextEmbedder>,
    llm: Arc<dyn LanguageModel>,
    cfg: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<ProductIndex>,
        embedder: Arc<dyn TextEmbedder>,
        llm: Arc<dyn LanguageModel>,
        cfg: RetrieverConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            cfg,
        }
    }

    /// Loads the artifacts named in `cfg` and wires the engine.
    pub fn open(
        cfg: RetrieverConfig,
        embedder: Arc<dyn TextEmbedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self, RetrieverError> {
        cfg.validate()?;
        let index = ProductIndex::load(&cfg.index_path, &cfg.metadata_path)?;
        Ok(Self::new(Arc::new(index), embedder, llm, cfg))
    }

    pub fn index(&self) -> &ProductIndex {
        &self.index
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.cfg
    }

    /// Runs a query with the configured `base_k`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Item>, RetrieverError> {
        self.retrieve_with_k(query, self.cfg.base_k).await
    }

    /// Runs a query, asking the index for `k` hits per expanded phrase.
    ///
    /// Off-domain queries and queries with no usable phrases return an empty
    /// list without touching the index. Embedding and search failures skip the
    /// phrase; model failures degrade per phrase or per batch.
    pub async fn retrieve_with_k(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<Item>, RetrieverError> {
        let started = Instant::now();

        let phrases = match expand_query(self.llm.as_ref(), query, self.cfg.max_phrases).await {
            Expansion::OffDomain => {
                info!(query, "query rejected as off-domain");
                return Ok(Vec::new());
            }
            Expansion::Phrases(p) if p.is_empty() => {
                info!(query, "no usable phrases");
                return Ok(Vec::new());
            }
            Expansion::Phrases(p) => p,
        };

        let hits = self.search_phrases(&phrases, k).await;
        if hits.is_empty() {
            info!(query, phrases = phrases.len(), "no hits");
            return Ok(Vec::new());
        }

        let candidates = candidates_of(&hits);
        let relevant = filter_relevant(
            self.llm.as_ref(),
            query,
            &candidates,
            self.cfg.relevance_batch_size,
            self.cfg.relevance_concurrency,
        )
        .await;

        let items = rank(hits, &relevant);
        info!(
            query,
            phrases = phrases.len(),
            candidates = candidates.len(),
            results = items.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "query answered"
        );
        Ok(items)
    }

    /// Hits for every phrase, concatenated in phrase order.
    async fn search_phrases(&self, phrases: &[String], k: usize) -> Vec<Hit> {
        let futs: Vec<BoxFuture<'_, Vec<Hit>>> = phrases
            .iter()
            .map(|phrase| self.search_phrase(phrase, k).boxed())
            .collect();
        let per_phrase: Vec<Vec<Hit>> = stream::iter(futs)
            .buffered(self.cfg.phrase_concurrency.max(1))
            .collect()
            .await;
        per_phrase.into_iter().flatten().collect()
    }

    /// Any failure for one phrase is logged and yields no hits for it.
    async fn search_phrase(&self, phrase: &str, k: usize) -> Vec<Hit> {
        let input = [phrase.to_string()];
        let mut query = match self.embedder.embed_texts(&input).await {
            Ok(mut v) if v.len() == 1 => v.remove(0),
            Ok(v) => {
                warn!(
                    phrase,
                    got = v.len(),
                    "embedder returned wrong vector count; phrase skipped"
                );
                return Vec::new();
            }
            Err(e) => {
                warn!(phrase, error = %e, "phrase embedding failed; phrase skipped");
                return Vec::new();
            }
        };
        if !l2_normalize(&mut query) {
            warn!(phrase, "phrase embedding has zero norm; phrase skipped");
            return Vec::new();
        }

        match self.index.search(&query, k) {
            Ok(hits) => {
                debug!(phrase, hits = hits.len(), "phrase searched");
                hits
            }
            Err(e) => {
                warn!(phrase, error = %e, "phrase search failed; phrase skipped");
                Vec::new()
            }
        }
    }
}

/// Unique candidates in first-seen order.
fn candidates_of(hits: &[Hit]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter(|h| seen.insert(h.item.parent_asin.as_str()))
        .map(|h| Candidate {
            id: h.item.parent_asin.clone(),
            image_url: h.item.main_image.clone(),
        })
        .collect()
}

/// Keeps confirmed hits, sorts by score (stable), dedupes by title.
fn rank(hits: Vec<Hit>, relevant: &HashSet<String>) -> Vec<Item> {
    let mut kept: Vec<Hit> = hits
        .into_iter()
        .filter(|h| relevant.contains(&h.item.parent_asin))
        .collect();
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut titles = HashSet::new();
    kept.into_iter()
        .filter(|h| titles.insert(h.item.title.clone()))
        .map(|h| h.item)
        .collect()
}
