//! Vision-model relevance filter over candidate product images.

use std::collections::HashSet;

use futures::{FutureExt, StreamExt, future::BoxFuture, stream};
use tracing::{debug, warn};

use crate::{
    llm::LanguageModel,
    prompt::{parse_relevant_ids, relevance_prompt},
};

/// A candidate offered to the vision model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub image_url: String,
}

/// Returns the IDs the vision model confirms as relevant to `query`.
///
/// Candidates are sent in batches of `batch_size`, at most `concurrency`
/// batches in flight. A failed batch confirms nothing; other batches still count.
/// Only IDs from the offered batch are accepted.
pub async fn filter_relevant(
    llm: &dyn LanguageModel,
    query: &str,
    candidates: &[Candidate],
    batch_size: usize,
    concurrency: usize,
) -> HashSet<String> {
    if candidates.is_empty() {
        return HashSet::new();
    }

    let batches = candidates.chunks(batch_size.max(1)).enumerate();
    let futs: Vec<BoxFuture<'_, Vec<String>>> = batches
        .map(|(batch, chunk)| check_batch(llm, query, batch, chunk).boxed())
        .collect();
    let results: Vec<Vec<String>> = stream::iter(futs)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    results.into_iter().flatten().collect()
}

async fn check_batch(
    llm: &dyn LanguageModel,
    query: &str,
    batch: usize,
    chunk: &[Candidate],
) -> Vec<String> {
    let ids: Vec<&str> = chunk.iter().map(|c| c.id.as_str()).collect();
    let urls: Vec<String> = chunk.iter().map(|c| c.image_url.clone()).collect();
    let prompt = relevance_prompt(query, &ids);

    match llm.complete_with_images(&prompt, &urls).await {
        Ok(raw) => {
            let kept = parse_relevant_ids(&raw, &ids);
            debug!(
                batch,
                offered = ids.len(),
                kept = kept.len(),
                "relevance batch checked"
            );
            kept
        }
        Err(e) => {
            warn!(batch, error = %e, "relevance batch failed; confirming none");
            Vec::new()
        }
    }
}
