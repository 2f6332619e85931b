//! Product retrieval over a prebuilt index.
//!
//! A query is expanded into product phrases by a chat model, each phrase is
//! embedded and searched, candidates are confirmed by a vision model, and the
//! survivors are ranked by score with duplicate titles removed.

mod cfg;
mod engine;
mod error;
mod expand;
mod llm;
mod prompt;
mod relevance;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use product_index::{ClipTextEmbedder, TextEmbedder};

pub use cfg::RetrieverConfig;
pub use engine::Retriever;
pub use error::RetrieverError;
pub use expand::expand_query;
pub use llm::{LanguageModel, ServiceLanguageModel};
pub use prompt::{
    DELIMITER, EXPANSION_SYSTEM, Expansion, NO_RELEVANT_SENTINEL, OFF_DOMAIN_SENTINEL,
    parse_expansion, parse_relevant_ids, relevance_prompt,
};
pub use relevance::{Candidate, filter_relevant};

/// Opens a [`Retriever`] from environment configuration over shared model profiles.
///
/// `embedding_dim`, when set, is enforced on query vectors.
pub fn from_env(
    svc: Arc<LlmServiceProfiles>,
    embedding_dim: Option<usize>,
) -> Result<Retriever, RetrieverError> {
    let cfg = RetrieverConfig::from_env()?;
    let embedder: Arc<dyn TextEmbedder> =
        Arc::new(ClipTextEmbedder::new(svc.clone(), embedding_dim));
    let llm: Arc<dyn LanguageModel> = Arc::new(ServiceLanguageModel::new(svc));
    Retriever::open(cfg, embedder, llm)
}
