//! Typed error for the product-retriever crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrieverError {
    /// Errors from the product index (load, search, embedding).
    #[error("index error: {0}")]
    Index(#[from] product_index::IndexError),

    /// Chat / vision model failures.
    #[error("LLM error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}
