//! Language-model seam used by query expansion and relevance filtering.

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use futures::future::BoxFuture;

use crate::error::RetrieverError;

/// Text and vision completions.
///
/// Outputs are untrusted free text; callers parse them defensively.
pub trait LanguageModel: Send + Sync {
    /// Sends a `(system, user)` prompt pair and returns the assistant's text.
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, RetrieverError>>;

    /// Sends `prompt` followed by `image_urls` (in order) to a vision model.
    fn complete_with_images<'a>(
        &'a self,
        prompt: &'a str,
        image_urls: &'a [String],
    ) -> BoxFuture<'a, Result<String, RetrieverError>>;
}

/// [`LanguageModel`] over the shared `chat` and `vision` profiles.
#[derive(Clone)]
pub struct ServiceLanguageModel {
    svc: Arc<LlmServiceProfiles>,
}

impl ServiceLanguageModel {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl LanguageModel for ServiceLanguageModel {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        Box::pin(async move { Ok(self.svc.generate_chat(user, Some(system)).await?) })
    }

    fn complete_with_images<'a>(
        &'a self,
        prompt: &'a str,
        image_urls: &'a [String],
    ) -> BoxFuture<'a, Result<String, RetrieverError>> {
        Box::pin(async move { Ok(self.svc.generate_vision(prompt, image_urls).await?) })
    }
}
