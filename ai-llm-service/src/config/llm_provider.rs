/// Backend family serving a profile.
///
/// Both variants speak the OpenAI REST dialect (`/v1/chat/completions`,
/// `/v1/embeddings`); they differ only in authentication requirements.
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// fn needs_key(provider: LlmProvider) -> bool {
///     match provider {
///         LlmProvider::OpenAI => true,
///         LlmProvider::Local => false,
///     }
/// }
/// assert!(needs_key(LlmProvider::OpenAI));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Hosted OpenAI API. An API key is mandatory.
    OpenAI,
    /// Self-hosted OpenAI-compatible server (Ollama, vLLM, Infinity, ...).
    /// An API key is optional.
    Local,
}

impl LlmProvider {
    /// Whether requests must carry a bearer token.
    pub fn requires_api_key(self) -> bool {
        matches!(self, LlmProvider::OpenAI)
    }
}
