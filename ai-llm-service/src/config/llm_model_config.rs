use crate::{config::llm_provider::LlmProvider, retry::RetryPolicy};

/// Configuration for one model profile.
///
/// # Fields
///
/// - `provider`: Which backend family serves the profile.
/// - `model`: The model identifier (e.g., `"gpt-4.1"`, `"clip-ViT-B-32"`).
/// - `endpoint`: Base URL of the server, without the `/v1/...` suffix.
/// - `api_key`: Optional API key (mandatory for [`LlmProvider::OpenAI`]).
/// - `max_tokens`: Maximum number of tokens to generate (chat profiles only).
/// - `temperature`: Sampling temperature (chat profiles only).
/// - `top_p`: Nucleus sampling cutoff (chat profiles only).
/// - `timeout_secs`: Optional request timeout in seconds.
/// - `retry`: Retry policy applied around every call made with this profile.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider, RetryPolicy};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "gpt-4.1".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     max_tokens: None,
///     temperature: Some(0.3),
///     top_p: None,
///     timeout_secs: Some(60),
///     retry: RetryPolicy::default(),
/// };
/// assert_eq!(cfg.model, "gpt-4.1");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The backend family.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Server base URL.
    pub endpoint: String,

    /// Optional API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (controls creativity).
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,

    /// Bounded retry with exponential backoff.
    pub retry: RetryPolicy,
}
