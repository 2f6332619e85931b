//! Default model configs loaded from environment variables.
//!
//! One constructor per profile:
//!
//! - **Chat**            → query expansion (`CHAT_MODEL`)
//! - **Vision**          → image relevance checks (`VISION_MODEL`)
//! - **Text embedding**  → CLIP text tower (`TEXT_EMBEDDING_MODEL`)
//! - **Image embedding** → CLIP vision tower (`IMAGE_EMBEDDING_MODEL`)
//!
//! # Environment variables
//!
//! Chat/vision:
//! - `LLM_ENDPOINT`                  = base URL (default `https://api.openai.com`)
//! - `LLM_API_KEY` or `OPENAI_API_KEY` = API key (required for the hosted API)
//! - `LLM_PROVIDER`                  = `openai` | `local` (default: `openai` when a key is set)
//! - `LLM_MAX_TOKENS`                = optional max tokens (u32)
//! - `LLM_TEMPERATURE`               = sampling temperature in `[0, 2]` (default 0.3)
//!
//! Embeddings:
//! - `EMBEDDING_ENDPOINT` = base URL of an OpenAI-compatible CLIP server (default `http://localhost:7997`)
//! - `EMBEDDING_API_KEY`  = optional key
//!
//! Shared:
//! - `LLM_TIMEOUT_SECS` (default 60), `LLM_MAX_RETRIES` (default 3), `LLM_RETRY_BASE_MS` (default 500)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_first, env_opt_u32, env_or, env_u64_or,
        validate_http_endpoint, validate_range_f32,
    },
    retry::RetryPolicy,
};

const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com";
const DEFAULT_EMBEDDING_ENDPOINT: &str = "http://localhost:7997";

/// Resolves the chat endpoint, key and provider.
///
/// # Errors
/// - [`ConfigError::InvalidFormat`] if the endpoint is not http(s)
/// - [`ConfigError::MissingVar`] if the hosted provider is selected without a key
fn llm_endpoint() -> Result<(String, Option<String>, LlmProvider), AiLlmError> {
    let endpoint = env_or("LLM_ENDPOINT", DEFAULT_LLM_ENDPOINT);
    validate_http_endpoint("LLM_ENDPOINT", &endpoint)?;

    let api_key = env_first(&["LLM_API_KEY", "OPENAI_API_KEY"]);
    let provider = match std::env::var("LLM_PROVIDER")
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .as_str()
    {
        "local" => LlmProvider::Local,
        "openai" => LlmProvider::OpenAI,
        _ if api_key.is_some() => LlmProvider::OpenAI,
        _ => LlmProvider::Local,
    };

    if provider.requires_api_key() && api_key.is_none() {
        return Err(ConfigError::MissingVar("LLM_API_KEY or OPENAI_API_KEY").into());
    }
    Ok((endpoint, api_key, provider))
}

fn embedding_endpoint() -> Result<(String, Option<String>, LlmProvider), AiLlmError> {
    let endpoint = env_or("EMBEDDING_ENDPOINT", DEFAULT_EMBEDDING_ENDPOINT);
    validate_http_endpoint("EMBEDDING_ENDPOINT", &endpoint)?;
    let api_key = env_first(&["EMBEDDING_API_KEY"]);
    let provider = if endpoint.starts_with(DEFAULT_LLM_ENDPOINT) {
        LlmProvider::OpenAI
    } else {
        LlmProvider::Local
    };
    Ok((endpoint, api_key, provider))
}

/// Retry policy shared by every profile.
///
/// # Errors
/// [`ConfigError::InvalidNumber`] when a knob is set but not numeric.
pub fn retry_policy_from_env() -> Result<RetryPolicy, AiLlmError> {
    let defaults = RetryPolicy::default();
    Ok(RetryPolicy {
        max_attempts: env_u64_or("LLM_MAX_RETRIES", defaults.max_attempts as u64)?.max(1) as u32,
        base_delay_ms: env_u64_or("LLM_RETRY_BASE_MS", defaults.base_delay_ms)?,
        max_delay_ms: defaults.max_delay_ms,
    })
}

fn temperature() -> Result<f32, AiLlmError> {
    let raw = env_or("LLM_TEMPERATURE", "0.3");
    let t = raw.trim().parse::<f32>().map_err(|_| {
        AiLlmError::from(ConfigError::InvalidNumber {
            var: "LLM_TEMPERATURE",
            reason: "expected f32",
        })
    })?;
    validate_range_f32("LLM_TEMPERATURE", t, 0.0, 2.0)?;
    Ok(t)
}

fn model_or(var: &'static str, default: &str) -> Result<String, AiLlmError> {
    let model = env_or(var, default);
    if model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }
    Ok(model)
}

/// Config for the **chat** profile used by query expansion.
///
/// # Env
/// - `CHAT_MODEL` (default `gpt-4.1`)
///
pub fn config_chat() -> Result<LlmModelConfig, AiLlmError> {
    let (endpoint, api_key, provider) = llm_endpoint()?;
    Ok(LlmModelConfig {
        provider,
        model: model_or("CHAT_MODEL", "gpt-4.1")?,
        endpoint,
        api_key,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature()?),
        top_p: None,
        timeout_secs: Some(env_u64_or("LLM_TIMEOUT_SECS", 60)?),
        retry: retry_policy_from_env()?,
    })
}

/// Config for the **vision** profile used by the relevance filter.
///
/// # Env
/// - `VISION_MODEL` (default `gpt-4.1`)
pub fn config_vision() -> Result<LlmModelConfig, AiLlmError> {
    let (endpoint, api_key, provider) = llm_endpoint()?;
    Ok(LlmModelConfig {
        provider,
        model: model_or("VISION_MODEL", "gpt-4.1")?,
        endpoint,
        api_key,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature()?),
        top_p: None,
        timeout_secs: Some(env_u64_or("LLM_TIMEOUT_SECS", 60)?),
        retry: retry_policy_from_env()?,
    })
}

/// Config for the **text embedding** profile (CLIP text tower).
///
/// # Env
/// - `TEXT_EMBEDDING_MODEL` (default `sentence-transformers/clip-ViT-B-32`)
pub fn config_text_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let (endpoint, api_key, provider) = embedding_endpoint()?;
    Ok(LlmModelConfig {
        provider,
        model: model_or("TEXT_EMBEDDING_MODEL", "sentence-transformers/clip-ViT-B-32")?,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(env_u64_or("LLM_TIMEOUT_SECS", 60)?),
        retry: retry_policy_from_env()?,
    })
}

/// Config for the **image embedding** profile (CLIP vision tower).
///
/// # Env
/// - `IMAGE_EMBEDDING_MODEL` (default `clip-ViT-B-32`)
pub fn config_image_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let (endpoint, api_key, provider) = embedding_endpoint()?;
    Ok(LlmModelConfig {
        provider,
        model: model_or("IMAGE_EMBEDDING_MODEL", "clip-ViT-B-32")?,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(env_u64_or("LLM_TIMEOUT_SECS", 60)?),
        retry: retry_policy_from_env()?,
    })
}
