//! OpenAI-compatible chat service for text and vision prompts.
//!
//! Minimal, non-streaming client around the chat completions REST API.
//! The endpoint is derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions
//!
//! Two request shapes are supported:
//! - plain text: optional system message + user message
//! - vision: a single user message made of one `text` part followed by
//!   one `image_url` part per image, in caller order
//!
//! Constructor validation:
//! - `cfg.api_key` must be present when the provider requires one
//! - `cfg.endpoint` must start with http:// or https://

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::llm_model_config::LlmModelConfig,
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
};

/// Thin client for the chat completions API.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::MissingApiKey`] if the provider needs a key and none is set
    /// - [`ProviderErrorKind::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let headers = default_headers(&cfg)?;
        let base = validated_base(&cfg)?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_chat = format!("{base}/v1/chat/completions");

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(60),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a text-only chat completion.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - [`ProviderErrorKind::Decode`] if the JSON cannot be parsed
    /// - [`ProviderErrorKind::EmptyChoices`] if no choices are returned
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(sys),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: MessageContent::Text(prompt),
        });

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_chat
        );
        self.complete(messages).await
    }

    /// Performs a vision chat completion: `prompt` followed by every image URL.
    ///
    /// `image_urls` may be remote URLs or `data:` URIs.
    ///
    /// # Errors
    /// Same as [`OpenAiService::generate`].
    pub async fn generate_with_images(
        &self,
        prompt: &str,
        image_urls: &[String],
    ) -> Result<String, AiLlmError> {
        let mut parts = Vec::with_capacity(image_urls.len() + 1);
        parts.push(ContentPart::Text { text: prompt });
        for url in image_urls {
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl { url },
            });
        }
        let messages = vec![ChatMessage {
            role: "user",
            content: MessageContent::Parts(parts),
        }];

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            images = image_urls.len(),
            "POST {} (vision)", self.url_chat
        );
        self.complete(messages).await
    }

    async fn complete(&self, messages: Vec<ChatMessage<'_>>) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages,
            temperature: self.cfg.temperature,
            top_p: self.cfg.top_p,
            max_tokens: self.cfg.max_tokens,
        };

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "/v1/chat/completions returned non-success status"
            );

            return Err(ProviderError::new(
                self.cfg.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            error!(
                error = %e,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "failed to decode /v1/chat/completions response"
            );
            ProviderError::new(
                self.cfg.provider,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `choices[0].message.content`"
                )),
            )
        })?;

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(self.cfg.provider, ProviderErrorKind::EmptyChoices))?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "chat completion completed"
        );

        Ok(content)
    }
}

/// Builds bearer + JSON headers, enforcing the provider's key requirement.
pub(crate) fn default_headers(cfg: &LlmModelConfig) -> Result<header::HeaderMap, AiLlmError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    match cfg.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|e| {
                    ProviderError::new(
                        cfg.provider,
                        ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                    )
                })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        None if cfg.provider.requires_api_key() => {
            return Err(ProviderError::new(cfg.provider, ProviderErrorKind::MissingApiKey).into());
        }
        None => {}
    }
    Ok(headers)
}

/// Returns the endpoint without a trailing slash after validating its scheme.
pub(crate) fn validated_base(cfg: &LlmModelConfig) -> Result<String, AiLlmError> {
    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty()
        || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ProviderError::new(
            cfg.provider,
            ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
        )
        .into());
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Minimal request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    /// One of: "system" | "user" | "assistant"
    role: &'a str,
    content: MessageContent<'a>,
}

/// Either a plain string or an array of typed parts (vision).
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmProvider, RetryPolicy};

    fn cfg(provider: LlmProvider, key: Option<&str>, endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: "gpt-4.1".into(),
            endpoint: endpoint.into(),
            api_key: key.map(str::to_string),
            max_tokens: None,
            temperature: Some(0.3),
            top_p: None,
            timeout_secs: Some(5),
            retry: RetryPolicy::none(),
        }
    }

    #[test]
    fn vision_payload_shape() {
        let urls = ["https://img/a.jpg".to_string()];
        let parts = vec![
            ContentPart::Text { text: "which?" },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: &urls[0] },
            },
        ];
        let msg = ChatMessage {
            role: "user",
            content: MessageContent::Parts(parts),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["content"][0]["type"], "text");
        assert_eq!(v["content"][1]["type"], "image_url");
        assert_eq!(v["content"][1]["image_url"]["url"], "https://img/a.jpg");

        let plain = ChatMessage {
            role: "system",
            content: MessageContent::Text("be brief"),
        };
        assert_eq!(serde_json::to_value(&plain).unwrap()["content"], "be brief");
    }

    #[test]
    fn hosted_provider_requires_key() {
        let err = OpenAiService::new(cfg(LlmProvider::OpenAI, None, "https://api.openai.com"));
        assert!(matches!(
            err,
            Err(AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::MissingApiKey,
                ..
            }))
        ));
        assert!(OpenAiService::new(cfg(LlmProvider::Local, None, "http://localhost:11434")).is_ok());
    }

    #[test]
    fn endpoint_scheme_is_validated() {
        let err = OpenAiService::new(cfg(LlmProvider::Local, None, "localhost:11434"));
        assert!(matches!(
            err,
            Err(AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::InvalidEndpoint(_),
                ..
            }))
        ));
    }
}
