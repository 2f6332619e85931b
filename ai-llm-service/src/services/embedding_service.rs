//! Batched embeddings against an OpenAI-compatible `/v1/embeddings` endpoint.
//!
//! CLIP servers (Infinity, clip-as-service bridges, ...) accept the same
//! request shape with an extra `modality` field; images travel as `data:` URIs.
//! Response rows are re-ordered by their `index` and the row count must match
//! the input count.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::llm_model_config::LlmModelConfig,
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
    services::open_ai_service::{default_headers, validated_base},
};

/// Input modality understood by multimodal embedding servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

/// Thin embeddings client bound to one model.
#[derive(Debug)]
pub struct EmbeddingService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_embeddings: String,
}

impl EmbeddingService {
    /// Creates a new [`EmbeddingService`].
    ///
    /// # Errors
    /// Same validation rules as [`crate::services::open_ai_service::OpenAiService::new`].
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

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "EmbeddingService initialized"
        );

        Ok(Self {
            client,
            url_embeddings: format!("{base}/v1/embeddings"),
            cfg,
        })
    }

    /// Embeds `inputs` in one request, returning vectors in input order.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`ProviderErrorKind::Decode`] for unexpected payloads
    /// - [`ProviderErrorKind::CountMismatch`] if rows are missing
    pub async fn embed_batch(
        &self,
        inputs: &[String],
        modality: Modality,
    ) -> Result<Vec<Vec<f32>>, AiLlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: inputs,
            modality,
        };

        debug!(
            model = %self.cfg.model,
            ?modality,
            batch = inputs.len(),
            "POST {}", self.url_embeddings
        );

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "/v1/embeddings returned non-success status"
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

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                self.cfg.provider,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `data[].embedding`")),
            )
        })?;

        let vectors = order_rows(out.data, inputs.len()).map_err(|kind| {
            AiLlmError::from(ProviderError::new(self.cfg.provider, kind))
        })?;

        debug!(
            model = %self.cfg.model,
            batch = inputs.len(),
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );
        Ok(vectors)
    }
}

/// Sorts response rows by `index` and checks the count.
fn order_rows(mut data: Vec<EmbeddingItem>, want: usize) -> Result<Vec<Vec<f32>>, ProviderErrorKind> {
    if data.len() != want {
        return Err(ProviderErrorKind::CountMismatch {
            got: data.len(),
            want,
        });
    }
    data.sort_by_key(|row| row.index);
    Ok(data.into_iter().map(|row| row.embedding).collect())
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    modality: Modality,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}
