//! Shared LLM service with four profiles: `chat`, `vision`, `text_embedding`
//! and `image_embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - Every call is retried with backoff according to the profile's [`RetryPolicy`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::LlmServiceProfiles;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(LlmServiceProfiles::from_env()?);
//!
//!     let txt = svc.generate_chat("Describe a linen shirt", None).await?;
//!     println!("CHAT: {txt}");
//!
//!     let emb = svc.embed_texts(&["linen shirt".to_string()]).await?;
//!     println!("Embedding dim = {}", emb[0].len());
//!     Ok(())
//! }
//! ```
//!
//! [`RetryPolicy`]: crate::retry::RetryPolicy

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    config::{
        default_config::{config_chat, config_image_embedding, config_text_embedding, config_vision},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    retry::with_backoff,
    services::{
        embedding_service::{EmbeddingService, Modality},
        open_ai_service::OpenAiService,
    },
};

/// Shared service managing the chat, vision and embedding profiles.
pub struct LlmServiceProfiles {
    chat: LlmModelConfig,
    vision: LlmModelConfig,
    text_embedding: LlmModelConfig,
    image_embedding: LlmModelConfig,

    chat_clients: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,
    embed_clients: RwLock<HashMap<ClientKey, Arc<EmbeddingService>>>,
}

impl LlmServiceProfiles {
    /// Creates a new service from explicit profiles.
    pub fn new(
        chat: LlmModelConfig,
        vision: LlmModelConfig,
        text_embedding: LlmModelConfig,
        image_embedding: LlmModelConfig,
    ) -> Self {
        Self {
            chat,
            vision,
            text_embedding,
            image_embedding,
            chat_clients: RwLock::new(HashMap::new()),
            embed_clients: RwLock::new(HashMap::new()),
        }
    }

    /// Builds all four profiles from environment variables.
    ///
    /// # Errors
    /// Propagates configuration errors from [`crate::config::default_config`].
    pub fn from_env() -> Result<Self, AiLlmError> {
        Ok(Self::new(
            config_chat()?,
            config_vision()?,
            config_text_embedding()?,
            config_image_embedding()?,
        ))
    }

    /// Generates text using the **chat** profile.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] once retries are exhausted or on a permanent failure.
    pub async fn generate_chat(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        let cli = self.chat_client(&self.chat).await?;
        with_backoff(&self.chat.retry, "chat", || cli.generate(prompt, system)).await
    }

    /// Asks the **vision** profile about `prompt` with the given images attached.
    pub async fn generate_vision(
        &self,
        prompt: &str,
        image_urls: &[String],
    ) -> Result<String, AiLlmError> {
        let cli = self.chat_client(&self.vision).await?;
        with_backoff(&self.vision.retry, "vision", || {
            cli.generate_with_images(prompt, image_urls)
        })
        .await
    }

    /// Embeds texts with the **text embedding** profile, one vector per input.
    pub async fn embed_texts(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        let cli = self.embed_client(&self.text_embedding).await?;
        with_backoff(&self.text_embedding.retry, "embed_texts", || {
            cli.embed_batch(inputs, Modality::Text)
        })
        .await
    }

    /// Embeds images (as `data:` URIs or URLs) with the **image embedding** profile.
    pub async fn embed_images(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        let cli = self.embed_client(&self.image_embedding).await?;
        with_backoff(&self.image_embedding.retry, "embed_images", || {
            cli.embed_batch(inputs, Modality::Image)
        })
        .await
    }

    /// Returns references to the current profiles
    /// `(chat, vision, text_embedding, image_embedding)`.
    pub fn profiles(
        &self,
    ) -> (
        &LlmModelConfig,
        &LlmModelConfig,
        &LlmModelConfig,
        &LlmModelConfig,
    ) {
        (
            &self.chat,
            &self.vision,
            &self.text_embedding,
            &self.image_embedding,
        )
    }

    /* --------------------- Internals --------------------- */

    async fn chat_client(&self, cfg: &LlmModelConfig) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.chat_clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let fresh = Arc::new(OpenAiService::new(cfg.clone())?);
        let mut w = self.chat_clients.write().await;
        Ok(w.entry(key).or_insert(fresh).clone())
    }

    async fn embed_client(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<EmbeddingService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.embed_clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let fresh = Arc::new(EmbeddingService::new(cfg.clone())?);
        let mut w = self.embed_clients.write().await;
        Ok(w.entry(key).or_insert(fresh).clone())
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}
