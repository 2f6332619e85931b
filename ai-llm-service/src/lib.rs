//! Shared LLM service for the fashion search engine.
//!
//! Four logical profiles live behind one [`service_profiles::LlmServiceProfiles`]:
//! - **chat**            → query expansion
//! - **vision**          → image relevance checks
//! - **text embedding**  → CLIP text tower
//! - **image embedding** → CLIP vision tower
//!
//! Every outbound call is wrapped in [`retry::with_backoff`].

pub mod config;
pub mod error_handler;
pub mod retry;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{AiLlmError, Result};
pub use retry::RetryPolicy;
pub use service_profiles::LlmServiceProfiles;
pub use services::embedding_service::Modality;
