use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use product_index::{ClipImageEmbedder, ClipTextEmbedder, ImageEmbedder, IndexConfig, TextEmbedder};
use product_retriever::{LanguageModel, Retriever, RetrieverConfig, ServiceLanguageModel};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Build settings (catalog, taxonomy, mixing weights, artifact paths).
    pub index_cfg: IndexConfig,
    /// Query settings; its artifact paths follow `index_cfg`.
    pub retriever_cfg: RetrieverConfig,
    pub text: Arc<dyn TextEmbedder>,
    pub image: Arc<dyn ImageEmbedder>,
    pub llm: Arc<dyn LanguageModel>,
    retriever: RwLock<Option<Arc<Retriever>>>,
    /// Held for the whole duration of an index build.
    build_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        index_cfg: IndexConfig,
        mut retriever_cfg: RetrieverConfig,
        text: Arc<dyn TextEmbedder>,
        image: Arc<dyn ImageEmbedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        retriever_cfg.index_path = index_cfg.index_path.clone();
        retriever_cfg.metadata_path = index_cfg.metadata_path.clone();
        Self {
            index_cfg,
            retriever_cfg,
            text,
            image,
            llm,
            retriever: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Load shared state from environment variables.
    ///
    /// Existing index artifacts are opened right away; a missing or broken
    /// index is logged and the server starts without one.
    pub async fn from_env() -> Result<Self, AppError> {
        let index_cfg = IndexConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let retriever_cfg =
            RetrieverConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let svc = Arc::new(
            LlmServiceProfiles::from_env().map_err(|e| AppError::Config(e.to_string()))?,
        );
        let dim = index_cfg.embedding_dim;

        let state = Self::new(
            index_cfg,
            retriever_cfg,
            Arc::new(ClipTextEmbedder::new(svc.clone(), dim)),
            Arc::new(ClipImageEmbedder::new(svc.clone(), dim)),
            Arc::new(ServiceLanguageModel::new(svc)),
        );

        match Retriever::open(state.retriever_cfg.clone(), state.text.clone(), state.llm.clone()) {
            Ok(r) => state.set_retriever(r).await,
            Err(e) => warn!(error = %e, "no usable index on disk; build one via POST /index/build"),
        }
        Ok(state)
    }

    /// The retriever currently served, if an index is loaded.
    pub async fn retriever(&self) -> Option<Arc<Retriever>> {
        self.retriever.read().await.clone()
    }

    pub async fn set_retriever(&self, r: Retriever) {
        info!(rows = r.index().len(), "serving index");
        *self.retriever.write().await = Some(Arc::new(r));
    }

    /// Fails fast with `BUILD_IN_PROGRESS` if another build holds the lock.
    pub fn try_begin_build(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, AppError> {
        self.build_lock.try_lock().map_err(|_| AppError::Http {
            status: axum::http::StatusCode::CONFLICT,
            code: "BUILD_IN_PROGRESS",
            message: "An index build is already running.".into(),
        })
    }
}
