use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use product_index::IndexError;
use product_retriever::RetrieverError;
use thiserror::Error;

use crate::app::http::response_envelope::{Envelope, FieldIssue};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    // --- IO / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        field: Option<&'static str>,
    },

    /// Rich HTTP error mapped from lower layers with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn bad_field(field: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            field: Some(field),
        }
    }

    pub fn index_not_ready() -> Self {
        AppError::Http {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "INDEX_NOT_READY",
            message: "No product index is loaded. Build one via POST /index/build.".into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Http { status, .. } => *status,
            AppError::Config(_) | AppError::Bind(_) | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest { .. } => "BAD_REQUEST",
            AppError::Http { code, .. } => code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut envelope =
            Envelope::failure(self.status_code(), self.error_code(), self.to_string());
        if let AppError::BadRequest {
            field: Some(f), ..
        } = &self
        {
            envelope = envelope.with_issue(FieldIssue::field(*f));
        }
        envelope.into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest {
            message: err.body_text(),
            field: None,
        }
    }
}

/// Build failures: bad input paths and config are the caller's fault,
/// structural and upstream failures are not.
impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        let (status, code) = match &err {
            IndexError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (StatusCode::NOT_FOUND, "CATALOG_NOT_FOUND")
            }
            IndexError::Config(_) | IndexError::EmptyTaxonomy => {
                (StatusCode::BAD_REQUEST, "INVALID_BUILD_CONFIG")
            }
            IndexError::Embedding(_) => (StatusCode::BAD_GATEWAY, "EMBEDDING_FAILED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INDEX_ERROR"),
        };
        AppError::Http {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<RetrieverError> for AppError {
    fn from(err: RetrieverError) -> Self {
        match err {
            RetrieverError::Index(e) => AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "SEARCH_FAILED",
                message: format!("Search failed: {e}"),
            },
            RetrieverError::Llm(e) => AppError::Http {
                status: StatusCode::BAD_GATEWAY,
                code: "LLM_FAILED",
                message: e.to_string(),
            },
            RetrieverError::Config(m) => AppError::Config(m),
        }
    }
}
