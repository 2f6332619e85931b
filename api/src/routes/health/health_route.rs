use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::app::{http::response_envelope::Envelope, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub index_loaded: bool,
    pub rows: usize,
}

/// `GET /health`: liveness plus whether an index is being served.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let rows = state.retriever().await.map(|r| r.index().len());
    Envelope::ok(HealthResponse {
        status: "ok",
        index_loaded: rows.is_some(),
        rows: rows.unwrap_or(0),
    })
    .into_response()
}
