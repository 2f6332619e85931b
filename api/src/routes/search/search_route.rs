use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, instrument};

use crate::{
    app::{http::response_envelope::Envelope, state::AppState},
    error_handler::{AppError, AppResult},
    routes::search::{search_request::SearchRequest, search_response::SearchResponse},
};

/// Upper bound on per-phrase depth accepted from clients.
pub const MAX_K: usize = 100;

/// `POST /search`: expands the query, searches, filters and ranks.
///
/// An off-domain query or one with no confirmed matches is a success with
/// `count: 0`.
#[instrument(name = "search_route", skip(state, headers, payload))]
pub async fn search_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(p) = payload?;
    let request_id = headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-");

    let query = p.query.trim();
    if query.is_empty() {
        return Err(AppError::bad_field("query", "query must not be empty"));
    }
    let k = p.k.unwrap_or(state.retriever_cfg.base_k);
    if k == 0 || k > MAX_K {
        return Err(AppError::bad_field("k", format!("k must be between 1 and {MAX_K}")));
    }

    let retriever = state.retriever().await.ok_or_else(AppError::index_not_ready)?;
    debug!(%request_id, query, k, "search_route: start");

    let items = retriever.retrieve_with_k(query, k).await.map_err(|err| {
        error!(%request_id, error = %err, "search_route: search failed");
        AppError::from(err)
    })?;

    debug!(%request_id, hits = items.len(), "search_route: success");
    let message = if items.is_empty() {
        "No results found."
    } else {
        "Search completed successfully."
    };
    Ok(Envelope::ok(SearchResponse {
        message,
        query: query.to_string(),
        count: items.len(),
        items,
    })
    .into_response())
}
