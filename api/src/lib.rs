//! HTTP adapter over the product index and retriever.

use std::{env, sync::Arc};

pub mod app;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{info, warn};

use crate::{
    app::state::AppState,
    error_handler::AppError,
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        health::health_route::health_route, index_build::build_route::build_index_route,
        search::search_route::search_route,
    },
};

const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

/// All routes over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(search_route))
        .route("/index/build", post(build_index_route))
        .route("/health", get(health_route))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
}

/// Serves the API on `API_ADDRESS` until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| DEFAULT_ADDRESS.into());
    let state = Arc::new(AppState::from_env().await?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("api stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Json,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    };
    use serde_json::Value;

    use crate::{
        routes::{
            health::health_route::health_route,
            index_build::{build_request::BuildRequest, build_route::build_index_route},
            search::{search_request::SearchRequest, search_route::search_route},
        },
        test_support::{state_with_catalog, state_without_index},
    };

    async fn body(res: Response) -> (StatusCode, Value) {
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn search(state: &Arc<crate::app::state::AppState>, query: &str, k: Option<usize>) -> (StatusCode, Value) {
        let res = search_route(
            State(state.clone()),
            HeaderMap::new(),
            Ok(Json(SearchRequest {
                query: query.into(),
                k,
            })),
        )
        .await
        .into_response();
        body(res).await
    }

    #[tokio::test]
    async fn search_without_index_is_unavailable() {
        let state = state_without_index();
        let (status, v) = search(&state, "swim trunks", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(v["error"]["code"], "INDEX_NOT_READY");
    }

    #[tokio::test]
    async fn blank_query_and_bad_k_are_rejected() {
        let state = state_without_index();
        let (status, v) = search(&state, "   ", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"]["details"][0]["path"], "query");

        let (status, v) = search(&state, "scarf", Some(0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"]["details"][0]["path"], "k");
    }

    #[tokio::test]
    async fn build_then_search_serves_new_index() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_catalog(dir.path());

        let (_, v) = body(health_route(State(state.clone())).await).await;
        assert_eq!(v["data"]["index_loaded"], false);

        let res = build_index_route(State(state.clone()), Json(BuildRequest::default()))
            .await
            .into_response();
        let (status, v) = body(res).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["data"]["report"]["indexed"], 2);
        assert_eq!(v["data"]["report"]["skipped"], 1);

        let (_, v) = body(health_route(State(state.clone())).await).await;
        assert_eq!(v["data"]["index_loaded"], true);
        assert_eq!(v["data"]["rows"], 2);

        let (status, v) = search(&state, "beach day", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["data"]["count"], 1);
        assert_eq!(v["data"]["items"][0]["parent_asin"], "A");
    }

    #[tokio::test]
    async fn off_domain_query_is_an_empty_success() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_catalog(dir.path());
        build_index_route(State(state.clone()), Json(BuildRequest::default()))
            .await
            .unwrap();

        let (status, v) = search(&state, "laptop for programming", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["data"]["count"], 0);
        assert_eq!(v["data"]["message"], "No results found.");
    }

    #[tokio::test]
    async fn missing_catalog_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_catalog(dir.path());
        let res = build_index_route(
            State(state),
            Json(BuildRequest {
                catalog_path: Some(dir.path().join("missing.jsonl").display().to_string()),
                sample_size: None,
            }),
        )
        .await
        .into_response();
        let (status, v) = body(res).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(v["error"]["code"], "CATALOG_NOT_FOUND");
    }
}
