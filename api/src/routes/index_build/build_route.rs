use std::{path::PathBuf, sync::Arc};

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use product_index::{Embedders, NoopProgress, build_index};
use product_retriever::Retriever;
use tracing::{error, info, instrument};

use crate::{
    app::{http::response_envelope::Envelope, state::AppState},
    error_handler::{AppError, AppResult},
    routes::index_build::{build_request::BuildRequest, build_response::BuildResponse},
};

/// `POST /index/build`: rebuilds both artifacts and swaps the served retriever.
///
/// Only one build runs at a time; queries keep using the previous index
/// until the new one is written.
#[instrument(name = "build_index_route", skip(state, body))]
pub async fn build_index_route(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BuildRequest>,
) -> AppResult<Response> {
    let _guard = state.try_begin_build()?;

    let mut cfg = state.index_cfg.clone();
    match body.sample_size {
        Some(0) => return Err(AppError::bad_field("sample_size", "sample_size must be > 0")),
        Some(n) => cfg.sample_size = Some(n),
        None => {}
    }
    let catalog = body
        .catalog_path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.catalog_path.clone());

    info!(catalog = ?catalog, sample_size = ?cfg.sample_size, "index build requested");
    let embedders = Embedders {
        text: state.text.as_ref(),
        image: state.image.as_ref(),
    };
    let (index, report) = build_index(&cfg, &catalog, embedders, &NoopProgress)
        .await
        .map_err(|err| {
            error!(error = %err, "index build failed");
            AppError::from(err)
        })?;

    let retriever = Retriever::new(
        Arc::new(index),
        state.text.clone(),
        state.llm.clone(),
        state.retriever_cfg.clone(),
    );
    state.set_retriever(retriever).await;

    Ok(Envelope::ok(BuildResponse {
        message: format!("Indexed {} products.", report.indexed),
        catalog_path: catalog.display().to_string(),
        index_path: cfg.index_path.display().to_string(),
        metadata_path: cfg.metadata_path.display().to_string(),
        report,
    })
    .into_response())
}
