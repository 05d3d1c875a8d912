use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::PredictError;
use crate::labels::Label;
use crate::metrics::WelcomeResponse;
use crate::model::InferenceEngine;

/// Multipart field the frontend uploads the image under.
pub const FILE_FIELD: &str = "file";

pub struct AppState {
    pub engine: InferenceEngine,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: Label,
}

pub fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin, method and header, with credentials. Wildcards are not valid
/// alongside credentials, so the request's own values are mirrored back.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn home() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::new())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

async fn predict_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, PredictError> {
    let result = classify_upload(&state, multipart).await;
    if let Err(err) = &result {
        warn!(status = %err.status(), "Prediction failed: {}", err);
    }
    result.map(|prediction| Json(PredictionResponse { prediction }))
}

async fn classify_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Label, PredictError> {
    let multipart = multipart.map_err(|rejection| PredictError::Upload(rejection.to_string()))?;
    let image_data = read_upload(multipart).await?;

    let started = Instant::now();
    let size = image_data.len();
    let engine = state.engine.clone();
    // Decoding and the forward pass are CPU-bound.
    let label = tokio::task::spawn_blocking(move || engine.predict_bytes(&image_data))
        .await
        .map_err(|err| PredictError::Inference(format!("Inference task failed: {}", err)))??;

    info!(
        bytes = size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Predicted {}",
        label
    );
    Ok(label)
}

/// Take the `file` field; failing that, the first field that carries a file
/// name.
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, PredictError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| PredictError::Upload(err.to_string()))?
    {
        let is_file_field = field.name() == Some(FILE_FIELD);
        if !is_file_field && (upload.is_some() || field.file_name().is_none()) {
            continue;
        }

        upload = Some(
            field
                .bytes()
                .await
                .map_err(|err| PredictError::Upload(err.to_string()))?,
        );
        if is_file_field {
            break;
        }
    }

    match upload {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(PredictError::MissingFile),
    }
}
