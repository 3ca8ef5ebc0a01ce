//! Request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{info, instrument};

use crate::detection::{self, DetectionType};
use crate::error::DetectError;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;
use crate::storage::{format_for, validate_filename};

/// Successful detection response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

/// Fields pulled out of the multipart form
#[derive(Default)]
struct UploadForm {
    file: Option<(String, Bytes)>,
    detection_type: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_owned).unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(ApiError::from_multipart)?;
                form.file = Some((filename, data));
            }
            Some("type") | Some("detection_type") => {
                let value = field
                    .text()
                    .await
                    .map_err(ApiError::from_multipart)?;
                form.detection_type = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    Ok(form)
}

/// `POST /upload`: run the requested pipeline and store the annotated image.
#[instrument(skip_all)]
pub async fn upload(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    let form = read_form(multipart).await?;

    let (filename, bytes) = form
        .file
        .filter(|(name, data)| !name.is_empty() && !data.is_empty())
        .ok_or_else(|| DetectError::missing_input("No file provided"))?;
    let detection_type = form
        .detection_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DetectError::missing_input("No detection type provided"))?;

    validate_filename(&filename)?;
    let pipeline = detection::resolve(&detection_type)?;

    state.store.save_upload(&filename, &bytes).await?;

    let detectors = state.detectors.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes).map_err(|e| DetectError::Decode(e.to_string()))?;
        pipeline.run(&detectors, &img)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Detection task failed: {e}")))??;

    info!(
        %filename,
        %detection_type,
        regions = outcome.regions.len(),
        drawn = outcome.detections.len(),
        "detection complete"
    );

    state.store.save(&filename, outcome.image).await?;

    Ok(Json(UploadResponse {
        message: format!("{detection_type} detection complete"),
        filename,
    }))
}

/// `GET /processed/:filename`: serve an annotated image.
pub async fn processed(State(state): State<AppState>, Path(filename): Path<String>) -> ApiResult<impl IntoResponse> {
    let bytes = state.store.load(&filename).await?;
    let mime = format_for(&filename).to_mime_type();
    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}

#[derive(Debug, Serialize)]
pub struct DetectionTypeInfo {
    pub name: &'static str,
    /// All cascades this type needs are loaded
    pub available: bool,
}

/// `GET /detection-types`: registry keys and whether each can run.
pub async fn detection_types(State(state): State<AppState>) -> Json<Vec<DetectionTypeInfo>> {
    let types = DetectionType::ALL
        .iter()
        .map(|t| DetectionTypeInfo {
            name: t.as_str(),
            available: t.targets().into_iter().all(|target| state.detectors.get(target).is_ok()),
        })
        .collect();
    Json(types)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
