use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument};

use super::{
    acquire,
    dto::{
        DetectRequest, DetectionResponse, HistoryItem, HistoryQuery, HistoryResponse, Pagination,
        ProxyQuery, StatsResponse,
    },
    normalize, repo,
};
use crate::{auth::AuthUser, error::ApiError, state::AppState};

/// Hard cap on request bodies; the per-upload config ceiling is enforced
/// separately against the decoded field.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

const MAX_PAGE_SIZE: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/faces/detect", post(detect))
        .route("/faces/upload", post(upload))
        .route("/faces/history", get(history))
        .route("/faces/stats", get(stats))
        .route("/faces/proxy-image", get(proxy_image))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// POST /api/faces/detect — run the pipeline on a remote image URL:
/// acquire, normalize, detect, persist, respond.
#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn detect(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<DetectRequest>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let raw_url = payload.image_url.trim();
    if raw_url.is_empty() {
        return Err(ApiError::Validation("Image URL is required".into()));
    }
    let url = acquire::parse_image_url(raw_url)?;

    let started = Instant::now();
    let raw = acquire::fetch_remote_image(&state.http, url).await?;
    let normalized = normalize::normalize(&raw)?;
    let detection = state.detector.detect(&normalized).await;
    let processing_time = started.elapsed().as_millis() as i64;

    let image_id = repo::record_detection(
        &state.db,
        repo::NewDetection {
            user_id: user.id,
            source_url: Some(raw_url),
            file_path: None,
            file_name: "uploaded-image.jpg",
            file_size: normalized.bytes.len() as i64,
            mime_type: "image/jpeg",
            face_count: detection.face_count,
            faces: &detection.faces,
            processing_time_ms: processing_time,
        },
    )
    .await?;

    info!(image_id, face_count = detection.face_count, processing_time, "detection recorded");
    Ok(Json(DetectionResponse {
        success: true,
        face_count: detection.face_count,
        faces: detection.faces,
        processing_time,
        image_id,
        file_name: None,
    }))
}

/// POST /api/faces/upload — same pipeline fed by a multipart `image` field.
/// The raw upload is written to disk before normalization so the original
/// survives downstream failures.
#[instrument(skip(state, user, multipart), fields(user_id = user.id))]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<DetectionResponse>, ApiError> {
    let mut uploaded: Option<(String, String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body".into()))?
    {
        if field.name() == Some("image") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let mime = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Acquisition("Failed to read uploaded file".into()))?;
            uploaded = Some((file_name, mime, data));
            break;
        }
    }

    let (file_name, mime, data) =
        uploaded.ok_or_else(|| ApiError::Validation("No image file uploaded".into()))?;

    acquire::validate_upload(&file_name, &mime)?;
    if data.len() > state.config.max_upload_bytes {
        return Err(ApiError::Acquisition("File too large".into()));
    }

    let started = Instant::now();
    let stored_path = acquire::store_upload(&state.config.upload_dir, &file_name, &data).await?;
    let normalized = normalize::normalize(&data)?;
    let detection = state.detector.detect(&normalized).await;
    let processing_time = started.elapsed().as_millis() as i64;

    let image_id = repo::record_detection(
        &state.db,
        repo::NewDetection {
            user_id: user.id,
            source_url: None,
            file_path: Some(&stored_path),
            file_name: &file_name,
            file_size: data.len() as i64,
            mime_type: &mime,
            face_count: detection.face_count,
            faces: &detection.faces,
            processing_time_ms: processing_time,
        },
    )
    .await?;

    info!(image_id, face_count = detection.face_count, file = %file_name, "upload detection recorded");
    Ok(Json(DetectionResponse {
        success: true,
        face_count: detection.face_count,
        faces: detection.faces,
        processing_time,
        image_id,
        file_name: Some(file_name),
    }))
}

/// GET /api/faces/history — the caller's detections, newest first.
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let (rows, total_count) = repo::history(&state.db, user.id, page, limit).await?;

    Ok(Json(HistoryResponse {
        detections: rows.into_iter().map(HistoryItem::from).collect(),
        pagination: Pagination::new(page, limit, total_count),
    }))
}

/// GET /api/faces/stats — aggregate counters for the caller.
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = repo::stats(&state.db, user.id).await?;
    Ok(Json(stats.into()))
}

/// GET /api/faces/proxy-image — public pass-through for external images so
/// the browser client can draw them without CORS trouble.
#[instrument(skip(state))]
pub async fn proxy_image(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let raw_url = query.url.as_deref().unwrap_or("").trim().to_string();
    if raw_url.is_empty() {
        return Err(ApiError::Validation("Image URL is required".into()));
    }
    let url = acquire::parse_image_url(&raw_url)?;

    let proxy_failed = |e: reqwest::Error| {
        error!(error = %e, url = %raw_url, "image proxy fetch failed");
        ApiError::Internal(anyhow::anyhow!("proxy fetch failed"))
    };

    let response = state
        .http
        .get(url)
        .send()
        .await
        .map_err(proxy_failed)?
        .error_for_status()
        .map_err(proxy_failed)?;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    let body = response.bytes().await.map_err(proxy_failed)?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        body,
    ))
}
