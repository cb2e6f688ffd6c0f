use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Utc;
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{DownloadParams, StorageIdResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::FileType;

/// Accepts the bytes for a previously issued upload ticket.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(ticket): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state
        .blobs
        .redeem_ticket(&ticket)
        .map_err(|_| ApiError::not_found("Upload URL is invalid or expired"))?;

    let storage_id = state.blobs.put(&body).await.map_err(|e| {
        warn!("Blob write failed: {e}");
        ApiError::internal("Storage error")
    })?;

    let file_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(FileType::from_mime);

    tracing::debug!(%storage_id, size = body.len(), "Blob uploaded");

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(StorageIdResponse {
            storage_id,
            file_type,
        })),
    ))
}

/// Streams a blob for a signed, unexpired download URL.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(blob_ref): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Response {
    if !state
        .blobs
        .verify_download(&blob_ref, params.expires, &params.sig, Utc::now())
    {
        return ApiError {
            status: StatusCode::FORBIDDEN,
            message: "Invalid or expired download URL".into(),
        }
        .into_response();
    }

    let (reader, size) = match state.blobs.open(&blob_ref).await {
        Ok(result) => result,
        Err(Error::NotFound) => return ApiError::not_found("Blob not found").into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
