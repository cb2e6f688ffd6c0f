use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::RequireIdentity;
use crate::files::{NewGlobalFile, share};
use crate::server::AppState;
use crate::server::dto::{CreateGlobalFileRequest, KeyParams};
use crate::server::response::{ApiError, ApiResponse};

pub async fn create_global(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGlobalFileRequest>,
) -> impl IntoResponse {
    let created = share::create_global(
        state.store.as_ref(),
        state.blobs.as_ref(),
        Some(&identity),
        NewGlobalFile {
            name: req.name,
            file_type: req.file_type,
            blob_ref: req.storage_id,
        },
        Duration::seconds(state.config.share_ttl_secs),
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// Key lookup needs no authentication; possession of the key is the grant.
pub async fn list_global(
    State(state): State<Arc<AppState>>,
    Query(params): Query<KeyParams>,
) -> impl IntoResponse {
    let files = share::list_global(
        state.store.as_ref(),
        state.blobs.as_ref(),
        params.key.as_deref(),
        Utc::now(),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(files)))
}

pub async fn get_global(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let file = share::get_file_by_key(
        state.store.as_ref(),
        state.blobs.as_ref(),
        &key,
        Utc::now(),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(file)))
}
