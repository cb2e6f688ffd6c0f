use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeIdentity, RequireIdentity};
use crate::files::{self, NewFile};
use crate::server::AppState;
use crate::server::dto::{
    CreateFileRequest, FavoriteToggleResponse, FileUrlResponse, ListFilesParams,
    UploadUrlResponse,
};
use crate::server::response::{ApiError, ApiResponse};

pub async fn generate_upload_url(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let upload_url = files::lifecycle::generate_upload_url(
        state.store.as_ref(),
        state.blobs.as_ref(),
        Some(&identity),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UploadUrlResponse { upload_url })))
}

pub async fn list_files(
    MaybeIdentity(identity): MaybeIdentity,
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
    Query(params): Query<ListFilesParams>,
) -> impl IntoResponse {
    let filter = params.into_filter()?;
    let listed = files::lifecycle::list(
        state.store.as_ref(),
        state.blobs.as_ref(),
        identity.as_ref(),
        &org_id,
        &filter,
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(listed)))
}

pub async fn create_file(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
    Json(req): Json<CreateFileRequest>,
) -> impl IntoResponse {
    let file = files::lifecycle::create(
        state.store.as_ref(),
        state.blobs.as_ref(),
        Some(&identity),
        NewFile {
            name: req.name,
            file_type: req.file_type,
            org_id,
            blob_ref: req.storage_id,
        },
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(file))))
}

pub async fn list_favorites(
    MaybeIdentity(identity): MaybeIdentity,
    State(state): State<Arc<AppState>>,
    Path(org_id): Path<String>,
) -> impl IntoResponse {
    let favorites = files::favorites::list(state.store.as_ref(), identity.as_ref(), &org_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(favorites)))
}

pub async fn trash_file(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let file = files::lifecycle::move_to_trash(state.store.as_ref(), Some(&identity), &id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(file)))
}

pub async fn restore_file(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let file = files::lifecycle::restore(state.store.as_ref(), Some(&identity), &id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(file)))
}

pub async fn delete_file(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    files::lifecycle::permanently_delete(
        state.store.as_ref(),
        state.blobs.as_ref(),
        Some(&identity),
        &id,
    )?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn toggle_favorite(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let favorited = files::favorites::toggle(state.store.as_ref(), Some(&identity), &id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(FavoriteToggleResponse {
        favorited,
    })))
}

pub async fn get_file_url(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let url = files::lifecycle::file_url(
        state.store.as_ref(),
        state.blobs.as_ref(),
        Some(&identity),
        &id,
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(FileUrlResponse { url })))
}
