use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireIdentity;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::users;

pub async fn me(
    RequireIdentity(identity): RequireIdentity,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user = users::me(state.store.as_ref(), Some(&identity))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let profile = users::profile(state.store.as_ref(), &id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}
