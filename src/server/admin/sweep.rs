use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireAdmin;
use crate::files::sweep::sweep;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

/// Runs a sweep immediately instead of waiting for the next tick.
pub async fn run_sweep(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let report = sweep(state.store.as_ref(), state.blobs.as_ref(), Utc::now())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(report)))
}
