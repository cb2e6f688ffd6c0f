mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::server::AppState;

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Transport for the URLs handed out by the local blob store.
pub fn blob_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/upload/{ticket}",
            post(handlers::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/{blob_ref}", get(handlers::download))
}
