mod files;
mod global;
mod profile;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Blob uploads
        .route("/uploads", post(files::generate_upload_url))
        // Profiles
        .route("/me", get(profile::me))
        .route("/users/{id}/profile", get(profile::get_profile))
        // Org files
        .route(
            "/orgs/{org_id}/files",
            get(files::list_files).post(files::create_file),
        )
        .route("/orgs/{org_id}/favorites", get(files::list_favorites))
        // Single file
        .route("/files/{id}", delete(files::delete_file))
        .route("/files/{id}/trash", post(files::trash_file))
        .route("/files/{id}/restore", post(files::restore_file))
        .route("/files/{id}/favorite", post(files::toggle_favorite))
        .route("/files/{id}/url", get(files::get_file_url))
        // Global files
        .route(
            "/global",
            get(global::list_global).post(global::create_global),
        )
        .route("/global/{key}", get(global::get_global))
}
