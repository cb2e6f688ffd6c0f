use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{MembershipRemovedResponse, SetMembershipRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::Identity;
use crate::users;

pub async fn set_membership(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((subject, org_id)): Path<(String, String)>,
    Json(req): Json<SetMembershipRequest>,
) -> impl IntoResponse {
    let identity = Identity::new(&state.config.issuer, subject);
    let user = users::set_membership(state.store.as_ref(), &identity, &org_id, req.role)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn remove_membership(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((subject, org_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let identity = Identity::new(&state.config.issuer, subject);
    let removed = users::remove_membership(state.store.as_ref(), &identity, &org_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(MembershipRemovedResponse {
        removed,
    })))
}
