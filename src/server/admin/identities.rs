use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateIdentityRequest, CreateIdentityResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::Identity;

const MAX_RETRIES: u32 = 3;

/// Mints a token that authenticates as `subject`.
pub async fn create_identity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateIdentityRequest>,
) -> impl IntoResponse {
    if req.subject.is_empty() || req.subject.contains('|') {
        return Err(ApiError::bad_request(
            "subject must be non-empty and contain no '|'",
        ));
    }

    if let Some(seconds) = req.expires_in_seconds {
        if seconds < 0 {
            return Err(ApiError::bad_request(
                "expires_in_seconds cannot be negative",
            ));
        }
    }

    let expires_at = req
        .expires_in_seconds
        .map(|s| Utc::now() + Duration::seconds(s));

    let generator = TokenGenerator::new();

    for _ in 0..MAX_RETRIES {
        let (token, raw_token) = generator
            .issue(Some((&req.subject, &req.name)), expires_at)
            .map_err(|_| ApiError::internal("Failed to generate token"))?;

        match state.store.create_token(&token) {
            Ok(()) => {
                let identity = Identity::new(&state.config.issuer, &req.subject);
                tracing::info!(subject = %req.subject, "Identity token issued");
                return Ok((
                    StatusCode::CREATED,
                    Json(ApiResponse::success(CreateIdentityResponse {
                        id: token.id,
                        token: raw_token,
                        subject: identity.subject,
                        token_identifier: identity.token_identifier,
                        expires_at,
                    })),
                ));
            }
            Err(Error::TokenLookupCollision) => continue,
            Err(_) => return Err(ApiError::internal("Failed to create token")),
        }
    }

    Err(ApiError::internal("Failed to create token after retries"))
}

pub async fn get_identity(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let token = state
        .store
        .get_token_by_id(&id)
        .api_err("Failed to get token")?
        .or_not_found("Token not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(token)))
}

/// Revokes a token. The calling admin token cannot revoke itself.
pub async fn revoke_identity(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if id == admin.0.id {
        return Err(ApiError::bad_request("Cannot delete current token"));
    }

    if !state.store.delete_token(&id).api_err("Failed to delete token")? {
        return Err(ApiError::not_found("Token not found"));
    }

    tracing::info!(token_id = %id, "Token revoked");

    Ok(StatusCode::NO_CONTENT)
}
