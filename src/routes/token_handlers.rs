use axum::{Extension, Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{Identity, TokenPair},
    error::AppResult,
    state::AppState,
};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Request body for revoking an arbitrary token
#[derive(ToSchema, Serialize, Deserialize)]
pub struct RevokeRequest {
    /// The encoded token to revoke. Its signature must verify, expiry is ignored.
    pub token: String,
}

/// Describe the caller's credential
#[debug_handler]
#[utoipa::path(
    get,
    tag = "auth",
    path = "/auth/whoami",
    responses(
        (status = OK, description = "Identity carried by the access token", body = Identity),
        (status = UNAUTHORIZED, description = "Missing, invalid, expired or revoked token"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn whoami(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}

/// Exchange a refresh token for a new, non-fresh access token
#[debug_handler(state = AppState)]
#[utoipa::path(
    post,
    tag = "auth",
    path = "/auth/refresh",
    responses(
        (status = OK, description = "New access token", body = TokenPair),
        (status = UNAUTHORIZED, description = "Missing, invalid, expired or revoked refresh token"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<TokenPair>> {
    Ok(Json(state.authority.refresh(&identity)?))
}

/// Revoke the access token used for this request
#[debug_handler(state = AppState)]
#[utoipa::path(
    post,
    tag = "auth",
    path = "/auth/logout",
    responses(
        (status = OK, description = "Access token revoked", body = MessageResponse),
        (status = UNAUTHORIZED, description = "Missing, invalid, expired or revoked token"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<MessageResponse>> {
    state.authority.revoke(&identity).await?;
    Ok(Json(MessageResponse {
        message: "Successfully logged out.".to_string(),
    }))
}

/// Revoke the refresh token used for this request
#[debug_handler(state = AppState)]
#[utoipa::path(
    post,
    tag = "auth",
    path = "/auth/logout/refresh",
    responses(
        (status = OK, description = "Refresh token revoked", body = MessageResponse),
        (status = UNAUTHORIZED, description = "Missing, invalid, expired or revoked refresh token"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_refresh(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<MessageResponse>> {
    state.authority.revoke(&identity).await?;
    Ok(Json(MessageResponse {
        message: "Refresh token revoked.".to_string(),
    }))
}

/// Revoke another token. Requires a fresh access token.
#[debug_handler(state = AppState)]
#[utoipa::path(
    post,
    tag = "auth",
    path = "/auth/revoke",
    request_body = RevokeRequest,
    responses(
        (status = OK, description = "Token revoked", body = Identity),
        (status = BAD_REQUEST, description = "Token in the body does not verify"),
        (status = UNAUTHORIZED, description = "Caller token rejected or not fresh"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn revoke(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    Json(request): Json<RevokeRequest>,
) -> AppResult<Json<Identity>> {
    let revoked = state.authority.revoke_token(&request.token).await?;
    tracing::info!(by = %caller.subject, jti = %revoked.jti, "token revoked on request");
    Ok(Json(revoked))
}
