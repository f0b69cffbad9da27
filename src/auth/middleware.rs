use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::outcome::{Outcome, Requirement};
use crate::{error::AppError, state::AppState};

/// Extract the bearer credential from the Authorization header.
///
/// A missing header, a header that is not visible ASCII or a non-Bearer
/// scheme means no credential was presented. `Bearer` followed by garbage is
/// returned as-is so verification rejects it.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.trim().splitn(2, ' ');
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    Some(parts.next().unwrap_or_default().trim().to_owned())
}

async fn authorize(
    state: &AppState,
    mut request: Request,
    next: Next,
    requirement: Requirement,
) -> Response {
    let token = bearer_token(request.headers());
    match state
        .authority
        .authenticate(token.as_deref(), requirement)
        .await
    {
        Ok(Outcome::Authorized(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(Outcome::Unauthorized(rejection)) => rejection.into_response(),
        // Fail closed: the handler never runs if revocation status is unknown.
        Err(err) => AppError::from(err).into_response(),
    }
}

/// Any valid access token.
pub async fn require_access(State(state): State<AppState>, request: Request, next: Next) -> Response {
    authorize(&state, request, next, Requirement::ACCESS).await
}

/// An access token issued directly by a primary login.
pub async fn require_fresh_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    authorize(&state, request, next, Requirement::FRESH_ACCESS).await
}

/// A valid refresh token.
pub async fn require_refresh(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    authorize(&state, request, next, Requirement::REFRESH).await
}
