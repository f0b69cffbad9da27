use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::claims::{Claims, TokenType};

/// What a route demands of the presented credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub token_type: TokenType,
    pub fresh: bool,
}

impl Requirement {
    /// Any unexpired, unrevoked access token.
    pub const ACCESS: Self = Self {
        token_type: TokenType::Access,
        fresh: false,
    };
    /// An access token minted by a primary login.
    pub const FRESH_ACCESS: Self = Self {
        token_type: TokenType::Access,
        fresh: true,
    };
    /// A refresh token.
    pub const REFRESH: Self = Self {
        token_type: TokenType::Refresh,
        fresh: false,
    };
}

/// The authenticated caller, as seen by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    pub subject: String,
    pub jti: String,
    pub fresh: bool,
    pub token_type: TokenType,
    /// Unix timestamp at which the credential stops being accepted
    pub expires_at: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            jti: claims.jti,
            fresh: claims.fresh,
            token_type: claims.token_type,
            expires_at: claims.exp,
        }
    }
}

/// Why a credential was turned away. Variants are listed in the order the
/// checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Absent,
    Invalid,
    Expired,
    Revoked,
    NotFresh,
}

impl Rejection {
    /// Machine readable `error` tag.
    pub fn error_tag(&self) -> &'static str {
        match self {
            Rejection::Absent => "authorization_required",
            Rejection::Invalid | Rejection::Expired => "invalid_token",
            Rejection::Revoked => "token_revoked",
            Rejection::NotFresh => "fresh_token_required",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Rejection::Absent => "Request must contain access token.",
            Rejection::Invalid => "Signature verification failed.",
            Rejection::Expired => "Invalid Token.",
            Rejection::Revoked => "Revoked token.",
            Rejection::NotFresh => "Token is not fresh.",
        }
    }

    /// Response body. Invalid and expired tokens put their text under
    /// `message`, everything else under `description`.
    pub fn body(&self) -> Value {
        match self {
            Rejection::Invalid | Rejection::Expired => json!({
                "message": self.message(),
                "error": self.error_tag(),
            }),
            Rejection::Absent | Rejection::Revoked | Rejection::NotFresh => json!({
                "description": self.message(),
                "error": self.error_tag(),
            }),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_tag(), self.message())
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self.body())).into_response()
    }
}

/// Result of classifying one presented credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Authorized(Identity),
    Unauthorized(Rejection),
}

impl Outcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Outcome::Authorized(_))
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Outcome::Authorized(_) => None,
            Outcome::Unauthorized(rejection) => Some(*rejection),
        }
    }

    pub fn into_result(self) -> Result<Identity, Rejection> {
        match self {
            Outcome::Authorized(identity) => Ok(identity),
            Outcome::Unauthorized(rejection) => Err(rejection),
        }
    }
}
