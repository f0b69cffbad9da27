use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of credential carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Unique token identifier, used as the revocation key
    pub jti: String,
    /// Subject (account identifier)
    pub sub: String,
    /// Issued at (as Unix timestamp)
    pub iat: i64,
    /// Expiration time (as Unix timestamp)
    pub exp: i64,
    /// True only for access tokens minted by a primary login
    pub fresh: bool,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

impl Claims {
    /// Create new claims stamped at `now` that expire `expires_in_secs` later
    pub fn new(
        subject: String,
        token_type: TokenType,
        fresh: bool,
        now: i64,
        expires_in_secs: u64,
    ) -> Self {
        let lifetime = i64::try_from(expires_in_secs).unwrap_or(i64::MAX);
        Self {
            jti: Uuid::new_v4().to_string(),
            sub: subject,
            iat: now,
            exp: now.saturating_add(lifetime),
            fresh,
            token_type,
        }
    }

    /// A credential is expired once `now` reaches its expiry.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
