//! Token authority: issues, classifies and revokes bearer credentials.
//!
//! Every presented credential is classified by [`TokenAuthority::authenticate`]
//! into exactly one [`Outcome`]. The checks run in a fixed order and the first
//! failing check decides the rejection:
//!
//! 1. no credential presented ([`Rejection::Absent`])
//! 2. bad signature or malformed structure ([`Rejection::Invalid`])
//! 3. `now >= exp` ([`Rejection::Expired`])
//! 4. access/refresh type mismatch ([`Rejection::Invalid`])
//! 5. `jti` found in the revocation store ([`Rejection::Revoked`])
//! 6. freshness demanded but not present ([`Rejection::NotFresh`])
//!
//! An expired credential is therefore never reported as revoked. A failing
//! revocation store surfaces as `Err`, and callers must reject the request.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use utoipa::ToSchema;

use super::{
    blocklist::{RevocationError, RevocationStore},
    claims::{Claims, TokenType},
    outcome::{Identity, Outcome, Rejection, Requirement},
};
use crate::config::JwtConfig;

const ALGORITHM: Algorithm = Algorithm::HS256;
const BEARER: &str = "Bearer";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token is malformed or its signature does not verify")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Revocation(#[from] RevocationError),
}

/// A signed credential together with the claims it carries.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub claims: Claims,
}

/// Tokens handed to a client after a primary login or a refresh.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime: u64,
    refresh_lifetime: u64,
    store: Arc<dyn RevocationStore>,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &ALGORITHM)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .finish_non_exhaustive()
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

impl TokenAuthority {
    pub fn new(config: &JwtConfig, store: Arc<dyn RevocationStore>) -> Self {
        let secret = config.secret_key.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_lifetime: config.access_token_expires_secs,
            refresh_lifetime: config.refresh_token_expires_secs,
            store,
        }
    }

    /// Issue an access token for `subject`.
    pub fn issue(&self, subject: &str, fresh: bool) -> Result<Credential, TokenError> {
        self.issue_at(subject, TokenType::Access, fresh, now())
    }

    /// Issue a refresh token for `subject`. Refresh tokens are never fresh.
    pub fn issue_refresh(&self, subject: &str) -> Result<Credential, TokenError> {
        self.issue_at(subject, TokenType::Refresh, false, now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        token_type: TokenType,
        fresh: bool,
        now: i64,
    ) -> Result<Credential, TokenError> {
        let lifetime = match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        };
        let claims = Claims::new(subject.to_owned(), token_type, fresh, now, lifetime);
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;
        Ok(Credential { token, claims })
    }

    /// Fresh access token plus refresh token, as returned by a primary login.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        let access = self.issue(subject, true)?;
        let refresh = self.issue_refresh(subject)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: Some(refresh.token),
            token_type: BEARER.to_string(),
            expires_in: self.access_lifetime,
        })
    }

    /// Non-fresh access token for the holder of a validated refresh token.
    pub fn refresh(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        let access = self.issue(&identity.subject, false)?;
        Ok(TokenPair {
            access_token: access.token,
            refresh_token: None,
            token_type: BEARER.to_string(),
            expires_in: self.access_lifetime,
        })
    }

    pub async fn authenticate(
        &self,
        raw_token: Option<&str>,
        requirement: Requirement,
    ) -> Result<Outcome, RevocationError> {
        self.authenticate_at(raw_token, requirement, now()).await
    }

    pub async fn authenticate_at(
        &self,
        raw_token: Option<&str>,
        requirement: Requirement,
        now: i64,
    ) -> Result<Outcome, RevocationError> {
        let Some(token) = raw_token else {
            return Ok(reject(Rejection::Absent));
        };

        let claims = match self.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "token failed verification");
                return Ok(reject(Rejection::Invalid));
            }
        };

        if claims.is_expired_at(now) {
            return Ok(reject(Rejection::Expired));
        }

        if claims.token_type != requirement.token_type {
            debug!(
                jti = %claims.jti,
                expected = ?requirement.token_type,
                actual = ?claims.token_type,
                "wrong token type"
            );
            return Ok(reject(Rejection::Invalid));
        }

        let revoked = self
            .store
            .contains(&claims.jti)
            .await
            .inspect_err(|err| error!(jti = %claims.jti, error = %err, "revocation lookup failed"))?;
        if revoked {
            return Ok(reject(Rejection::Revoked));
        }

        if requirement.fresh && !claims.fresh {
            return Ok(reject(Rejection::NotFresh));
        }

        Ok(Outcome::Authorized(claims.into()))
    }

    /// Record the credential as revoked. Revoking twice is harmless.
    pub async fn revoke(&self, identity: &Identity) -> Result<(), RevocationError> {
        self.store.insert(&identity.jti).await?;
        info!(jti = %identity.jti, subject = %identity.subject, "token revoked");
        Ok(())
    }

    /// Revoke a raw token after checking its signature. Expiry is not
    /// checked, revoking an expired token is accepted.
    pub async fn revoke_token(&self, raw_token: &str) -> Result<Identity, TokenError> {
        let identity: Identity = self.verify(raw_token).map_err(TokenError::Invalid)?.into();
        self.revoke(&identity).await?;
        Ok(identity)
    }

    /// Signature and structure check only. Expiry is judged by the caller so
    /// that `exp == now` counts as expired.
    fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

fn reject(rejection: Rejection) -> Outcome {
    debug!(error = rejection.error_tag(), message = rejection.message(), "token rejected");
    Outcome::Unauthorized(rejection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::blocklist::InMemoryBlocklist;
    use async_trait::async_trait;

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    fn authority_with(config: JwtConfig) -> (TokenAuthority, Arc<InMemoryBlocklist>) {
        let store = Arc::new(InMemoryBlocklist::new());
        (TokenAuthority::new(&config, store.clone()), store)
    }

    fn authority() -> TokenAuthority {
        authority_with(JwtConfig::new(SECRET)).0
    }

    fn authority_with_lifetime(secs: u64) -> TokenAuthority {
        let mut config = JwtConfig::new(SECRET);
        config.access_token_expires_secs = secs;
        authority_with(config).0
    }

    fn unauthorized(outcome: Outcome) -> Rejection {
        outcome.rejection().expect("expected a rejection")
    }

    #[tokio::test]
    async fn test_fresh_token_is_authorized_right_after_issue() {
        let authority = authority();
        let credential = authority.issue("alice", true).unwrap();

        let outcome = authority
            .authenticate(Some(&credential.token), Requirement::FRESH_ACCESS)
            .await
            .unwrap();

        let identity = outcome.into_result().unwrap();
        assert_eq!(identity.subject, "alice");
        assert_eq!(identity.jti, credential.claims.jti);
        assert!(identity.fresh);
        assert_eq!(identity.token_type, TokenType::Access);
    }

    #[tokio::test]
    async fn test_absent_token() {
        let outcome = authority()
            .authenticate(None, Requirement::ACCESS)
            .await
            .unwrap();

        assert_eq!(unauthorized(outcome), Rejection::Absent);
    }

    #[tokio::test]
    async fn test_malformed_token_is_invalid() {
        let authority = authority();
        for raw in ["", "not-a-jwt", "a.b.c"] {
            let outcome = authority
                .authenticate(Some(raw), Requirement::ACCESS)
                .await
                .unwrap();
            assert_eq!(unauthorized(outcome), Rejection::Invalid, "input {raw:?}");
        }
    }

    #[tokio::test]
    async fn test_foreign_signature_is_invalid() {
        let foreign = authority_with(JwtConfig::new("some-other-secret")).0;
        let credential = foreign.issue("mallory", true).unwrap();

        let outcome = authority()
            .authenticate(Some(&credential.token), Requirement::ACCESS)
            .await
            .unwrap();

        assert_eq!(unauthorized(outcome), Rejection::Invalid);
    }

    #[tokio::test]
    async fn test_zero_lifetime_token_is_expired() {
        let authority = authority_with_lifetime(0);
        let credential = authority.issue("alice", true).unwrap();

        let outcome = authority
            .authenticate(Some(&credential.token), Requirement::ACCESS)
            .await
            .unwrap();

        let rejection = unauthorized(outcome);
        assert_eq!(rejection, Rejection::Expired);
        assert_eq!(rejection.error_tag(), "invalid_token");
        assert_eq!(rejection.message(), "Invalid Token.");
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let authority = authority_with_lifetime(60);
        let credential = authority
            .issue_at("alice", TokenType::Access, true, 1_000)
            .unwrap();
        let token = Some(credential.token.as_str());

        let before = authority
            .authenticate_at(token, Requirement::ACCESS, 1_059)
            .await
            .unwrap();
        let at = authority
            .authenticate_at(token, Requirement::ACCESS, 1_060)
            .await
            .unwrap();

        assert!(before.is_authorized());
        assert_eq!(unauthorized(at), Rejection::Expired);
    }

    #[tokio::test]
    async fn test_revoked_token() {
        let authority = authority();
        let credential = authority.issue("alice", true).unwrap();
        let identity = authority
            .authenticate(Some(&credential.token), Requirement::ACCESS)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        authority.revoke(&identity).await.unwrap();

        let outcome = authority
            .authenticate(Some(&credential.token), Requirement::ACCESS)
            .await
            .unwrap();
        assert_eq!(unauthorized(outcome), Rejection::Revoked);
    }

    #[tokio::test]
    async fn test_revoke_twice_matches_revoke_once() {
        let (authority, store) = authority_with(JwtConfig::new(SECRET));
        let credential = authority.issue("alice", false).unwrap();
        let identity = Identity::from(credential.claims.clone());

        authority.revoke(&identity).await.unwrap();
        authority.revoke(&identity).await.unwrap();

        assert_eq!(store.len().await, 1);
        let outcome = authority
            .authenticate(Some(&credential.token), Requirement::ACCESS)
            .await
            .unwrap();
        assert_eq!(unauthorized(outcome), Rejection::Revoked);
    }

    #[tokio::test]
    async fn test_expired_and_revoked_reports_expired() {
        let authority = authority_with_lifetime(60);
        let credential = authority
            .issue_at("alice", TokenType::Access, true, 1_000)
            .unwrap();
        authority
            .revoke(&Identity::from(credential.claims.clone()))
            .await
            .unwrap();
        let token = Some(credential.token.as_str());

        let live = authority
            .authenticate_at(token, Requirement::ACCESS, 1_010)
            .await
            .unwrap();
        let dead = authority
            .authenticate_at(token, Requirement::ACCESS, 2_000)
            .await
            .unwrap();

        assert_eq!(unauthorized(live), Rejection::Revoked);
        assert_eq!(unauthorized(dead), Rejection::Expired);
    }

    #[tokio::test]
    async fn test_freshness_gate_only_when_required() {
        let authority = authority_with_lifetime(3600);
        let credential = authority.issue("alice", false).unwrap();
        let token = Some(credential.token.as_str());

        let fresh_required = authority
            .authenticate(token, Requirement::FRESH_ACCESS)
            .await
            .unwrap();
        let not_required = authority
            .authenticate(token, Requirement::ACCESS)
            .await
            .unwrap();

        assert_eq!(unauthorized(fresh_required), Rejection::NotFresh);
        let identity = not_required.into_result().unwrap();
        assert!(!identity.fresh);
    }

    #[tokio::test]
    async fn test_revoked_wins_over_not_fresh() {
        let authority = authority();
        let credential = authority.issue("alice", false).unwrap();
        authority
            .revoke(&Identity::from(credential.claims.clone()))
            .await
            .unwrap();

        let outcome = authority
            .authenticate(Some(&credential.token), Requirement::FRESH_ACCESS)
            .await
            .unwrap();

        assert_eq!(unauthorized(outcome), Rejection::Revoked);
    }

    #[tokio::test]
    async fn test_token_type_must_match() {
        let authority = authority();
        let access = authority.issue("alice", true).unwrap();
        let refresh = authority.issue_refresh("alice").unwrap();

        let refresh_as_access = authority
            .authenticate(Some(&refresh.token), Requirement::ACCESS)
            .await
            .unwrap();
        let access_as_refresh = authority
            .authenticate(Some(&access.token), Requirement::REFRESH)
            .await
            .unwrap();
        let refresh_as_refresh = authority
            .authenticate(Some(&refresh.token), Requirement::REFRESH)
            .await
            .unwrap();

        assert_eq!(unauthorized(refresh_as_access), Rejection::Invalid);
        assert_eq!(unauthorized(access_as_refresh), Rejection::Invalid);
        assert!(refresh_as_refresh.is_authorized());
    }

    #[tokio::test]
    async fn test_refresh_issues_non_fresh_access_token() {
        let authority = authority();
        let pair = authority.issue_pair("alice").unwrap();
        let refresh_token = pair.refresh_token.unwrap();
        let identity = authority
            .authenticate(Some(&refresh_token), Requirement::REFRESH)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let refreshed = authority.refresh(&identity).unwrap();

        assert!(refreshed.refresh_token.is_none());
        let outcome = authority
            .authenticate(Some(&refreshed.access_token), Requirement::FRESH_ACCESS)
            .await
            .unwrap();
        assert_eq!(unauthorized(outcome), Rejection::NotFresh);
        let outcome = authority
            .authenticate(Some(&pair.access_token), Requirement::FRESH_ACCESS)
            .await
            .unwrap();
        assert!(outcome.is_authorized());
    }

    #[tokio::test]
    async fn test_revoke_token_checks_signature() {
        let authority = authority();
        let foreign = authority_with(JwtConfig::new("some-other-secret")).0;
        let credential = foreign.issue("mallory", true).unwrap();

        let result = authority.revoke_token(&credential.token).await;

        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_revoke_token_accepts_expired_tokens() {
        let authority = authority_with_lifetime(0);
        let credential = authority.issue("alice", true).unwrap();

        let identity = authority.revoke_token(&credential.token).await.unwrap();

        assert_eq!(identity.jti, credential.claims.jti);
    }

    struct BrokenStore;

    #[async_trait]
    impl RevocationStore for BrokenStore {
        async fn contains(&self, _jti: &str) -> Result<bool, RevocationError> {
            Err(RevocationError::Unavailable("connection refused".to_string()))
        }

        async fn insert(&self, _jti: &str) -> Result<(), RevocationError> {
            Err(RevocationError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_not_treated_as_not_revoked() {
        let authority = TokenAuthority::new(&JwtConfig::new(SECRET), Arc::new(BrokenStore));
        let credential = authority.issue("alice", true).unwrap();

        let result = authority
            .authenticate(Some(&credential.token), Requirement::ACCESS)
            .await;

        assert!(matches!(result, Err(RevocationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_reached_for_earlier_rejections() {
        let authority = TokenAuthority::new(&JwtConfig::new(SECRET), Arc::new(BrokenStore));

        let outcome = authority
            .authenticate(Some("garbage"), Requirement::ACCESS)
            .await
            .unwrap();

        assert_eq!(unauthorized(outcome), Rejection::Invalid);
    }
}
