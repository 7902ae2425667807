//! JWT access token issuance and verification.
//!
//! The token carries everything an authorization decision needs: the
//! subject, the actor type, and the granted permission schemes. Request
//! authentication is stateless.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use provctl_core::models::audit::ActorType;
use provctl_core::models::permission::Permission;
use provctl_core::models::token::Token;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject, the caller's name.
    pub sub: String,
    /// `User`, `ServiceAccount` or `System`.
    pub actor_type: String,
    /// Granted permission schemes.
    #[serde(default)]
    pub perms: Vec<String>,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl AccessTokenClaims {
    fn into_token(self) -> Result<Token, AuthError> {
        let actor_type = ActorType::parse(&self.actor_type).ok_or_else(|| {
            AuthError::TokenInvalid(format!("unknown actor type: {}", self.actor_type))
        })?;
        Ok(Token::new(
            self.sub,
            actor_type,
            self.perms.into_iter().map(Permission::new).collect(),
        ))
    }
}

/// Issue a signed EdDSA (Ed25519) JWT access token for `token`.
pub fn issue_access_token(token: &Token, config: &AuthConfig) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: token.subject.clone(),
        actor_type: token.actor_type.as_str().to_string(),
        perms: token
            .permissions
            .iter()
            .map(|p| p.scheme().to_string())
            .collect(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + config.access_token_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    let header = Header::new(Algorithm::EdDSA);
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an EdDSA JWT access token.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Verify a raw bearer token (signature, expiry, issuer) and return the
/// caller identity it carries.
pub fn authenticate(raw: &str, config: &AuthConfig) -> Result<Token, AuthError> {
    decode_access_token(raw, config)?.into_token()
}
