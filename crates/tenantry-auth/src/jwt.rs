//! JWT token generation and validation
//!
//! This module provides access token operations using the jsonwebtoken
//! crate. Tokens are signed with an HMAC secret from [`TenantryConfig`].

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tenantry_org::User;

use crate::claims::AccessClaims;
use crate::config::TenantryConfig;
use crate::error::{TenancyError, TenancyResult};

/// Supported JWT algorithms.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        }
    }
}

/// JWT service for access token operations.
pub struct JwtService {
    algorithm: JwtAlgorithm,
    issuer: String,
    access_token_duration: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("access_token_duration", &self.access_token_duration)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtService {
    /// Create a JWT service from the tenantry configuration.
    ///
    /// # Errors
    ///
    /// `Configuration` if no signing secret is configured.
    pub fn new(config: &TenantryConfig) -> TenancyResult<Self> {
        let secret = config.jwt_secret.as_ref().ok_or_else(|| {
            TenancyError::Configuration("Secret required for HMAC".to_string())
        })?;

        Ok(Self {
            algorithm: JwtAlgorithm::HS256,
            issuer: config.jwt_issuer.clone(),
            access_token_duration: config.access_token_duration(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Create with a simple secret (HS256) and default settings.
    pub fn with_secret(secret: impl Into<String>) -> TenancyResult<Self> {
        Self::new(&TenantryConfig::default().with_jwt_secret(secret))
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> TenancyResult<AccessToken> {
        let claims = AccessClaims::for_user(user, &self.issuer, self.access_token_duration);
        let token = self.encode_claims(&claims)?;
        Ok(AccessToken::new(token, self.access_token_duration.num_seconds()))
    }

    /// Encode existing claims.
    pub fn encode_claims(&self, claims: &AccessClaims) -> TenancyResult<String> {
        let header = Header::new(self.algorithm.into());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| TenancyError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a token.
    ///
    /// Every failure is `Unauthenticated`.
    pub fn validate_token(&self, token: &str) -> TenancyResult<AccessClaims> {
        let mut validation = Validation::new(self.algorithm.into());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired",
                    jsonwebtoken::errors::ErrorKind::InvalidToken => "Malformed token",
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => "Invalid signature",
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => "Invalid issuer",
                    _ => "Invalid token",
                };
                TenancyError::Unauthenticated(reason.to_string())
            })
    }

    /// Access token lifetime.
    pub fn access_token_duration(&self) -> Duration {
        self.access_token_duration
    }
}

/// An issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    /// Access token
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Expiration in seconds
    pub expires_in: i64,
}

impl AccessToken {
    /// Create a new bearer token.
    pub fn new(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
