//! Tenantry configuration.
//!
//! Process-wide settings loaded once at startup and injected into the
//! services: the access-token signing secret, the password pepper and the
//! provisioning limits. Configuration is loaded from environment variables
//! with sensible defaults for local development.

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tenantry_org::DEFAULT_MAX_USERS;
use thiserror::Error;
use tracing::warn;

use crate::error::TenancyError;

/// Shortest password accepted at registration or provisioning.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Shortest accepted HMAC signing secret, in bytes.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for TenancyError {
    fn from(err: ConfigError) -> Self {
        TenancyError::Configuration(err.to_string())
    }
}

/// Settings shared by every tenantry service.
#[derive(Clone, Serialize, Deserialize)]
pub struct TenantryConfig {
    /// HS256 signing secret for access tokens.
    pub jwt_secret: Option<String>,

    /// Issuer claim stamped on access tokens.
    pub jwt_issuer: String,

    /// Secret prepended to passwords before hashing.
    pub password_pepper: Option<String>,

    /// Access token lifetime in minutes.
    pub access_token_minutes: i64,

    /// Capacity of an organization created without `max_users`.
    pub default_max_users: u32,

    /// Numeric suffixes tried for a derived username before giving up.
    pub username_attempts: u32,

    /// Inserts attempted for a derived slug before giving up.
    pub slug_attempts: u32,

    /// Shortest accepted password.
    pub min_password_length: usize,
}

impl Default for TenantryConfig {
    /// Returns default configuration suitable for local development.
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_issuer: "tenantry".to_string(),
            password_pepper: None,
            access_token_minutes: 60,
            default_max_users: DEFAULT_MAX_USERS,
            username_attempts: 100,
            slug_attempts: 5,
            min_password_length: MIN_PASSWORD_LENGTH,
        }
    }
}

impl std::fmt::Debug for TenantryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantryConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_issuer", &self.jwt_issuer)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .field("access_token_minutes", &self.access_token_minutes)
            .field("default_max_users", &self.default_max_users)
            .field("username_attempts", &self.username_attempts)
            .field("slug_attempts", &self.slug_attempts)
            .field("min_password_length", &self.min_password_length)
            .finish()
    }
}

/// Parse a numeric setting, keeping `default` when it is absent or malformed.
fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "ignoring malformed setting");
            default
        }),
        None => default,
    }
}

impl TenantryConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TENANTRY_JWT_SECRET`: Access token signing secret (required in production)
    /// - `TENANTRY_JWT_ISSUER`: Access token issuer (default: tenantry)
    /// - `TENANTRY_PASSWORD_PEPPER`: Password pepper
    /// - `TENANTRY_ACCESS_TOKEN_MINUTES`: Access token lifetime (default: 60)
    /// - `TENANTRY_DEFAULT_MAX_USERS`: Default organization capacity (default: 500)
    /// - `TENANTRY_USERNAME_ATTEMPTS`: Username suffix attempts (default: 100)
    /// - `TENANTRY_SLUG_ATTEMPTS`: Slug insert attempts (default: 5)
    /// - `TENANTRY_MIN_PASSWORD_LENGTH`: Minimum password length (default: 8)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            jwt_secret: lookup("TENANTRY_JWT_SECRET").or(default.jwt_secret),
            jwt_issuer: lookup("TENANTRY_JWT_ISSUER").unwrap_or(default.jwt_issuer),
            password_pepper: lookup("TENANTRY_PASSWORD_PEPPER").or(default.password_pepper),
            access_token_minutes: parsed(
                &lookup,
                "TENANTRY_ACCESS_TOKEN_MINUTES",
                default.access_token_minutes,
            ),
            default_max_users: parsed(
                &lookup,
                "TENANTRY_DEFAULT_MAX_USERS",
                default.default_max_users,
            ),
            username_attempts: parsed(
                &lookup,
                "TENANTRY_USERNAME_ATTEMPTS",
                default.username_attempts,
            ),
            slug_attempts: parsed(&lookup, "TENANTRY_SLUG_ATTEMPTS", default.slug_attempts),
            min_password_length: parsed(
                &lookup,
                "TENANTRY_MIN_PASSWORD_LENGTH",
                default.min_password_length,
            ),
        }
    }

    /// Set the signing secret.
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Access token lifetime.
    pub fn access_token_duration(&self) -> Duration {
        Duration::minutes(self.access_token_minutes)
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.jwt_secret {
            None => return Err(ConfigError::MissingEnvVar("TENANTRY_JWT_SECRET".to_string())),
            Some(secret) if secret.len() < MIN_JWT_SECRET_LENGTH => {
                return Err(ConfigError::invalid(
                    "TENANTRY_JWT_SECRET",
                    format!("must be at least {MIN_JWT_SECRET_LENGTH} bytes"),
                ));
            }
            Some(_) => {}
        }
        if self.access_token_minutes <= 0 {
            return Err(ConfigError::invalid(
                "TENANTRY_ACCESS_TOKEN_MINUTES",
                "must be positive",
            ));
        }
        if self.default_max_users == 0 {
            return Err(ConfigError::invalid(
                "TENANTRY_DEFAULT_MAX_USERS",
                "must be at least 1",
            ));
        }
        if self.username_attempts == 0 {
            return Err(ConfigError::invalid(
                "TENANTRY_USERNAME_ATTEMPTS",
                "must be at least 1",
            ));
        }
        if self.slug_attempts == 0 {
            return Err(ConfigError::invalid("TENANTRY_SLUG_ATTEMPTS", "must be at least 1"));
        }
        if self.min_password_length < MIN_PASSWORD_LENGTH {
            return Err(ConfigError::invalid(
                "TENANTRY_MIN_PASSWORD_LENGTH",
                format!("must be at least {MIN_PASSWORD_LENGTH}"),
            ));
        }
        Ok(())
    }
}
