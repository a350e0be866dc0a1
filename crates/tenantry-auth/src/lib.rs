//! # Tenantry Authentication
//!
//! This crate provides the authentication building blocks and the shared
//! error taxonomy for the tenantry services.
//!
//! ## Overview
//!
//! The tenantry-auth crate handles:
//! - **Errors**: `TenancyError`, the error kind every operation returns
//! - **Passwords**: the `PasswordHasher` capability and its Argon2id default
//! - **Join tokens**: CSPRNG issuance and log-safe fingerprints
//! - **JWT**: access token generation and validation
//! - **Configuration**: `TenantryConfig`, loaded once and injected
//! - **Registration**: the closed self-registration payload
//!
//! ## Usage
//!
//! ### Access tokens
//!
//! ```rust
//! use tenantry_auth::{JwtService, TenantryConfig};
//! use tenantry_org::User;
//!
//! let config = TenantryConfig::default()
//!     .with_jwt_secret("your-secret-key-of-at-least-32-bytes");
//! let service = JwtService::new(&config).unwrap();
//!
//! let user = User::new("user@example.com", "user", "digest");
//! let token = service.generate_access_token(&user).unwrap();
//!
//! let claims = service.validate_token(&token.access_token).unwrap();
//! assert_eq!(claims.user_id(), Some(user.id));
//! ```
//!
//! ### Passwords
//!
//! ```rust,no_run
//! use tenantry_auth::{Argon2PasswordHasher, PasswordHasher};
//!
//! let hasher = Argon2PasswordHasher::with_pepper(None);
//! let digest = hasher.hash("correct horse battery staple").unwrap();
//! assert!(hasher.verify("correct horse battery staple", &digest).unwrap());
//! ```
//!
//! ## Integration
//!
//! This crate integrates with:
//! - `tenantry-org`: user records in claims, naming rules in payload validation
//! - `tenantry-rbac`: authorization failures convert into `TenancyError`

pub mod claims;
pub mod config;
pub mod error;
pub mod jwt;
pub mod password;
pub mod registration;
pub mod token;

// Re-export main types
pub use claims::{AccessClaims, TokenType};
pub use config::{ConfigError, TenantryConfig, MIN_PASSWORD_LENGTH};
pub use error::{TenancyError, TenancyResult};
pub use jwt::{AccessToken, JwtAlgorithm, JwtService};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use registration::{AdminCreateUserRequest, Credentials, RegistrationRequest};
pub use token::{generate_join_token, is_well_formed_join_token, token_fingerprint};
