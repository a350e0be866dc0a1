//! Join token issuance
//!
//! A join token is a bearer secret: anyone holding it can attempt to join
//! the organization. Tokens are drawn from the operating system CSPRNG and
//! are only ever logged as a short SHA-256 fingerprint.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use tenantry_org::JOIN_TOKEN_LENGTH;

/// Generate a fresh 32-character alphanumeric join token.
pub fn generate_join_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(JOIN_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Short, non-reversible fingerprint of a token for logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Whether a presented string is shaped like a join token.
///
/// Lookups with malformed tokens can be rejected without touching the store.
pub fn is_well_formed_join_token(token: &str) -> bool {
    token.len() == JOIN_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_join_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(is_well_formed_join_token(&token));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<_> = (0..256).map(|_| generate_join_token()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let token = generate_join_token();
        let fingerprint = token_fingerprint(&token);

        assert_eq!(fingerprint.len(), 12);
        assert_eq!(fingerprint, token_fingerprint(&token));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(!is_well_formed_join_token(""));
        assert!(!is_well_formed_join_token("short"));
        assert!(!is_well_formed_join_token(&format!("{}-", "a".repeat(31))));
        assert!(!is_well_formed_join_token(&"a".repeat(33)));
    }
}
