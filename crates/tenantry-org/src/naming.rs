//! Naming and normalization helpers
//!
//! Slugs, usernames, email addresses and domains all pass through these
//! functions before they are compared or stored, so the uniqueness checks in
//! the service layer and the unique constraints in the store agree on a
//! single canonical form.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("domain pattern is valid")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("email pattern is valid")
});

/// Longest domain accepted (RFC 1035 presentation limit).
pub const MAX_DOMAIN_LEN: usize = 253;

/// Longest username produced by [`username_base`].
pub const MAX_USERNAME_LEN: usize = 50;

/// Shortest username produced by [`username_base`].
pub const MIN_USERNAME_LEN: usize = 2;

/// Derive a URL-friendly slug from a display name.
///
/// Lower-cases the name, strips everything that is not alphanumeric, a hyphen
/// or whitespace, and collapses whitespace runs into single hyphens. Falls
/// back to `fallback` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use tenantry_org::naming::slugify;
///
/// assert_eq!(slugify("Acme Risk  Team!", "org"), "acme-risk-team");
/// assert_eq!(slugify("???", "org"), "org");
/// ```
pub fn slugify(name: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.trim().to_lowercase().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = !slug.is_empty();
        } else if ch.is_ascii_alphanumeric() {
            if pending_hyphen {
                slug.push('-');
                pending_hyphen = false;
            }
            slug.push(ch);
        }
    }

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Append a random 4-digit numeric suffix to a slug.
pub fn slug_with_random_suffix(base: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("{base}-{suffix}")
}

/// Normalize an email address by trimming whitespace and lowercasing.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check that an already-normalized email address is well formed.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Normalize a domain name (trim, lowercase, drop a trailing dot).
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}

/// Check a normalized domain against a conservative hostname pattern.
///
/// Only LDH labels are accepted, at least two labels are required and the
/// top-level label must be alphabetic.
///
/// # Examples
///
/// ```
/// use tenantry_org::naming::is_valid_domain;
///
/// assert!(is_valid_domain("risk.acme.com"));
/// assert!(!is_valid_domain("localhost"));
/// assert!(!is_valid_domain("-bad.example.com"));
/// ```
pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= MAX_DOMAIN_LEN && DOMAIN_REGEX.is_match(domain)
}

/// Derive a username candidate from an email address.
///
/// Uses the local part, keeps only `[A-Za-z0-9_-]`, truncates to
/// [`MAX_USERNAME_LEN`] and pads with `0` up to [`MIN_USERNAME_LEN`].
///
/// # Examples
///
/// ```
/// use tenantry_org::naming::username_base;
///
/// assert_eq!(username_base("jane.doe+risk@acme.com"), "janedoerisk");
/// assert_eq!(username_base("x@acme.com"), "x0");
/// ```
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_USERNAME_LEN)
        .collect();

    while base.len() < MIN_USERNAME_LEN {
        base.push('0');
    }
    base
}

/// Username candidate for the given collision attempt (0 = bare base).
///
/// The base is shortened so that base plus suffix stays within
/// [`MAX_USERNAME_LEN`].
pub fn username_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return base.chars().take(MAX_USERNAME_LEN).collect();
    }
    let suffix = attempt.to_string();
    let keep = MAX_USERNAME_LEN.saturating_sub(suffix.len());
    let mut candidate: String = base.chars().take(keep).collect();
    candidate.push_str(&suffix);
    candidate
}

/// Check a caller-supplied username.
pub fn is_valid_username(username: &str) -> bool {
    (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
