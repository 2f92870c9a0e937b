//! Credential hashing and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings behind the
//! [`CredentialHasher`] trait. Session tokens are opaque random strings; only
//! their BLAKE3 hash is persisted.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{Error, Result};
use crate::model::NewUser;

/// Hashes and verifies user passwords.
pub trait CredentialHasher: Send + Sync + std::fmt::Debug {
    /// Hash `password` into a self-describing string that carries its salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the hashing backend fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against a string produced by [`CredentialHasher::hash`].
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Default hasher: Argon2id with a random salt per password.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a hasher with custom cost parameters.
    ///
    /// Verification always uses the parameters recorded in the stored hash,
    /// so changing them does not invalidate existing passwords.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        PasswordHash::new(stored).is_ok_and(|parsed| {
            self.argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// BLAKE3 hash of the bearer token.
    pub token_hash: String,
    /// The authenticated user.
    pub user_id: String,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Generate a new random bearer token.
#[must_use]
pub fn new_session_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Hash a bearer token for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Extract the token from an `Authorization` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
    })
}

/// Validate a registration payload.
///
/// # Errors
///
/// Returns a validation error for a malformed email, a short password or
/// blank names.
pub fn validate_registration(new_user: &NewUser, min_password_length: usize) -> Result<()> {
    if !email_pattern().is_match(new_user.email.trim()) {
        return Err(Error::validation("email is not a valid address"));
    }
    if new_user.password.chars().count() < min_password_length {
        return Err(Error::validation(format!(
            "password must be at least {min_password_length} characters"
        )));
    }
    if new_user.first_name.trim().is_empty() || new_user.last_name.trim().is_empty() {
        return Err(Error::validation("firstName and lastName must not be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    /// Cheapest parameters Argon2 accepts.
    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::new(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap())
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let stored = hasher.hash("correct horse").unwrap();

        assert!(stored.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &stored));
        assert!(!hasher.verify("wrong horse", &stored));
    }

    #[test]
    fn test_salt_changes_hash() {
        let hasher = fast_hasher();
        let a = hasher.hash("same password").unwrap();
        let b = hasher.hash("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_uses_stored_parameters() {
        let stored = fast_hasher().hash("pw").unwrap();
        assert!(Argon2Hasher::default().verify("pw", &stored));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!fast_hasher().verify("pw", "not-a-phc-string"));
        assert!(!fast_hasher().verify("pw", ""));
    }

    #[test]
    fn test_session_tokens_are_unique() {
        let a = new_session_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, new_session_token());
        assert_ne!(hash_token(&a), a);
        assert_eq!(hash_token(&a), hash_token(&a));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            token_hash: "h".to_string(),
            user_id: "u".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        assert!(session.is_active(now));
        assert!(!session.is_active(now + chrono::Duration::hours(2)));
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration(&new_user("ada@example.com", "longenough"), 8).is_ok());
        assert!(validate_registration(&new_user("not-an-email", "longenough"), 8).is_err());
        assert!(validate_registration(&new_user("ada@example.com", "short"), 8).is_err());

        let mut blank = new_user("ada@example.com", "longenough");
        blank.last_name = " ".to_string();
        assert!(validate_registration(&blank, 8).is_err());
    }
}
