//! Identity helpers: login identifier classification and password hashing.

use argon2::{
    Argon2,
    password_hash::{Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;

use crate::error::ApiError;

/// IdentifierKind
///
/// Which unique key a login identifier refers to. Classification looks only at the
/// shape of the string; lookup and credential checks happen separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
    Username,
}

impl IdentifierKind {
    /// Anything with an `@` is an email, a non-empty run of ASCII digits is a phone
    /// number, everything else is a username.
    pub fn classify(identifier: &str) -> Self {
        if identifier.contains('@') {
            IdentifierKind::Email
        } else if !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit()) {
            IdentifierKind::Phone
        } else {
            IdentifierKind::Username
        }
    }

    /// Column holding this kind of identifier.
    pub fn column(self) -> &'static str {
        match self {
            IdentifierKind::Email => "email",
            IdentifierKind::Phone => "phone",
            IdentifierKind::Username => "username",
        }
    }
}

/// Lower-cases the domain part of an email address, leaving the local part alone.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Argon2id hash in PHC string format. Runs on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, ApiError> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?
}

/// Checks `password` against a stored PHC hash. A malformed hash is an error, a
/// mismatch is `Ok(false)`.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ApiError::Internal(format!("stored hash is malformed: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(ApiError::Internal(format!("password verification failed: {}", e))),
        }
    })
    .await
    .map_err(|e| ApiError::Internal(format!("verification task failed: {}", e)))?
}
