//! User registration and credential verification.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use super::error::JournalError;
use crate::ports::store_port::StorePort;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Create a user with an argon2id-hashed credential.
pub fn register(
    store: &dyn StorePort,
    username: &str,
    email: Option<&str>,
    password: &str,
) -> Result<i64, JournalError> {
    let username = username.trim();
    if username.len() < MIN_USERNAME_LEN {
        return Err(JournalError::validation(
            "user",
            "username",
            format!("must be at least {MIN_USERNAME_LEN} characters"),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(JournalError::validation(
            "user",
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if store.user_by_name(username)?.is_some() {
        return Err(JournalError::validation(
            "user",
            "username",
            format!("'{username}' already exists"),
        ));
    }

    let user = User {
        id: 0,
        username: username.to_string(),
        email: email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
        password_hash: hash_password(password)?,
        created_at: Utc::now(),
    };
    store.insert_user(&user)
}

pub fn hash_password(password: &str) -> Result<String, JournalError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(JournalError::storage)
}

pub fn verify_password(user: &User, password: &str) -> bool {
    match PasswordHash::new(&user.password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
