//! Credential hashing. bcrypt is CPU-bound, so both directions run on the
//! blocking pool.

use thiserror::Error;
use validator::ValidateLength;

use tourbook_core::{DomainError, DomainResult};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("password hashing task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plain: String) -> Result<String, PasswordError> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
            .map_err(PasswordError::from)
    }

    pub async fn verify(&self, plain: String, hash: String) -> Result<bool, PasswordError> {
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
            .map_err(PasswordError::from)
    }
}

/// Rules for a password chosen by the user (signup, reset, change).
pub fn validate_new_password(password: &str, confirm: &str) -> DomainResult<()> {
    let mut problems = Vec::new();
    if !password.validate_length(Some(MIN_PASSWORD_LEN as u64), None, None) {
        problems.push(format!(
            "Password must have at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if password != confirm {
        problems.push("Passwords are not the same".to_string());
    }
    DomainError::check(problems)
}
