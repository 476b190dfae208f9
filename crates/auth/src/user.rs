//! User accounts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use tourbook_core::{DomainError, DomainResult, Entity, UniqueKey, UserId};

use crate::Role;
use crate::claims::JwtClaims;
use crate::reset::{ResetToken, reset_token_ttl};

pub const DEFAULT_PHOTO: &str = "default.jpg";

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A stored user account.
///
/// The serialized form includes the credential hash and reset state because it
/// is what the store persists. Responses must go through [`UserProfile`] or a
/// redacting projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub role: Role,
    /// bcrypt hash.
    pub password: String,
    #[serde(default)]
    pub password_changed_at: Option<DateTime<Utc>>,
    /// Bumped on every password change; tokens carry the version they were
    /// issued under.
    #[serde(default)]
    pub password_version: u32,
    #[serde(default)]
    pub password_reset_token: Option<String>,
    #[serde(default)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A new account with the `user` role.
    pub fn register(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut user = Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            photo: default_photo(),
            role: Role::User,
            password: password_hash,
            password_changed_at: None,
            password_version: 0,
            password_reset_token: None,
            password_reset_expires: None,
            deleted: false,
            created_at: now,
        };
        user.normalize();
        user.validate()?;
        Ok(user)
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// True when the password changed after `claims` were issued.
    ///
    /// The version check catches changes made within the same second as the
    /// issue; the timestamp check covers tokens minted without a version.
    pub fn changed_password_after(&self, claims: &JwtClaims) -> bool {
        claims.pwv != self.password_version
            || self
                .password_changed_at
                .is_some_and(|changed| claims.iat < changed.timestamp())
    }

    /// Replace the credential hash and invalidate outstanding reset tokens
    /// and every session token issued so far.
    pub fn set_password(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password = password_hash;
        self.password_changed_at = Some(now);
        self.password_version = self.password_version.wrapping_add(1);
        self.clear_reset_token();
    }

    /// Start a password reset; returns the plain token to email.
    pub fn issue_reset_token(&mut self, now: DateTime<Utc>) -> String {
        let token = ResetToken::generate();
        self.password_reset_token = Some(token.hash);
        self.password_reset_expires = Some(now + reset_token_ttl());
        token.plain
    }

    pub fn clear_reset_token(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }

    pub fn reset_token_matches(&self, token_hash: &str, now: DateTime<Utc>) -> bool {
        self.password_reset_token.as_deref() == Some(token_hash)
            && self.password_reset_expires.is_some_and(|expires| expires > now)
    }

    pub fn soft_delete(&mut self) {
        self.deleted = true;
        self.clear_reset_token();
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            photo: self.photo.clone(),
            role: self.role,
        }
    }
}

impl Entity for User {
    type Id = UserId;

    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "user";
    const IMMUTABLE_FIELDS: &'static [&'static str] = &[
        "createdAt",
        "password",
        "passwordChangedAt",
        "passwordVersion",
        "passwordResetToken",
        "passwordResetExpires",
        "deleted",
    ];

    fn id(&self) -> UserId {
        self.id
    }

    fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("Please tell us your name".to_string());
        }
        if !self.email.validate_email() {
            problems.push("Please provide a valid email".to_string());
        }
        if self.password.is_empty() {
            problems.push("Please provide a password".to_string());
        }
        DomainError::check(problems)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("email", self.email.clone())]
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public view
// ─────────────────────────────────────────────────────────────────────────────

/// What other users and API clients may see of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub role: Role,
}
