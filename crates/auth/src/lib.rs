//! `tourbook-auth`: identity, credentials and role checks.
//!
//! Decoupled from HTTP and storage: the API layer extracts tokens and loads
//! users, this crate decides whether they are valid.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod reset;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use claims::{Hs256Jwt, IssuedToken, JwtClaims, JwtValidator, TokenError};
pub use password::{PasswordError, PasswordHasher, validate_new_password};
pub use reset::{ResetToken, hash_reset_token, reset_token_ttl};
pub use roles::Role;
pub use user::{User, UserProfile};
