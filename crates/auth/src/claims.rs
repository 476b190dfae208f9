use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tourbook_core::UserId;

/// Claims carried by a session token. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user the token was issued to.
    pub sub: UserId,

    /// Issued-at. Compared against the user's password-change time.
    pub iat: i64,

    /// Expiration.
    pub exp: i64,

    /// The user's password version when the token was issued.
    #[serde(default)]
    pub pwv: u32,
}

impl JwtClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, wrongly signed, or missing required claims.
    #[error("Invalid token. Please log in again")]
    Invalid,

    #[error("Your token has expired. Please log in again")]
    Expired,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Verification seam used by request middleware.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<JwtClaims, TokenError>;
}

/// A freshly signed token and the moment it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 token issuer and validator sharing one secret.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        user: UserId,
        password_version: u32,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.ttl;
        let claims = JwtClaims {
            sub: user,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            pwv: password_version,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str) -> Result<JwtClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                kind => {
                    debug!(?kind, "token rejected");
                    TokenError::Invalid
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> Hs256Jwt {
        Hs256Jwt::new(b"test-secret", Duration::days(90))
    }

    #[test]
    fn issued_token_validates() {
        let user = UserId::new();
        let now = Utc::now();
        let issued = jwt().issue(user, 3, now).unwrap();
        let claims = jwt().validate(&issued.token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.pwv, 3);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(issued.expires_at, now + Duration::days(90));
    }

    #[test]
    fn expired_token_is_distinguished() {
        let issued = jwt()
            .issue(UserId::new(), 0, Utc::now() - Duration::days(91))
            .unwrap();
        assert_eq!(jwt().validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_secret_and_garbage_are_invalid() {
        let issued = Hs256Jwt::new(b"other", Duration::hours(1))
            .issue(UserId::new(), 0, Utc::now())
            .unwrap();
        assert_eq!(jwt().validate(&issued.token), Err(TokenError::Invalid));
        assert_eq!(jwt().validate("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(jwt().validate("loggedout"), Err(TokenError::Invalid));
    }
}
