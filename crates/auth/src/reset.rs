//! One-time password reset tokens.
//!
//! The plain token is only ever emailed; the store keeps its SHA-256 digest.

use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};

const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// How long a reset token stays usable.
pub fn reset_token_ttl() -> Duration {
    Duration::minutes(RESET_TOKEN_TTL_MINUTES)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub plain: String,
    pub hash: String,
}

impl ResetToken {
    /// 32 random bytes, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plain = hex::encode(bytes);
        let hash = hash_reset_token(&plain);
        Self { plain, hash }
    }
}

pub fn hash_reset_token(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_hashes_to_stored_digest() {
        let token = ResetToken::generate();
        assert_eq!(token.plain.len(), 64);
        assert_eq!(hash_reset_token(&token.plain), token.hash);
        assert_ne!(token.plain, token.hash);
    }

    #[test]
    fn tokens_are_not_repeated() {
        assert_ne!(ResetToken::generate().plain, ResetToken::generate().plain);
    }
}
