use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use skillswap_domain::DomainResult;
use skillswap_domain::error::DomainError;
use skillswap_domain::ports::auth::PasswordHasher;

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("jwt secret is not configured")]
    MissingSecret,
    #[error("invalid or expired token")]
    Invalid,
    #[error("token encoding failed: {0}")]
    Encode(jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// HS256 bearer tokens. An empty configured secret keeps the service
/// bootable but fails every issue/verify with `MissingSecret`, which the
/// API maps to a 500.
#[derive(Clone)]
pub struct TokenService {
    secret: Option<Arc<String>>,
    ttl_days: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        let secret = secret.trim();
        Self {
            secret: (!secret.is_empty()).then(|| Arc::new(secret.to_string())),
            ttl_days,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl_days)
    }

    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        let secret = self.secret.as_ref().ok_or(TokenError::MissingSecret)?;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + self.ttl_days * 24 * 60 * 60,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(TokenError::Encode)
    }

    /// Returns the user id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let secret = self.secret.as_ref().ok_or(TokenError::MissingSecret)?;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| TokenError::Invalid)?;
        Ok(data.claims.sub)
    }
}

#[derive(Clone, Default)]
pub struct Argon2PasswordHasher;

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| DomainError::Upstream(format!("password hashing failed: {err}")))
    }

    fn verify(&self, password: &str, hash: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|err| DomainError::Upstream(format!("stored hash is malformed: {err}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(DomainError::Upstream(format!(
                "password verification failed: {err}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let tokens = TokenService::new("test-secret", 7);
        let token = tokens.issue("u1").expect("issue");
        assert_eq!(tokens.verify(&token).expect("verify"), "u1");
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let issuer = TokenService::new("secret-a", 7);
        let verifier = TokenService::new("secret-b", 7);
        let token = issuer.issue("u1").expect("issue");
        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn garbage_token_rejected() {
        let tokens = TokenService::new("test-secret", 7);
        assert!(matches!(
            tokens.verify("not.a.token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn expired_token_rejected() {
        let tokens = TokenService::new("test-secret", -1);
        let token = tokens.issue("u1").expect("issue");
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn blank_secret_means_misconfigured() {
        let tokens = TokenService::new("  ", 7);
        assert!(matches!(tokens.issue("u1"), Err(TokenError::MissingSecret)));
        assert!(matches!(
            tokens.verify("anything"),
            Err(TokenError::MissingSecret)
        ));
    }

    #[test]
    fn argon2_hash_verifies_and_rejects() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash("hunter22").expect("hash");
        assert_ne!(hash, "hunter22");
        assert!(hasher.verify("hunter22", &hash).expect("verify"));
        assert!(!hasher.verify("wrong", &hash).expect("verify"));
    }
}
