use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    pub exp: usize,  // Expiration timestamp
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential missing")]
    Missing,
    #[error("credential malformed")]
    Malformed,
    #[error("credential expired")]
    Expired,
    #[error("credential signature invalid")]
    InvalidSignature,
}

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub username: String,
}

/// Stateless HMAC token verification shared by HTTP extractors and the realtime endpoint.
#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenAuthenticator {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
        }
    }

    /// Sign a new JWT token for a user, valid for `ttl`.
    pub fn sign(&self, user_id: i32, username: &str, ttl: Duration) -> Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(ttl)
            .context("token expiry out of range")?
            .timestamp();

        let claims = Claims {
            sub: username.to_owned(),
            uid: user_id,
            exp: usize::try_from(expiration).context("token expiry before epoch")?,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify and decode a JWT token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            })
    }

    /// Admit or reject a raw credential. Accepts a bare token or a `Bearer <token>` value.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        let raw = credential.unwrap_or_default().trim();
        let token = match raw.strip_prefix("Bearer") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
            _ => raw,
        };
        if token.is_empty() {
            return Err(AuthError::Missing);
        }

        let claims = self.verify(token)?;
        Ok(AuthenticatedUser {
            user_id: claims.uid,
            username: claims.sub,
        })
    }
}
