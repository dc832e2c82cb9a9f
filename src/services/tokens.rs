use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AuthConfig;

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a string, per JWT convention.
    pub sub: String,
    /// Expiration as a UTC timestamp.
    pub exp: usize,
    pub token_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("wrong token type")]
    WrongType,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies the bearer access/refresh token pair (HS256).
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = if config.jwt_secret.is_empty() {
            warn!("No jwt_secret configured; using a random secret, tokens will not survive a restart");
            random_secret()
        } else {
            config.jwt_secret.clone()
        };

        Self::new(
            secret.as_bytes(),
            Duration::minutes(config.access_token_minutes),
            Duration::days(config.refresh_token_days),
        )
    }

    #[must_use]
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue_pair(&self, user_id: i32) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user_id, TOKEN_TYPE_ACCESS, self.access_ttl)?,
            refresh: self.issue(user_id, TOKEN_TYPE_REFRESH, self.refresh_ttl)?,
        })
    }

    /// Validate an access token and return the user id it was issued for.
    pub fn verify_access(&self, token: &str) -> Result<i32, TokenError> {
        self.verify(token, TOKEN_TYPE_ACCESS)
    }

    /// Exchange a valid refresh token for a fresh access token.
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, TokenError> {
        let user_id = self.verify(refresh_token, TOKEN_TYPE_REFRESH)?;
        self.issue(user_id, TOKEN_TYPE_ACCESS, self.access_ttl)
    }

    fn issue(&self, user_id: i32, token_type: &str, ttl: Duration) -> Result<String, TokenError> {
        let expires_at = Utc::now() + ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            exp: usize::try_from(expires_at.timestamp()).map_err(|_| TokenError::Invalid)?,
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Invalid)
    }

    fn verify(&self, token: &str, expected_type: &str) -> Result<i32, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        if data.claims.token_type != expected_type {
            return Err(TokenError::WrongType);
        }

        data.claims.sub.parse().map_err(|_| TokenError::Invalid)
    }
}

fn random_secret() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
