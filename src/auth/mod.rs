use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Authorization header must use Bearer token format")]
    NotBearer,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    Signing(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

/// Token payload; `id` is the user's `_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, config: &SecurityConfig) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(config.jwt_expiry_hours as i64)).timestamp();

        Self {
            id: user_id.into(),
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Sign an HS256 token for `user_id` with the configured lifetime
pub fn sign_token(user_id: &str, config: &SecurityConfig) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::Signing("JWT secret not configured".to_string()));
    }

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &Claims::new(user_id, config), &encoding_key)
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Check signature and expiry, returning the claims
pub fn verify_token(token: &str, config: &SecurityConfig) -> Result<Claims, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::InvalidToken("JWT secret not configured".to_string()));
    }

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

/// Text after `Bearer ` in the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::NotBearer)?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() && !token.starts_with(' ') => Ok(token),
        _ => Err(AuthError::NotBearer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::HeaderValue;

    fn security(secret: &str) -> SecurityConfig {
        AppConfig::for_testing(secret).security
    }

    #[test]
    fn signed_token_verifies_with_same_secret() {
        let config = security("secret-one");
        let token = sign_token("user-1", &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.id, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_token("user-1", &security("secret-one")).unwrap();
        assert!(matches!(verify_token(&token, &security("secret-two")), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = security("secret-one");
        let claims = Claims {
            id: "user-1".into(),
            exp: Utc::now().timestamp() - 60,
            iat: Utc::now().timestamp() - 120,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret-one")).unwrap();
        assert!(matches!(verify_token(&token, &config), Err(AuthError::Expired)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(verify_token("abc.def.ghi", &security("s")), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingToken)));

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(matches!(bearer_token(&headers), Err(AuthError::NotBearer)));

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::NotBearer)));

        headers.insert("authorization", HeaderValue::from_static("Bearer  abc.def"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::NotBearer)));

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }
}
