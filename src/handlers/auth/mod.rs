// handlers/auth/mod.rs - Registration, login and the current principal
use axum::{
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};

use crate::auth::sign_token;
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::middleware::TokenResponse;

pub mod login;
pub mod me;
pub mod register;

pub use login::login;
pub use me::me;
pub use register::register;

/// Signed token returned in the body and as an HttpOnly `token` cookie
pub struct TokenGrant {
    token: String,
    cookie: HeaderValue,
}

impl TokenGrant {
    pub fn issue(user_id: &str, config: &SecurityConfig) -> Result<Self, ApiError> {
        let token = sign_token(user_id, config)?;
        let cookie = HeaderValue::from_str(&token_cookie(&token, config))
            .map_err(|e| ApiError::internal(format!("invalid cookie header: {}", e)))?;
        Ok(Self { token, cookie })
    }
}

fn token_cookie(token: &str, config: &SecurityConfig) -> String {
    let max_age = Duration::days(config.cookie_expiry_days as i64);
    let expires = (Utc::now() + max_age).format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "token={}; Path=/; Max-Age={}; Expires={}; HttpOnly",
        token,
        max_age.num_seconds(),
        expires
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

impl IntoResponse for TokenGrant {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(SET_COOKIE, self.cookie)],
            Json(TokenResponse::new(self.token)),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn cookie_is_http_only_and_secure_in_production() {
        let mut config = AppConfig::for_testing("s").security;
        let dev = token_cookie("abc", &config);
        assert!(dev.starts_with("token=abc; Path=/; Max-Age=2592000;"));
        assert!(dev.ends_with("HttpOnly"));

        config.secure_cookies = true;
        assert!(token_cookie("abc", &config).ends_with("; Secure"));
    }
}
