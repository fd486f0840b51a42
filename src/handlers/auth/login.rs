// handlers/auth/login.rs - POST /api/v1/auth/login
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use tracing::warn;

use super::TokenGrant;
use crate::app::AppState;
use crate::database::document_id;
use crate::error::ApiError;
use crate::handlers::utils::json_body;
use crate::models::user::{verify_password, PASSWORD_FIELD};
use crate::models::USER_SCHEMA;
use crate::query::Filter;

/// Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<TokenGrant, ApiError> {
    let body = json_body(body)?;
    let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::trim).unwrap_or_default();
    let (email, password) = (field("email"), field("password"));
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Please provide an email and password"));
    }

    let user = state
        .store
        .collection(&USER_SCHEMA)
        .find_one(&Filter::new().eq("email", email))
        .await?;

    let verified = user.as_ref().filter(|user| {
        user.get(PASSWORD_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|hash| verify_password(password, hash))
    });
    let Some(user) = verified else {
        warn!("Failed login for {}", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    TokenGrant::issue(document_id(user).unwrap_or_default(), &state.config.security)
}
