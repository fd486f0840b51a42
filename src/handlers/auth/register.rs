// handlers/auth/register.rs - POST /api/v1/auth/register
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use super::TokenGrant;
use crate::app::AppState;
use crate::database::document_id;
use crate::error::ApiError;
use crate::handlers::utils::{hash_password_field, json_body};
use crate::models::user::SELF_SERVICE_ROLES;
use crate::models::USER_SCHEMA;

/// Create a `user` or `publisher` account and sign it in
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<TokenGrant, ApiError> {
    let body = json_body(body)?;

    if let Some(role) = body.get("role").and_then(Value::as_str) {
        if !SELF_SERVICE_ROLES.contains(&role) {
            let message = format!("role must be one of: {}", SELF_SERVICE_ROLES.join(", "));
            return Err(ApiError::ValidationFailure {
                field_errors: Some(HashMap::from([("role".to_string(), message.clone())])),
                message,
            });
        }
    }

    let mut doc = USER_SCHEMA.validate_create(&body)?;
    hash_password_field(&mut doc)?;

    let user = state.store.collection(&USER_SCHEMA).insert(doc).await?;
    let id = document_id(&user).unwrap_or_default();
    info!("Registered user {}", id);

    TokenGrant::issue(id, &state.config.security)
}
