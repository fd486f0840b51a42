// User administration, admin only
use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::Document;
use crate::error::ApiError;
use crate::handlers::utils::{find_or_404, hash_password_field, json_body};
use crate::middleware::{ApiResponse, ApiResult, ListResponse};
use crate::models::USER_SCHEMA;
use crate::query::{AdvancedResults, RawParams};

/// GET /api/v1/users
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    let params = RawParams::from_query(query.as_deref());
    let page = AdvancedResults::new(&state.store, &USER_SCHEMA)
        .execute(&params, &state.config.query)
        .await?;
    Ok(page.into())
}

/// GET /api/v1/users/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let user = find_or_404(&state.store, &USER_SCHEMA, &id).await?;
    Ok(ApiResponse::success(USER_SCHEMA.public_view(user)))
}

/// POST /api/v1/users - admins may assign any role
pub async fn create(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> ApiResult<Document> {
    let body = json_body(body)?;
    let mut doc = USER_SCHEMA.validate_create(&body)?;
    hash_password_field(&mut doc)?;

    let created = state.store.collection(&USER_SCHEMA).insert(doc).await?;
    Ok(ApiResponse::created(USER_SCHEMA.public_view(created)))
}

/// PUT /api/v1/users/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let mut changes = USER_SCHEMA.validate_update(&body)?;
    hash_password_field(&mut changes)?;

    let updated = state
        .store
        .collection(&USER_SCHEMA)
        .update(&id, changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(USER_SCHEMA.label, &id))?;
    Ok(ApiResponse::success(USER_SCHEMA.public_view(updated)))
}

/// DELETE /api/v1/users/:id
pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    if !state.store.collection(&USER_SCHEMA).delete(&id).await? {
        return Err(ApiError::resource_not_found(USER_SCHEMA.label, &id));
    }
    Ok(ApiResponse::success(json!({})))
}
