// handlers/auth/me.rs - GET /api/v1/auth/me
use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::Document;
use crate::handlers::utils::find_or_404;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::models::USER_SCHEMA;

/// The signed-in user's record
pub async fn me(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<Document> {
    let user = find_or_404(&state.store, &USER_SCHEMA, &principal.id).await?;
    Ok(ApiResponse::success(USER_SCHEMA.public_view(user)))
}
