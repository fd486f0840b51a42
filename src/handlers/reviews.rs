// Review endpoints; one review per user per bootcamp
use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::Document;
use crate::error::ApiError;
use crate::handlers::courses::BOOTCAMP;
use crate::handlers::utils::{bootcamp_scope, ensure_owner, find_or_404, json_body, parent_bootcamp};
use crate::middleware::{ApiResponse, ApiResult, ListResponse, Principal};
use crate::models::REVIEW_SCHEMA;
use crate::query::{populate_documents, AdvancedResults, Filter, RawParams};
use crate::services::refresh_average_rating;

async fn refresh_rating(state: &AppState, review: &Document) -> Result<(), ApiError> {
    if let Some(id) = review.get("bootcamp").and_then(Value::as_str) {
        refresh_average_rating(&state.store, id).await?;
    }
    Ok(())
}

/// GET /api/v1/reviews
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    let params = RawParams::from_query(query.as_deref());
    let page = AdvancedResults::new(&state.store, &REVIEW_SCHEMA)
        .populate(BOOTCAMP)
        .execute(&params, &state.config.query)
        .await?;
    Ok(page.into())
}

/// GET /api/v1/bootcamps/:id/reviews
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<ListResponse, ApiError> {
    let bootcamp_id = bootcamp_scope(&bootcamp_id)?;
    let params = RawParams::from_query(query.as_deref());
    let page = AdvancedResults::new(&state.store, &REVIEW_SCHEMA)
        .scoped(Filter::new().eq("bootcamp", bootcamp_id))
        .execute(&params, &state.config.query)
        .await?;
    Ok(page.into())
}

/// GET /api/v1/reviews/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let review = find_or_404(&state.store, &REVIEW_SCHEMA, &id).await?;
    let mut docs = [REVIEW_SCHEMA.public_view(review)];
    populate_documents(&state.store, &mut docs, &[BOOTCAMP]).await?;
    let [review] = docs;
    Ok(ApiResponse::success(review))
}

/// POST /api/v1/bootcamps/:id/reviews
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let (bootcamp_id, _) = parent_bootcamp(&state.store, &bootcamp_id).await?;

    let reviews = state.store.collection(&REVIEW_SCHEMA);
    let mine = Filter::new()
        .eq("bootcamp", bootcamp_id.as_str())
        .eq("user", principal.id.as_str());
    if reviews.find_one(&mine).await?.is_some() {
        return Err(ApiError::Conflict("Duplicate field value entered".to_string()));
    }

    let mut doc = REVIEW_SCHEMA.validate_create(&body)?;
    doc.insert("bootcamp".to_string(), Value::String(bootcamp_id));
    doc.insert("user".to_string(), Value::String(principal.id.clone()));

    let created = reviews.insert(doc).await?;
    refresh_rating(&state, &created).await?;
    Ok(ApiResponse::created(REVIEW_SCHEMA.public_view(created)))
}

/// PUT /api/v1/reviews/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let existing = find_or_404(&state.store, &REVIEW_SCHEMA, &id).await?;
    ensure_owner(&principal, &existing, &REVIEW_SCHEMA, "update")?;

    let changes = REVIEW_SCHEMA.validate_update(&body)?;
    let updated = state
        .store
        .collection(&REVIEW_SCHEMA)
        .update(&id, changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(REVIEW_SCHEMA.label, &id))?;
    refresh_rating(&state, &updated).await?;
    Ok(ApiResponse::success(REVIEW_SCHEMA.public_view(updated)))
}

/// DELETE /api/v1/reviews/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let existing = find_or_404(&state.store, &REVIEW_SCHEMA, &id).await?;
    ensure_owner(&principal, &existing, &REVIEW_SCHEMA, "delete")?;

    state.store.collection(&REVIEW_SCHEMA).delete(&id).await?;
    refresh_rating(&state, &existing).await?;
    Ok(ApiResponse::success(json!({})))
}
