// Course endpoints, top-level and nested under a bootcamp
use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::Document;
use crate::error::ApiError;
use crate::handlers::utils::{bootcamp_scope, ensure_owner, find_or_404, json_body, owner_of, parent_bootcamp};
use crate::middleware::{ApiResponse, ApiResult, ListResponse, Principal};
use crate::models::{BOOTCAMP_SCHEMA, COURSE_SCHEMA};
use crate::query::{populate_documents, AdvancedResults, Filter, RawParams, Relation};
use crate::services::refresh_average_cost;

pub const BOOTCAMP: Relation = Relation::BelongsTo {
    field: "bootcamp",
    schema: &BOOTCAMP_SCHEMA,
    select: &["name", "description"],
};

fn bootcamp_of(course: &Document) -> Option<String> {
    course.get("bootcamp").and_then(Value::as_str).map(str::to_string)
}

async fn refresh_cost(state: &AppState, bootcamp_id: Option<String>) -> Result<(), ApiError> {
    if let Some(id) = bootcamp_id {
        refresh_average_cost(&state.store, &id).await?;
    }
    Ok(())
}

/// GET /api/v1/courses
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    let params = RawParams::from_query(query.as_deref());
    let page = AdvancedResults::new(&state.store, &COURSE_SCHEMA)
        .populate(BOOTCAMP)
        .execute(&params, &state.config.query)
        .await?;
    Ok(page.into())
}

/// GET /api/v1/bootcamps/:id/courses
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<ListResponse, ApiError> {
    let bootcamp_id = bootcamp_scope(&bootcamp_id)?;
    let params = RawParams::from_query(query.as_deref());
    let page = AdvancedResults::new(&state.store, &COURSE_SCHEMA)
        .scoped(Filter::new().eq("bootcamp", bootcamp_id))
        .execute(&params, &state.config.query)
        .await?;
    Ok(page.into())
}

/// GET /api/v1/courses/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let course = find_or_404(&state.store, &COURSE_SCHEMA, &id).await?;
    let mut docs = [COURSE_SCHEMA.public_view(course)];
    populate_documents(&state.store, &mut docs, &[BOOTCAMP]).await?;
    let [course] = docs;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:id/courses - only the bootcamp's owner or an admin
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let (bootcamp_id, bootcamp) = parent_bootcamp(&state.store, &bootcamp_id).await?;
    if !principal.can_modify(owner_of(&bootcamp)) {
        return Err(ApiError::forbidden(format!(
            "User {} is not authorized to add a course to bootcamp {}",
            principal.id, bootcamp_id
        )));
    }

    let mut doc = COURSE_SCHEMA.validate_create(&body)?;
    doc.insert("bootcamp".to_string(), Value::String(bootcamp_id.clone()));
    doc.insert("user".to_string(), Value::String(principal.id.clone()));

    let created = state.store.collection(&COURSE_SCHEMA).insert(doc).await?;
    refresh_cost(&state, Some(bootcamp_id)).await?;
    Ok(ApiResponse::created(COURSE_SCHEMA.public_view(created)))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let existing = find_or_404(&state.store, &COURSE_SCHEMA, &id).await?;
    ensure_owner(&principal, &existing, &COURSE_SCHEMA, "update")?;

    let changes = COURSE_SCHEMA.validate_update(&body)?;
    let updated = state
        .store
        .collection(&COURSE_SCHEMA)
        .update(&id, changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(COURSE_SCHEMA.label, &id))?;
    refresh_cost(&state, bootcamp_of(&updated)).await?;
    Ok(ApiResponse::success(COURSE_SCHEMA.public_view(updated)))
}

/// DELETE /api/v1/courses/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let existing = find_or_404(&state.store, &COURSE_SCHEMA, &id).await?;
    ensure_owner(&principal, &existing, &COURSE_SCHEMA, "delete")?;

    state.store.collection(&COURSE_SCHEMA).delete(&id).await?;
    refresh_cost(&state, bootcamp_of(&existing)).await?;
    Ok(ApiResponse::success(json!({})))
}
