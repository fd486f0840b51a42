use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;
use crate::database::{document_id, Document};
use crate::error::ApiError;
use crate::handlers::utils::{ensure_owner, find_or_404, json_body};
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::models::bootcamp::slugify;
use crate::models::{BOOTCAMP_SCHEMA, COURSE_SCHEMA, REVIEW_SCHEMA};
use crate::query::Filter;

/// Geocoded `location` for an address, when a geocoder is configured and finds it
async fn locate(state: &AppState, address: &str) -> Option<Value> {
    let geocoder = state.geocoder.as_ref()?;
    match geocoder.geocode(address).await {
        Ok(point) => Some(point.to_location()),
        Err(e) => {
            warn!("Storing bootcamp without location: {}", e);
            None
        }
    }
}

/// Derive `slug` and `location` from `name` and `address` when they are present
async fn derive_fields(state: &AppState, doc: &mut Document) {
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        doc.insert("slug".to_string(), Value::String(slug));
    }
    let address = doc.get("address").and_then(Value::as_str).map(str::to_string);
    if let Some(address) = address {
        if let Some(location) = locate(state, &address).await {
            doc.insert("location".to_string(), location);
        }
    }
}

/// POST /api/v1/bootcamps - publishers may own one bootcamp, admins any number
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let bootcamps = state.store.collection(&BOOTCAMP_SCHEMA);

    if !principal.is_admin() {
        let published = bootcamps.find_one(&Filter::new().eq("user", principal.id.as_str())).await?;
        if published.is_some() {
            return Err(ApiError::validation(format!(
                "The user with ID {} has already published a bootcamp",
                principal.id
            )));
        }
    }

    let mut doc = BOOTCAMP_SCHEMA.validate_create(&body)?;
    doc.insert("user".to_string(), Value::String(principal.id.clone()));
    derive_fields(&state, &mut doc).await;

    let created = bootcamps.insert(doc).await?;
    info!("Bootcamp {} created by {}", document_id(&created).unwrap_or_default(), principal.id);
    Ok(ApiResponse::created(BOOTCAMP_SCHEMA.public_view(created)))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    let body = json_body(body)?;
    let existing = find_or_404(&state.store, &BOOTCAMP_SCHEMA, &id).await?;
    ensure_owner(&principal, &existing, &BOOTCAMP_SCHEMA, "update")?;

    let mut changes = BOOTCAMP_SCHEMA.validate_update(&body)?;
    derive_fields(&state, &mut changes).await;

    let updated = state
        .store
        .collection(&BOOTCAMP_SCHEMA)
        .update(&id, changes)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(BOOTCAMP_SCHEMA.label, &id))?;
    Ok(ApiResponse::success(BOOTCAMP_SCHEMA.public_view(updated)))
}

/// DELETE /api/v1/bootcamps/:id - also removes the bootcamp's courses and reviews
pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let existing = find_or_404(&state.store, &BOOTCAMP_SCHEMA, &id).await?;
    ensure_owner(&principal, &existing, &BOOTCAMP_SCHEMA, "delete")?;
    let id = document_id(&existing).unwrap_or(id.as_str()).to_string();

    let children = Filter::new().eq("bootcamp", id.as_str());
    let courses = state.store.collection(&COURSE_SCHEMA).delete_many(&children).await?;
    let reviews = state.store.collection(&REVIEW_SCHEMA).delete_many(&children).await?;
    state.store.collection(&BOOTCAMP_SCHEMA).delete(&id).await?;

    info!("Bootcamp {} deleted with {} courses and {} reviews", id, courses, reviews);
    Ok(ApiResponse::success(json!({})))
}
