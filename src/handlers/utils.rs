use axum::{extract::rejection::JsonRejection, Json};
use serde_json::Value;

use crate::auth::AuthError;
use crate::database::{canonical_id, document_id, Document, Store};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::models::user::{hash_password, PASSWORD_FIELD};
use crate::models::{ResourceSchema, BOOTCAMP_SCHEMA};

/// Turn axum's JSON rejection into the API's error envelope
pub fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection);
        ApiError::validation(rejection.body_text())
    })
}

/// Fetch a document by id or answer 404 with the resource label
pub async fn find_or_404(store: &Store, schema: &ResourceSchema, id: &str) -> Result<Document, ApiError> {
    store
        .collection(schema)
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(schema.label, id))
}

/// The bootcamp a nested route names, or 404 when there is none
pub async fn parent_bootcamp(store: &Store, raw_id: &str) -> Result<(String, Document), ApiError> {
    let bootcamp = store
        .collection(&BOOTCAMP_SCHEMA)
        .find_by_id(raw_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", raw_id)))?;
    let id = document_id(&bootcamp)
        .map(str::to_string)
        .ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", raw_id)))?;
    Ok((id, bootcamp))
}

/// Nested listings scope on the stored id form; malformed ids name no bootcamp
pub fn bootcamp_scope(raw_id: &str) -> Result<String, ApiError> {
    canonical_id(raw_id).ok_or_else(|| ApiError::not_found(format!("No bootcamp with the id of {}", raw_id)))
}

/// The `user` that created a document
pub fn owner_of(doc: &Document) -> Option<&str> {
    doc.get("user").and_then(Value::as_str)
}

/// Owners and admins may mutate; everyone else is forbidden
pub fn ensure_owner(principal: &Principal, doc: &Document, schema: &ResourceSchema, action: &str) -> Result<(), ApiError> {
    if principal.can_modify(owner_of(doc)) {
        return Ok(());
    }
    tracing::warn!("User {} denied {} on {}", principal.id, action, schema.collection);
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {} this {}",
        principal.id,
        action,
        schema.label.to_lowercase()
    )))
}

/// Replace a plaintext `password` in `doc` with its argon2 hash
pub fn hash_password_field(doc: &mut Document) -> Result<(), ApiError> {
    if let Some(Value::String(plain)) = doc.get(PASSWORD_FIELD) {
        let hash = hash_password(plain).map_err(|e| AuthError::Hashing(e.to_string()))?;
        doc.insert(PASSWORD_FIELD.to_string(), Value::String(hash));
    }
    Ok(())
}
