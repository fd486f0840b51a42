// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::models::ValidationErrors;
use crate::query::QueryError;

/// HTTP API error with a status code and a client-safe message
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationFailure {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 400 Bad Request, duplicate value for a unique field
    Conflict(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalQueryFailure(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationFailure { .. } => 400,
            ApiError::Conflict(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalQueryFailure(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationFailure { message, .. } => message,
            ApiError::Conflict(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalQueryFailure(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// `{ success: false, error }`, plus per-field messages for validation failures
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.message(),
        });
        if let ApiError::ValidationFailure { field_errors: Some(fields), .. } = self {
            body["fields"] = json!(fields);
        }
        body
    }
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationFailure {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Resource lookups by id that miss, e.g. `Bootcamp not found with id of 123`
    pub fn resource_not_found(label: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{} not found with id of {}", label, id))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalQueryFailure(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => {
                tracing::debug!("Duplicate value for unique field {}", field);
                ApiError::Conflict("Duplicate field value entered".to_string())
            }
            StoreError::InvalidDocument(msg) => ApiError::validation(msg),
            StoreError::Connection(msg) => {
                tracing::error!("Store connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return a generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal("Server Error")
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let field = match &err {
            QueryError::UnknownField(field) => field.clone(),
            QueryError::UnsupportedOperator { field, .. } | QueryError::InvalidValue { field, .. } => field.clone(),
            QueryError::InvalidSort(raw) => raw.clone(),
        };
        let message = err.to_string();
        ApiError::ValidationFailure {
            field_errors: Some(HashMap::from([(field, message.clone())])),
            message,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::ValidationFailure {
            message: err.summary(),
            field_errors: Some(err.fields),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(msg) => {
                tracing::error!("Token signing failed: {}", msg);
                ApiError::internal("Server Error")
            }
            AuthError::Hashing(msg) => {
                tracing::error!("Password hashing failed: {}", msg);
                ApiError::internal("Server Error")
            }
            other => {
                tracing::warn!("Token rejected: {}", other);
                ApiError::unauthorized("Not authorized to access this route")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
