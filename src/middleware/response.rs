use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::query::{Paginated, Pagination};

/// Wrapper for API responses that adds the `{ success, data }` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None,
        }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);
        envelope(
            status,
            Envelope {
                success: true,
                data: self.data,
            },
        )
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
}

fn envelope<T: Serialize>(status: StatusCode, body: T) -> Response {
    match serde_json::to_value(&body) {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize response data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to serialize response data"
                })),
            )
                .into_response()
        }
    }
}

/// `{ success, count, pagination, data }` for advanced-results listings
#[derive(Debug, Serialize)]
pub struct ListResponse {
    success: bool,
    count: usize,
    #[serde(rename = "totalCount")]
    total_count: u64,
    pagination: Pagination,
    data: Vec<serde_json::Value>,
}

impl From<Paginated> for ListResponse {
    fn from(page: Paginated) -> Self {
        Self {
            success: true,
            count: page.count(),
            total_count: page.total_count,
            pagination: page.pagination,
            data: page.items.into_iter().map(serde_json::Value::Object).collect(),
        }
    }
}

impl ListResponse {
    /// Unpaginated listing, e.g. the courses of one bootcamp or a radius search
    pub fn unpaged(items: Vec<crate::database::Document>) -> Self {
        let count = items.len();
        Self {
            success: true,
            count,
            total_count: count as u64,
            pagination: Pagination::default(),
            data: items.into_iter().map(serde_json::Value::Object).collect(),
        }
    }
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        envelope(StatusCode::OK, self)
    }
}

/// `{ success, token }` returned by register and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

impl TokenResponse {
    pub fn new(token: String) -> Self {
        Self { success: true, token }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
