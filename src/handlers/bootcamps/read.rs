use axum::extract::{Path, RawQuery, State};

use crate::app::AppState;
use crate::database::Document;
use crate::error::ApiError;
use crate::handlers::utils::find_or_404;
use crate::middleware::{ApiResponse, ApiResult, ListResponse};
use crate::models::{BOOTCAMP_SCHEMA, COURSE_SCHEMA};
use crate::query::{AdvancedResults, RawParams, Relation};

pub const COURSES: Relation = Relation::HasMany {
    field: "courses",
    schema: &COURSE_SCHEMA,
    foreign_key: "bootcamp",
};

/// GET /api/v1/bootcamps - filtered, sorted, paginated listing with courses inlined
pub async fn list(State(state): State<AppState>, RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    let params = RawParams::from_query(query.as_deref());
    let page = AdvancedResults::new(&state.store, &BOOTCAMP_SCHEMA)
        .populate(COURSES)
        .execute(&params, &state.config.query)
        .await?;
    Ok(page.into())
}

/// GET /api/v1/bootcamps/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let bootcamp = find_or_404(&state.store, &BOOTCAMP_SCHEMA, &id).await?;
    Ok(ApiResponse::success(BOOTCAMP_SCHEMA.public_view(bootcamp)))
}
