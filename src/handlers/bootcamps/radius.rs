use axum::extract::{Path, State};

use crate::app::AppState;
use crate::error::ApiError;
use crate::geocoder::GeocodeError;
use crate::middleware::ListResponse;
use crate::models::BOOTCAMP_SCHEMA;
use crate::query::{Condition, Filter, FindQuery};

/// Earth radius in miles; distance / radius gives the search angle in radians
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - bootcamps within `distance` miles
pub async fn within_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<ListResponse, ApiError> {
    let distance: f64 = distance
        .trim()
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::validation(format!("Invalid distance '{}'", distance)))?;

    let geocoder = state
        .geocoder
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Geocoding is not configured; radius search is disabled"))?;
    let center = geocoder.geocode(&zipcode).await.map_err(|e| match e {
        GeocodeError::NoMatch(_) => ApiError::not_found(format!("No location found for zipcode {}", zipcode)),
        GeocodeError::Request(e) => {
            tracing::error!("Geocoder request failed: {}", e);
            ApiError::service_unavailable("Geocoding service unavailable")
        }
    })?;

    let mut filter = Filter::new();
    filter.push(Condition::WithinRadius {
        field: "location.coordinates".to_string(),
        lng: center.lng,
        lat: center.lat,
        radius: distance / EARTH_RADIUS_MILES,
    });

    let docs = state
        .store
        .collection(&BOOTCAMP_SCHEMA)
        .find(&FindQuery::filtered(filter))
        .await?;
    Ok(ListResponse::unpaged(
        docs.into_iter().map(|doc| BOOTCAMP_SCHEMA.public_view(doc)).collect(),
    ))
}
