use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json},
    routing::{get, post, put, MethodRouter},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::Store;
use crate::geocoder::{Geocoder, MapQuestGeocoder};
use crate::handlers::{auth, bootcamps, courses, reviews, users};
use crate::middleware::{authenticate, authorize, ADMIN_ONLY, PUBLISHER_OR_ADMIN, USER_OR_ADMIN};
use crate::models::Role;

/// Shared, immutable per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub geocoder: Option<Arc<dyn Geocoder>>,
}

impl AppState {
    /// Geocoding is enabled when the config carries an API key
    pub fn new(config: AppConfig, store: Store) -> Self {
        let geocoder = MapQuestGeocoder::from_config(&config.geocoder).map(|g| Arc::new(g) as Arc<dyn Geocoder>);
        Self {
            config: Arc::new(config),
            store,
            geocoder,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes(&state))
        .merge(bootcamp_routes(&state))
        .merge(course_routes(&state))
        .merge(review_routes(&state))
        .merge(user_routes(&state))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Require a signed-in principal
fn signed_in(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

/// Require a signed-in principal holding one of `roles`; authenticate runs first
fn guarded(state: &AppState, roles: &'static [Role], route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let route = route.route_layer(middleware::from_fn(move |request: Request, next: Next| {
        authorize(roles, request, next)
    }));
    signed_in(state, route)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/me", signed_in(state, get(auth::me)))
}

fn bootcamp_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/bootcamps",
            get(bootcamps::list).merge(guarded(state, PUBLISHER_OR_ADMIN, post(bootcamps::create))),
        )
        .route("/api/v1/bootcamps/radius/:zipcode/:distance", get(bootcamps::within_radius))
        .route(
            "/api/v1/bootcamps/:id",
            get(bootcamps::show).merge(guarded(
                state,
                PUBLISHER_OR_ADMIN,
                put(bootcamps::update).delete(bootcamps::remove),
            )),
        )
        // Nested resources
        .route(
            "/api/v1/bootcamps/:id/courses",
            get(courses::list_for_bootcamp).merge(guarded(state, PUBLISHER_OR_ADMIN, post(courses::create))),
        )
        .route(
            "/api/v1/bootcamps/:id/reviews",
            get(reviews::list_for_bootcamp).merge(guarded(state, USER_OR_ADMIN, post(reviews::create))),
        )
}

fn course_routes(state: &AppState) -> Router<AppState> {
    Router::new().route("/api/v1/courses", get(courses::list)).route(
        "/api/v1/courses/:id",
        get(courses::show).merge(guarded(
            state,
            PUBLISHER_OR_ADMIN,
            put(courses::update).delete(courses::remove),
        )),
    )
}

fn review_routes(state: &AppState) -> Router<AppState> {
    Router::new().route("/api/v1/reviews", get(reviews::list)).route(
        "/api/v1/reviews/:id",
        get(reviews::show).merge(guarded(state, USER_OR_ADMIN, put(reviews::update).delete(reviews::remove))),
    )
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", guarded(state, ADMIN_ONLY, get(users::list).post(users::create)))
        .route(
            "/api/v1/users/:id",
            guarded(state, ADMIN_ONLY, get(users::show).put(users::update).delete(users::remove)),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": version,
            "description": "Bootcamp directory REST API",
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (GET public; POST, PUT, DELETE publisher/admin)",
                "radius": "/api/v1/bootcamps/radius/:zipcode/:distance (public)",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "reviews": "/api/v1/reviews[/:id], /api/v1/bootcamps/:id/reviews",
                "auth": "/api/v1/auth/register, /api/v1/auth/login, /api/v1/auth/me",
                "users": "/api/v1/users[/:id] (admin)",
            },
            "query": "field=value, field[gt|gte|lt|lte|in]=value, select=a,b, sort=-a,b, page=N, limit=N",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": state.store.backend_name(),
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
