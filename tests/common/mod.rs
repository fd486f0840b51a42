#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use devcamper_api::auth::sign_token;
use devcamper_api::config::AppConfig;
use devcamper_api::database::{document_id, Document, Store};
use devcamper_api::geocoder::{GeoPoint, GeocodeError, Geocoder};
use devcamper_api::models::user::hash_password;
use devcamper_api::models::{ResourceSchema, Role, USER_SCHEMA};
use devcamper_api::{router, AppState};

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "123456";

/// In-process app over the memory store
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::from_state(AppState::new(AppConfig::for_testing(SECRET), Store::memory()))
    }

    /// Radius search and bootcamp geocoding resolve against `places`
    pub fn with_places(places: &[(&str, f64, f64)]) -> Self {
        let geocoder = FixedGeocoder {
            places: places.iter().map(|(name, lat, lng)| (name.to_string(), (*lat, *lng))).collect(),
        };
        let state = AppState::new(AppConfig::for_testing(SECRET), Store::memory()).with_geocoder(Arc::new(geocoder));
        Self::from_state(state)
    }

    fn from_state(state: AppState) -> Self {
        Self {
            router: router(state.clone()),
            state,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Response> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        Ok(self.router.clone().oneshot(request).await?)
    }

    /// Send and decode the JSON body
    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let response = self.send(method, uri, token, body).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {:?}", bytes))?;
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, uri, None, None).await
    }

    pub async fn get_as(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Insert straight into the store, bypassing validation
    pub async fn insert(&self, schema: &ResourceSchema, value: Value) -> Result<Document> {
        let doc = value.as_object().cloned().context("seed value must be an object")?;
        Ok(self.state.store.collection(schema).insert(doc).await?)
    }

    /// Store a user with a known password and return its id and a signed token
    pub async fn user(&self, name: &str, role: Role) -> Result<(String, String)> {
        let hash = hash_password(PASSWORD).map_err(|e| anyhow::anyhow!("{}", e))?;
        let user = self
            .insert(
                &USER_SCHEMA,
                json!({
                    "name": name,
                    "email": format!("{}@devcamper.io", name.to_lowercase()),
                    "role": role.as_str(),
                    "password": hash,
                }),
            )
            .await?;
        let id = document_id(&user).context("user has no id")?.to_string();
        let token = sign_token(&id, &self.state.config.security)?;
        Ok((id, token))
    }

    /// Create a bootcamp through the API as `token`
    pub async fn bootcamp(&self, token: &str, name: &str) -> Result<String> {
        let (status, body) = self.post("/api/v1/bootcamps", token, bootcamp_body(name)).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "bootcamp create failed: {} {}", status, body);
        Ok(body["data"]["_id"].as_str().context("missing _id")?.to_string())
    }
}

pub fn bootcamp_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} is a full stack bootcamp", name),
        "website": "https://devworks.com",
        "phone": "(111) 111-1111",
        "email": "enroll@devworks.com",
        "address": "233 Bay State Rd Boston MA 02215",
        "careers": ["Web Development", "UI/UX", "Business"],
        "housing": true,
        "jobAssistance": true,
    })
}

pub fn course_body(title: &str, weeks: u32, tuition: u32) -> Value {
    json!({
        "title": title,
        "description": "Learn the fundamentals",
        "weeks": weeks,
        "tuition": tuition,
        "minimumSkill": "beginner",
    })
}

struct FixedGeocoder {
    places: HashMap<String, (f64, f64)>,
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let (lat, lng) = self
            .places
            .iter()
            .find(|(name, _)| address.contains(name.as_str()))
            .map(|(_, point)| *point)
            .ok_or_else(|| GeocodeError::NoMatch(address.to_string()))?;
        Ok(GeoPoint {
            lat,
            lng,
            formatted_address: address.to_string(),
            zipcode: address.split_whitespace().last().unwrap_or_default().to_string(),
            ..Default::default()
        })
    }
}
