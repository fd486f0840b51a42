use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::str::FromStr;
use tracing::{error, warn};

use crate::app::AppState;
use crate::auth::{bearer_token, verify_token};
use crate::database::{document_id, Document};
use crate::error::ApiError;
use crate::models::{Role, USER_SCHEMA};

pub const PUBLISHER_OR_ADMIN: &[Role] = &[Role::Publisher, Role::Admin];
pub const USER_OR_ADMIN: &[Role] = &[Role::User, Role::Admin];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// The acting user, resolved from the bearer token for one request
#[derive(Clone, Debug, PartialEq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and admins may change a resource
    pub fn can_modify(&self, owner: Option<&str>) -> bool {
        self.is_admin() || owner == Some(self.id.as_str())
    }
}

impl TryFrom<&Document> for Principal {
    type Error = String;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        let text = |key: &str| doc.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        let id = document_id(doc).ok_or("user record has no _id")?.to_string();
        let role = Role::from_str(doc.get("role").and_then(Value::as_str).unwrap_or("user"))?;
        Ok(Self {
            id,
            role,
            name: text("name"),
            email: text("email"),
        })
    }
}

/// Verify the bearer token and attach the matching user as a `Principal` extension
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let claims = {
        let token = bearer_token(request.headers()).map_err(|e| {
            warn!("Rejected {}: {}", request.uri().path(), e);
            ApiError::unauthorized("Not authorized to access this route")
        })?;
        verify_token(token, &state.config.security)?
    };

    let user = state
        .store
        .collection(&USER_SCHEMA)
        .find_by_id(&claims.id)
        .await
        .map_err(|e| {
            error!("User lookup failed during authentication: {}", e);
            ApiError::internal("Server Error")
        })?
        .ok_or_else(|| {
            warn!("Token subject {} no longer exists", claims.id);
            ApiError::unauthorized("Not authorized to access this route")
        })?;

    let principal = Principal::try_from(&user).map_err(|e| {
        error!("Stored user {} is malformed: {}", claims.id, e);
        ApiError::internal("Server Error")
    })?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Pass only principals whose role is in `allowed`; must run after `authenticate`
pub async fn authorize(allowed: &'static [Role], request: Request, next: Next) -> Result<Response, ApiError> {
    let role = request
        .extensions()
        .get::<Principal>()
        .map(|principal| principal.role)
        .ok_or_else(|| ApiError::unauthorized("Not authorized to access this route"))?;

    if !allowed.contains(&role) {
        warn!("Role {} denied on {}", role, request.uri().path());
        return Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            role
        )));
    }

    Ok(next.run(request).await)
}
