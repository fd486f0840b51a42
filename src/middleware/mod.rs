pub mod auth;
pub mod response;

pub use auth::{authenticate, authorize, Principal, ADMIN_ONLY, PUBLISHER_OR_ADMIN, USER_OR_ADMIN};
pub use response::{ApiResponse, ApiResult, ListResponse, TokenResponse};
