pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod geocoder;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod seed;
pub mod services;

pub use app::{router, AppState};
pub use error::ApiError;
