//! HTTP API handlers for contract-slices

pub mod auth;
pub mod health;
pub mod time_slices;

pub use auth::auth_middleware;
pub use health::health_routes;
pub use time_slices::{create_time_slice, list_time_slices};
