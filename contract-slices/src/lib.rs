//! contract-slices library - contract time slice service
//!
//! Records one time slice per request for a contract, choosing the newest
//! article ID not yet recorded, and lists a contract's slices.

use axum::Router;
use contract_common::auth::TokenValidator;
use contract_common::config::{DEFAULT_READINESS_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use contract_common::time::millis_to_duration;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod query;

use engine::TimeSliceEngine;
use query::TimeSliceQuery;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Connection pool, created once at startup
    pub db: SqlitePool,
    pub engine: TimeSliceEngine,
    pub query: TimeSliceQuery,
    pub tokens: Arc<TokenValidator>,
    /// Deadline for each store operation made on behalf of a request
    pub request_timeout: Duration,
    pub readiness_timeout: Duration,
}

impl AppState {
    /// Create new application state with default timeouts
    pub fn new(db: SqlitePool, jwt_secret: &str) -> Self {
        Self {
            engine: TimeSliceEngine::new(db.clone()),
            query: TimeSliceQuery::new(db.clone()),
            db,
            tokens: Arc::new(TokenValidator::new(jwt_secret)),
            request_timeout: millis_to_duration(DEFAULT_REQUEST_TIMEOUT_MS),
            readiness_timeout: millis_to_duration(DEFAULT_READINESS_TIMEOUT_MS),
        }
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, readiness_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.readiness_timeout = readiness_timeout;
        self
    }
}

/// Build application router
///
/// Time slice routes require a bearer token; health routes do not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    let protected = Router::new()
        .route("/time-slices", post(api::create_time_slice))
        .route("/time-slices/:contract_id", get(api::list_time_slices))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
