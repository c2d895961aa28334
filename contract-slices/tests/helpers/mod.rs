//! Shared helpers for contract-slices integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use contract_common::auth::{issue_token, Claims};
use contract_common::config::DatabaseConfig;
use contract_common::db::init_database;
use contract_slices::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const SECRET: &str = "integration-test-secret";

/// Temporary database with schema; TempDir must outlive the pool
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}", temp_dir.path().join("contracts.db").display());
    let pool = init_database(&url, &DatabaseConfig::default())
        .await
        .expect("Should initialize test database");
    (temp_dir, pool)
}

pub fn setup_app(db: SqlitePool) -> Router {
    build_router(AppState::new(db, SECRET))
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Token signed with `secret`, expiring `expires_in` seconds from now
pub fn token_with(secret: &str, expires_in: i64) -> String {
    let claims = Claims {
        exp: (now_secs() + expires_in) as u64,
        nbf: None,
    };
    issue_token(secret, &claims).expect("token")
}

pub fn valid_token() -> String {
    token_with(SECRET, 300)
}

pub fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    post_raw(uri, body.to_string(), token)
}

pub fn post_raw(uri: &str, body: String, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
