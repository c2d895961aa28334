//! Bearer token middleware
//!
//! Applied to the time slice routes only; health routes stay open.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use contract_common::auth::{extract_bearer, ApiAuthError};
use tracing::debug;

use crate::models::ErrorResponse;
use crate::AppState;

/// Reject requests without a valid, unexpired HS256 token
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = extract_bearer(header)?;
    state.tokens.validate(token)?;

    Ok(next.run(request).await)
}

/// Authentication failure rendered as an HTTP response
#[derive(Debug)]
pub struct AuthError(pub ApiAuthError);

impl From<ApiAuthError> for AuthError {
    fn from(err: ApiAuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ApiAuthError::InvalidSignature => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };
        debug!(reason = %self.0, status = status.as_u16(), "Request rejected by auth");

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
