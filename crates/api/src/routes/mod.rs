//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use outlay_core::workflow::WorkflowError;
use outlay_shared::AppError;

use crate::{AppState, middleware::auth::auth_middleware};

pub mod approval_rules;
pub mod expenses;
pub mod health;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(expenses::routes())
        .merge(approval_rules::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Builds a JSON error body with the given status.
pub(crate) fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}

/// Translates an application error into its HTTP response.
///
/// Internal errors are answered without detail; callers log them.
pub(crate) fn app_error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        return error_response(status, err.error_code(), "An internal error occurred");
    }

    error_response(status, err.error_code(), &err.to_string())
}

/// Translates a workflow error into its HTTP response.
///
/// Storage failures are logged and answered without internal detail.
pub(crate) fn workflow_error_response(err: &WorkflowError, context: &str) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, "{context}");
        return error_response(status, err.error_code(), "An internal error occurred");
    }

    warn!(error = %err, code = err.error_code(), "{context}");
    error_response(status, err.error_code(), &err.to_string())
}
