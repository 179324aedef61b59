//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Expense submission and approval routes
//! - Approval rule administration routes
//! - Bearer token authentication middleware
//! - Translation of workflow errors into JSON responses

pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use outlay_db::{ApprovalRuleRepository, ExpenseWorkflowController};
use outlay_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    /// Workflow controller over the shared pool.
    #[must_use]
    pub fn workflow(&self) -> ExpenseWorkflowController {
        ExpenseWorkflowController::new((*self.db).clone())
    }

    /// Approval rule repository over the shared pool.
    #[must_use]
    pub fn rules(&self) -> ApprovalRuleRepository {
        ApprovalRuleRepository::new((*self.db).clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
