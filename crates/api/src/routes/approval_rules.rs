//! Approval rule administration routes.
//!
//! Admin only. Rules are scoped to the token's company.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use outlay_core::workflow::PolicyKind;
use outlay_db::repositories::{ApprovalRuleError, ApproverInput, CreateApprovalRuleInput};
use outlay_shared::AppError;
use outlay_shared::types::{ApprovalRuleId, UserId};

use super::app_error_response;
use crate::{AppState, middleware::AuthUser};

/// Creates the approval rules routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/approval-rules",
            get(list_approval_rules).post(create_approval_rule),
        )
        .route(
            "/approval-rules/{rule_id}",
            get(get_approval_rule)
                .put(update_approval_rule)
                .delete(delete_approval_rule),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating or replacing an approval rule.
#[derive(Debug, Deserialize)]
pub struct CreateApprovalRuleRequest {
    /// Name of the approval rule.
    pub name: String,
    /// Policy kind (percentage, specific, hybrid).
    pub kind: String,
    /// Percentage threshold for percentage and hybrid rules.
    pub percentage_threshold: Option<i32>,
    /// Whether the submitter's manager approves first. Defaults to true.
    #[serde(default = "default_requires_manager")]
    pub requires_manager_approval: bool,
    /// Designated approvers.
    #[serde(default)]
    pub approvers: Vec<ApproverRequest>,
}

/// One approver in a create request.
#[derive(Debug, Deserialize)]
pub struct ApproverRequest {
    /// Approving user.
    pub user_id: Uuid,
    /// 1-based position.
    pub sequence_order: i32,
    /// Approval by this user resolves the expense immediately.
    #[serde(default)]
    pub auto_approve: bool,
}

const fn default_requires_manager() -> bool {
    true
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/approval-rules` - List active rules, newest first.
async fn list_approval_rules(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(e) = auth.require_admin() {
        return app_error_response(&e);
    }

    match state.rules().list_rules(auth.company_id()).await {
        Ok(rules) => (StatusCode::OK, Json(json!({ "data": rules }))).into_response(),
        Err(e) => approval_rule_error_response(&e, "Failed to list approval rules"),
    }
}

/// POST `/approval-rules` - Create a rule with its approvers.
async fn create_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateApprovalRuleRequest>,
) -> Response {
    if let Err(e) = auth.require_admin() {
        return app_error_response(&e);
    }
    let input = match rule_input(payload) {
        Ok(input) => input,
        Err(e) => return app_error_response(&e),
    };

    match state.rules().create_rule(auth.company_id(), input).await {
        Ok(rule) => (StatusCode::CREATED, Json(rule)).into_response(),
        Err(e) => approval_rule_error_response(&e, "Failed to create approval rule"),
    }
}

/// PUT `/approval-rules/{rule_id}` - Replace a rule's policy and approvers.
async fn update_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<CreateApprovalRuleRequest>,
) -> Response {
    if let Err(e) = auth.require_admin() {
        return app_error_response(&e);
    }
    let input = match rule_input(payload) {
        Ok(input) => input,
        Err(e) => return app_error_response(&e),
    };

    let rule_id = ApprovalRuleId::from_uuid(rule_id);
    match state
        .rules()
        .update_rule(auth.company_id(), rule_id, input)
        .await
    {
        Ok(rule) => {
            info!(rule_id = %rule_id, actor_id = %auth.user_id(), "Approval rule replaced");
            (StatusCode::OK, Json(rule)).into_response()
        }
        Err(e) => approval_rule_error_response(&e, "Failed to update approval rule"),
    }
}

/// GET `/approval-rules/{rule_id}` - Get one rule, active or not.
async fn get_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
) -> Response {
    if let Err(e) = auth.require_admin() {
        return app_error_response(&e);
    }

    match state
        .rules()
        .get_rule(auth.company_id(), ApprovalRuleId::from_uuid(rule_id))
        .await
    {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(e) => approval_rule_error_response(&e, "Failed to get approval rule"),
    }
}

/// DELETE `/approval-rules/{rule_id}` - Deactivate a rule.
async fn delete_approval_rule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(rule_id): Path<Uuid>,
) -> Response {
    if let Err(e) = auth.require_admin() {
        return app_error_response(&e);
    }

    let rule_id = ApprovalRuleId::from_uuid(rule_id);
    match state.rules().deactivate_rule(auth.company_id(), rule_id).await {
        Ok(()) => {
            info!(rule_id = %rule_id, actor_id = %auth.user_id(), "Approval rule retired");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => approval_rule_error_response(&e, "Failed to deactivate approval rule"),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Validates a request body into repository input.
fn rule_input(payload: CreateApprovalRuleRequest) -> Result<CreateApprovalRuleInput, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("name_required", "Name is required"));
    }
    let Some(kind) = PolicyKind::parse(&payload.kind) else {
        return Err(AppError::validation(
            "invalid_kind",
            "Kind must be one of: percentage, specific, hybrid",
        ));
    };

    Ok(CreateApprovalRuleInput {
        name: payload.name.trim().to_string(),
        kind,
        percentage_threshold: payload.percentage_threshold,
        requires_manager_approval: payload.requires_manager_approval,
        approvers: payload
            .approvers
            .into_iter()
            .map(|a| ApproverInput {
                user_id: UserId::from_uuid(a.user_id),
                sequence_order: a.sequence_order,
                auto_approve: a.auto_approve,
            })
            .collect(),
    })
}

fn approval_rule_error_response(err: &ApprovalRuleError, context: &str) -> Response {
    let app_err = match err {
        ApprovalRuleError::NotFound(_) => AppError::NotFound(err.to_string()),
        ApprovalRuleError::InvalidRule(_) => AppError::validation("invalid_rule", err.to_string()),
        ApprovalRuleError::UnknownApprover(_) => {
            AppError::validation("unknown_approver", err.to_string())
        }
        ApprovalRuleError::Database(_) => {
            error!(error = %err, "{context}");
            AppError::Internal(err.to_string())
        }
    };
    app_error_response(&app_err)
}
