//! Expense submission and approval routes.
//!
//! Every handler runs as the token's subject. Expenses outside the token's
//! company answer 404.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use outlay_core::workflow::ApprovalAction;
use outlay_db::repositories::SubmitExpenseInput;
use outlay_shared::AppError;
use outlay_shared::types::{ApprovalRuleId, ExpenseId};

use super::{app_error_response, workflow_error_response};
use crate::{AppState, middleware::AuthUser};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(submit_expense))
        .route("/expenses/pending-approvals", get(pending_approvals))
        .route("/expenses/{expense_id}", get(get_expense))
        .route("/expenses/{expense_id}/history", get(get_history))
        .route("/expenses/{expense_id}/approve", post(approve_expense))
        .route("/expenses/{expense_id}/reject", post(reject_expense))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for submitting an expense.
#[derive(Debug, Deserialize)]
pub struct SubmitExpenseRequest {
    /// What the money was spent on.
    pub description: String,
    /// Amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Rule to route the expense through; omitted means manager only.
    pub approval_rule_id: Option<Uuid>,
}

/// Optional body for approve and reject.
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    /// Comment recorded in the approval history.
    pub comment: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/expenses` - Submit an expense as the token's subject.
async fn submit_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SubmitExpenseRequest>,
) -> Response {
    if payload.description.trim().is_empty() {
        return app_error_response(&AppError::validation(
            "description_required",
            "Description is required",
        ));
    }
    if payload.amount_cents <= 0 {
        return app_error_response(&AppError::validation(
            "invalid_amount",
            "Amount must be positive",
        ));
    }
    let Some(currency) = normalize_currency(&payload.currency) else {
        return app_error_response(&AppError::validation(
            "invalid_currency",
            "Currency must be a three-letter ISO 4217 code",
        ));
    };

    let input = SubmitExpenseInput {
        company_id: auth.company_id(),
        submitted_by: auth.user_id(),
        approval_rule_id: payload.approval_rule_id.map(ApprovalRuleId::from_uuid),
        description: payload.description.trim().to_string(),
        amount_cents: payload.amount_cents,
        currency,
    };

    match state.workflow().submit(input).await {
        Ok(expense) => (StatusCode::CREATED, Json(expense)).into_response(),
        Err(e) => workflow_error_response(&e, "Failed to submit expense"),
    }
}

/// GET `/expenses/pending-approvals` - Expenses waiting on the caller.
async fn pending_approvals(State(state): State<AppState>, auth: AuthUser) -> Response {
    if let Err(e) = auth.require_reviewer() {
        return app_error_response(&e);
    }

    match state.workflow().pending_for(auth.user_id()).await {
        Ok(items) => (StatusCode::OK, Json(json!({ "data": items }))).into_response(),
        Err(e) => workflow_error_response(&e, "Failed to list pending approvals"),
    }
}

/// GET `/expenses/{expense_id}` - Current state with the resolved roster.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> Response {
    match state
        .workflow()
        .snapshot(auth.company_id(), ExpenseId::from_uuid(expense_id))
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => workflow_error_response(&e, "Failed to get expense"),
    }
}

/// GET `/expenses/{expense_id}/history` - Approval history, oldest first.
async fn get_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
) -> Response {
    match state
        .workflow()
        .history(auth.company_id(), ExpenseId::from_uuid(expense_id))
        .await
    {
        Ok(entries) => (StatusCode::OK, Json(json!({ "data": entries }))).into_response(),
        Err(e) => workflow_error_response(&e, "Failed to get expense history"),
    }
}

/// POST `/expenses/{expense_id}/approve` - Approve at the current step.
async fn approve_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
    body: Bytes,
) -> Response {
    if let Err(e) = auth.require_reviewer() {
        return app_error_response(&e);
    }
    let payload = match parse_action(&body) {
        Ok(payload) => payload,
        Err(e) => return app_error_response(&e),
    };

    record(&state, &auth, expense_id, ApprovalAction::Approve, payload.comment).await
}

/// POST `/expenses/{expense_id}/reject` - Reject; a comment is required.
async fn reject_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(expense_id): Path<Uuid>,
    body: Bytes,
) -> Response {
    if let Err(e) = auth.require_reviewer() {
        return app_error_response(&e);
    }
    let payload = match parse_action(&body) {
        Ok(payload) => payload,
        Err(e) => return app_error_response(&e),
    };

    let Some(comment) = payload
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
    else {
        return app_error_response(&AppError::validation(
            "comment_required",
            "A comment is required when rejecting an expense",
        ));
    };

    record(&state, &auth, expense_id, ApprovalAction::Reject, Some(comment)).await
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn record(
    state: &AppState,
    auth: &AuthUser,
    expense_id: Uuid,
    action: ApprovalAction,
    comment: Option<String>,
) -> Response {
    let expense_id = ExpenseId::from_uuid(expense_id);

    match state
        .workflow()
        .record_action(expense_id, auth.user_id(), action, comment)
        .await
    {
        Ok(outcome) => {
            info!(
                expense_id = %expense_id,
                actor_id = %auth.user_id(),
                action = %action,
                status = %outcome.status,
                "Approval action recorded"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "message": outcome.reason.message(),
                    "data": outcome
                })),
            )
                .into_response()
        }
        Err(e) => workflow_error_response(&e, "Failed to record approval action"),
    }
}

/// Parses an optional JSON action body; an empty body means no comment.
fn parse_action(body: &[u8]) -> Result<ActionRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ActionRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::validation("invalid_body", format!("Invalid request body: {e}")))
}

/// Uppercases a currency code if it has the ISO 4217 shape.
fn normalize_currency(code: &str) -> Option<String> {
    let code = code.trim();
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}
