//! Workflow error types for expense approval.
//!
//! This module defines all error types that can occur while submitting
//! expenses and recording approval actions against them.

use thiserror::Error;

use outlay_shared::types::{ApprovalRuleId, ExpenseId, UserId};

use crate::workflow::types::{ApprovalAction, ExpenseStatus};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Expense not found (or not visible in the caller's company).
    #[error("Expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// Approval rule not found.
    #[error("Approval rule {0} not found")]
    RuleNotFound(ApprovalRuleId),

    /// User not found.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Attempted an action on an expense that no longer accepts it.
    #[error("Cannot {action} an expense in status {from}")]
    InvalidTransition {
        /// The current status.
        from: ExpenseStatus,
        /// The attempted action.
        action: ApprovalAction,
    },

    /// The rule or roster cannot produce a decision.
    #[error("Approval configuration error: {0}")]
    Configuration(String),

    /// The actor does not hold the current approval step.
    #[error("User {user_id} is not the current approver at step {step}")]
    NotCurrentApprover {
        /// The user who attempted to act.
        user_id: UserId,
        /// The step the expense is waiting on.
        step: i32,
    },

    /// The expense changed underneath the decision; safe to retry.
    #[error("Concurrent modification: {0}")]
    StorageConflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ExpenseNotFound(_) | Self::RuleNotFound(_) | Self::UserNotFound(_) => 404,
            Self::InvalidTransition { .. } | Self::StorageConflict(_) => 409,
            Self::Configuration(_) => 422,
            Self::NotCurrentApprover { .. } => 403,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::NotCurrentApprover { .. } => "NOT_CURRENT_APPROVER",
            Self::StorageConflict(_) => "STORAGE_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the caller may retry the same request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict(_))
    }
}
