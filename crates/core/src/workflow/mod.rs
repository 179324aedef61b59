//! Expense approval workflow for Outlay.
//!
//! This module implements the approval roster, the policy evaluator and
//! the expense status state machine. Storage and locking live in
//! `outlay-db`; everything here is a pure function of its inputs.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (ExpenseStatus, Decision, HistoryEntry)
//! - `error` - Workflow-specific error types
//! - `roster` - Rule snapshots and roster construction
//! - `evaluator` - Authorization and decision logic

pub mod error;
pub mod evaluator;
pub mod roster;
pub mod types;

#[cfg(test)]
mod evaluator_props;
#[cfg(test)]
mod roster_props;

pub use error::WorkflowError;
pub use evaluator::{EvaluationInput, WorkflowEvaluator};
pub use roster::{
    ApprovalPolicy, ApproverEntry, RosterEntry, RosterSnapshot, RosterSource, RuleSnapshot,
    build_roster, default_roster, validate_rule_shape,
};
pub use types::{
    ApprovalAction, Decision, DecisionReason, ExpenseStatus, HistoryAction, HistoryEntry,
    PolicyKind, UserRole,
};
