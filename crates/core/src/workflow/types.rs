//! Workflow domain types for expense approval.
//!
//! This module defines the statuses an expense moves through, the actions
//! approvers take, the rule policy kinds, and the decision the evaluator
//! hands back to the persistence layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use outlay_shared::types::{ExpenseId, UserId};

/// Expense status in the approval workflow.
///
/// The valid transitions are:
/// - Pending → InReview (approve, more steps remain)
/// - Pending | InReview → Approved (approve, workflow resolved)
/// - Pending | InReview → Rejected (reject)
///
/// Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Submitted, no approval recorded yet.
    Pending,
    /// At least one step approved, more approvals outstanding.
    InReview,
    /// Fully approved (terminal).
    Approved,
    /// Rejected (terminal).
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_review" => Some(Self::InReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if no further transitions are permitted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Returns true if the expense is still awaiting a decision.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action an approver takes on an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    /// Approve the current step.
    Approve,
    /// Reject the expense outright.
    Reject,
}

impl ApprovalAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action recorded in the approval ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    /// Anchor entry written on submission.
    Pending,
    /// An approval; counts towards the quorum.
    Approved,
    /// A rejection.
    Rejected,
}

impl HistoryAction {
    /// Returns the string representation of the ledger action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a ledger action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl From<ApprovalAction> for HistoryAction {
    fn from(action: ApprovalAction) -> Self {
        match action {
            ApprovalAction::Approve => Self::Approved,
            ApprovalAction::Reject => Self::Rejected,
        }
    }
}

/// How an approval rule resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Approved once the approved share of the roster reaches the threshold.
    Percentage,
    /// Every roster member approves in sequence.
    Specific,
    /// Sequential, but resolves early once the threshold is reached.
    Hybrid,
}

impl PolicyKind {
    /// Returns the string representation of the policy kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Specific => "specific",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parses a policy kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "percentage" => Some(Self::Percentage),
            "specific" => Some(Self::Specific),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Returns true if the kind is evaluated against a percentage threshold.
    #[must_use]
    pub fn uses_quorum(&self) -> bool {
        matches!(self, Self::Percentage | Self::Hybrid)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User role within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Company administrator; may reject any open expense in the company.
    Admin,
    /// People manager.
    Manager,
    /// Regular employee.
    Employee,
}

impl UserRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }
}

/// Why the evaluator reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// The approver at the current step holds the auto-approve privilege.
    AutoApproved,
    /// The approved share of the roster met the percentage threshold.
    QuorumReached,
    /// The last roster step approved.
    SequenceExhausted,
    /// Approved at this step, moved on to the next approver.
    Advanced,
    /// Rejected by an entitled approver.
    Rejected,
}

impl DecisionReason {
    /// Returns a human-readable description of the decision.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::AutoApproved => "Expense auto-approved",
            Self::QuorumReached => "Expense approved by percentage threshold",
            Self::SequenceExhausted => "Expense fully approved",
            Self::Advanced => "Approved, moved to next approver",
            Self::Rejected => "Expense rejected",
        }
    }
}

/// Outcome of evaluating one action against an expense.
///
/// Carries everything the persistence layer needs to write the new
/// `(status, current_approval_step)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The workflow resolved to Approved.
    Approved {
        /// Step to persist (unchanged, or the roster length when exhausted).
        step: i32,
        /// How approval was reached.
        reason: DecisionReason,
    },
    /// The workflow resolved to Rejected; step is unchanged.
    Rejected {
        /// The step at which the rejection happened.
        step: i32,
    },
    /// More approvals are required.
    InReview {
        /// Roster index of the next approver.
        next_step: i32,
    },
}

impl Decision {
    /// Returns the status resulting from this decision.
    #[must_use]
    pub fn status(&self) -> ExpenseStatus {
        match self {
            Self::Approved { .. } => ExpenseStatus::Approved,
            Self::Rejected { .. } => ExpenseStatus::Rejected,
            Self::InReview { .. } => ExpenseStatus::InReview,
        }
    }

    /// Returns the approval step to persist.
    #[must_use]
    pub fn current_step(&self) -> i32 {
        match self {
            Self::Approved { step, .. } | Self::Rejected { step } => *step,
            Self::InReview { next_step } => *next_step,
        }
    }

    /// Returns the reason for this decision.
    #[must_use]
    pub fn reason(&self) -> DecisionReason {
        match self {
            Self::Approved { reason, .. } => *reason,
            Self::Rejected { .. } => DecisionReason::Rejected,
            Self::InReview { .. } => DecisionReason::Advanced,
        }
    }
}

/// Read-only projection of one approval ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Ledger entry ID.
    pub id: Uuid,
    /// The expense acted upon.
    pub expense_id: ExpenseId,
    /// The user who acted.
    pub approver_id: UserId,
    /// What was recorded.
    pub action: HistoryAction,
    /// Optional comment.
    pub comment: Option<String>,
    /// Roster step the action was taken at.
    pub step_number: i32,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ExpenseStatus::Pending, "pending")]
    #[case(ExpenseStatus::InReview, "in_review")]
    #[case(ExpenseStatus::Approved, "approved")]
    #[case(ExpenseStatus::Rejected, "rejected")]
    fn test_status_string_forms(#[case] status: ExpenseStatus, #[case] s: &str) {
        assert_eq!(status.as_str(), s);
        assert_eq!(ExpenseStatus::parse(s), Some(status));
        assert_eq!(format!("{status}"), s);
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(
            ExpenseStatus::parse("IN_REVIEW"),
            Some(ExpenseStatus::InReview)
        );
        assert_eq!(ExpenseStatus::parse("draft"), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ExpenseStatus::Pending.is_terminal());
        assert!(!ExpenseStatus::InReview.is_terminal());
        assert!(ExpenseStatus::Approved.is_terminal());
        assert!(ExpenseStatus::Rejected.is_terminal());
        assert!(ExpenseStatus::InReview.is_open());
    }

    #[test]
    fn test_policy_kind() {
        assert_eq!(PolicyKind::parse("Hybrid"), Some(PolicyKind::Hybrid));
        assert_eq!(PolicyKind::parse("quorum"), None);
        assert!(PolicyKind::Percentage.uses_quorum());
        assert!(PolicyKind::Hybrid.uses_quorum());
        assert!(!PolicyKind::Specific.uses_quorum());
    }

    #[test]
    fn test_history_action_from_approval_action() {
        assert_eq!(
            HistoryAction::from(ApprovalAction::Approve),
            HistoryAction::Approved
        );
        assert_eq!(
            HistoryAction::from(ApprovalAction::Reject),
            HistoryAction::Rejected
        );
        assert_eq!(HistoryAction::parse("PENDING"), Some(HistoryAction::Pending));
    }

    #[test]
    fn test_user_role() {
        assert_eq!(UserRole::parse("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("owner"), None);
        assert_eq!(UserRole::Manager.as_str(), "manager");
    }

    #[test]
    fn test_decision_accessors() {
        let approved = Decision::Approved {
            step: 3,
            reason: DecisionReason::SequenceExhausted,
        };
        assert_eq!(approved.status(), ExpenseStatus::Approved);
        assert_eq!(approved.current_step(), 3);
        assert_eq!(approved.reason(), DecisionReason::SequenceExhausted);

        let in_review = Decision::InReview { next_step: 1 };
        assert_eq!(in_review.status(), ExpenseStatus::InReview);
        assert_eq!(in_review.current_step(), 1);
        assert_eq!(in_review.reason(), DecisionReason::Advanced);

        let rejected = Decision::Rejected { step: 2 };
        assert_eq!(rejected.status(), ExpenseStatus::Rejected);
        assert_eq!(rejected.current_step(), 2);
        assert_eq!(rejected.reason(), DecisionReason::Rejected);
    }
}
