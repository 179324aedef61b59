//! Workflow evaluator for expense approval decisions.
//!
//! This module implements the pure decision function that turns an
//! incoming approve/reject action into the expense's next state. It
//! never touches storage; the caller supplies a consistent snapshot.

use rust_decimal::Decimal;

use outlay_shared::types::UserId;

use crate::workflow::error::WorkflowError;
use crate::workflow::roster::{ApprovalPolicy, RosterSnapshot};
use crate::workflow::types::{ApprovalAction, Decision, DecisionReason, ExpenseStatus};

/// Snapshot of everything one decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    /// Current expense status.
    pub status: ExpenseStatus,
    /// Current roster index.
    pub current_step: i32,
    /// Roster built for this decision.
    pub roster: &'a RosterSnapshot,
    /// Policy of the expense's rule.
    pub policy: ApprovalPolicy,
    /// Approved ledger entries recorded so far.
    pub approved_count: u64,
    /// The action being evaluated.
    pub action: ApprovalAction,
}

/// Stateless evaluator for approval decisions.
///
/// All methods are associated functions over explicit inputs.
pub struct WorkflowEvaluator;

impl WorkflowEvaluator {
    /// Evaluate an action against the current approval state.
    ///
    /// # Returns
    /// * `Ok(Decision::Rejected)` for a reject, step unchanged
    /// * `Ok(Decision::Approved)` when auto-approve, quorum or sequence
    ///   exhaustion resolves the expense
    /// * `Ok(Decision::InReview)` when more approvals are required
    /// * `Err(WorkflowError::InvalidTransition)` if the expense is terminal
    /// * `Err(WorkflowError::Configuration)` if the roster cannot decide
    pub fn evaluate(input: &EvaluationInput<'_>) -> Result<Decision, WorkflowError> {
        Self::ensure_open(input.status, input.action)?;

        match input.action {
            ApprovalAction::Reject => Ok(Decision::Rejected {
                step: input.current_step,
            }),
            ApprovalAction::Approve => Self::approve(input),
        }
    }

    fn approve(input: &EvaluationInput<'_>) -> Result<Decision, WorkflowError> {
        let roster_len = input.roster.len();
        if roster_len == 0 {
            return Err(WorkflowError::Configuration(
                "approval roster is empty".to_string(),
            ));
        }

        let step = input.current_step;
        let occupant = input
            .roster
            .occupant(step)
            .ok_or_else(|| out_of_roster(step, roster_len))?;

        if occupant.auto_approve {
            return Ok(Decision::Approved {
                step,
                reason: DecisionReason::AutoApproved,
            });
        }

        if input.policy.kind.uses_quorum() {
            let threshold = input.policy.threshold.ok_or_else(|| {
                WorkflowError::Configuration(format!(
                    "{} rule requires a percentage threshold",
                    input.policy.kind
                ))
            })?;
            if Self::quorum_reached(input.approved_count + 1, roster_len, threshold) {
                return Ok(Decision::Approved {
                    step,
                    reason: DecisionReason::QuorumReached,
                });
            }
        }

        let next_step = step + 1;
        let len = i32::try_from(roster_len).map_err(|_| {
            WorkflowError::Configuration(format!("roster of {roster_len} is too large"))
        })?;
        if next_step >= len {
            Ok(Decision::Approved {
                step: next_step,
                reason: DecisionReason::SequenceExhausted,
            })
        } else {
            Ok(Decision::InReview { next_step })
        }
    }

    /// Fails with `InvalidTransition` if the expense is terminal.
    pub fn ensure_open(status: ExpenseStatus, action: ApprovalAction) -> Result<(), WorkflowError> {
        if status.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                from: status,
                action,
            });
        }
        Ok(())
    }

    /// Check the actor may take `action` at `step`.
    ///
    /// Approving requires occupying the current step. Rejecting requires a
    /// position anywhere on the roster, or the company admin role.
    ///
    /// # Returns
    /// * `Ok(())` if the actor is entitled
    /// * `Err(WorkflowError::NotCurrentApprover)` otherwise
    /// * `Err(WorkflowError::Configuration)` if the roster has no such step
    pub fn authorize(
        roster: &RosterSnapshot,
        step: i32,
        actor: UserId,
        action: ApprovalAction,
        actor_is_admin: bool,
    ) -> Result<(), WorkflowError> {
        let not_current = || WorkflowError::NotCurrentApprover {
            user_id: actor,
            step,
        };

        match action {
            ApprovalAction::Approve => {
                if roster.is_empty() {
                    return Err(WorkflowError::Configuration(
                        "approval roster is empty".to_string(),
                    ));
                }
                let occupant = roster
                    .occupant(step)
                    .ok_or_else(|| out_of_roster(step, roster.len()))?;
                if occupant.user_id == actor {
                    Ok(())
                } else {
                    Err(not_current())
                }
            }
            ApprovalAction::Reject => {
                if actor_is_admin || roster.contains(actor) {
                    Ok(())
                } else {
                    Err(not_current())
                }
            }
        }
    }

    /// Returns true if `approved` of `roster_len` meets `threshold` percent.
    ///
    /// Exact integer comparison of `approved / roster_len * 100 >= threshold`.
    #[must_use]
    pub fn quorum_reached(approved: u64, roster_len: usize, threshold: i32) -> bool {
        if roster_len == 0 {
            return false;
        }
        let Ok(threshold) = u128::try_from(threshold) else {
            return true;
        };
        let len = roster_len as u128;
        u128::from(approved) * 100 >= threshold * len
    }

    /// Approved share of the roster in percent, rounded to two places.
    #[must_use]
    pub fn approval_percentage(approved: u64, roster_len: usize) -> Decimal {
        if roster_len == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(approved) * Decimal::ONE_HUNDRED / Decimal::from(roster_len)).round_dp(2)
    }
}

fn out_of_roster(step: i32, roster_len: usize) -> WorkflowError {
    WorkflowError::Configuration(format!(
        "approval step {step} is outside the roster of {roster_len}"
    ))
}
