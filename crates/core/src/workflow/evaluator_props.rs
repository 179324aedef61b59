//! Property-based tests for WorkflowEvaluator.
//!
//! These tests drive whole approval sequences through the evaluator and
//! check resolution points, step monotonicity and terminal sealing.

use proptest::prelude::*;

use outlay_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::workflow::evaluator::{EvaluationInput, WorkflowEvaluator};
use crate::workflow::roster::{ApprovalPolicy, ApproverEntry, RosterSnapshot, RuleSnapshot, build_roster};
use crate::workflow::types::{ApprovalAction, Decision, DecisionReason, ExpenseStatus, PolicyKind};

fn roster_with(len: usize, auto_at: Option<usize>) -> RosterSnapshot {
    let rule = RuleSnapshot {
        id: ApprovalRuleId::new(),
        company_id: CompanyId::new(),
        name: "Props".to_string(),
        kind: PolicyKind::Specific,
        percentage_threshold: None,
        requires_manager_approval: false,
        is_active: true,
        approvers: (0..len)
            .zip(1..)
            .map(|(i, sequence_order)| ApproverEntry {
                user_id: UserId::new(),
                sequence_order,
                auto_approve: auto_at == Some(i),
            })
            .collect(),
    };
    build_roster(&rule, None)
}

/// Approves step by step until the evaluator resolves.
/// Returns the final decision and how many approvals it took.
fn run_approvals(roster: &RosterSnapshot, policy: ApprovalPolicy) -> (Decision, u64) {
    let mut status = ExpenseStatus::Pending;
    let mut step = 0;
    let mut approved = 0u64;
    loop {
        let decision = WorkflowEvaluator::evaluate(&EvaluationInput {
            status,
            current_step: step,
            roster,
            policy,
            approved_count: approved,
            action: ApprovalAction::Approve,
        })
        .expect("open expense with a valid roster always decides");
        approved += 1;
        assert!(decision.current_step() >= step, "step must never decrease");
        match decision {
            Decision::InReview { next_step } => {
                assert_eq!(next_step, step + 1);
                status = ExpenseStatus::InReview;
                step = next_step;
            }
            other => return (other, approved),
        }
    }
}

fn arb_status_open() -> impl Strategy<Value = ExpenseStatus> {
    prop_oneof![Just(ExpenseStatus::Pending), Just(ExpenseStatus::InReview)]
}

fn arb_kind() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::Percentage),
        Just(PolicyKind::Specific),
        Just(PolicyKind::Hybrid),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Specific policy: exactly n approvals, ending at step n.
    #[test]
    fn prop_specific_needs_every_approver(n in 1usize..12) {
        let roster = roster_with(n, None);
        let (decision, approvals) = run_approvals(&roster, ApprovalPolicy::sequential());

        prop_assert_eq!(approvals, n as u64);
        prop_assert_eq!(
            decision,
            Decision::Approved {
                step: i32::try_from(n).unwrap(),
                reason: DecisionReason::SequenceExhausted
            }
        );
    }

    /// Percentage policy resolves on approval ceil(T*n/100), never earlier.
    #[test]
    fn prop_percentage_resolves_at_ceiling(n in 1usize..12, threshold in 1i32..=100) {
        let roster = roster_with(n, None);
        let policy = ApprovalPolicy { kind: PolicyKind::Percentage, threshold: Some(threshold) };
        let (decision, approvals) = run_approvals(&roster, policy);

        let required = (u64::try_from(threshold).unwrap() * n as u64).div_ceil(100);
        prop_assert_eq!(approvals, required);
        prop_assert_eq!(decision.status(), ExpenseStatus::Approved);
        prop_assert_eq!(decision.reason(), DecisionReason::QuorumReached);
    }

    /// An auto-approve occupant resolves the expense on a single approval.
    #[test]
    fn prop_auto_approve_resolves_immediately(
        n in 1usize..8,
        auto_idx in 0usize..8,
        kind in arb_kind(),
        threshold in 1i32..=100,
    ) {
        let auto_idx = auto_idx % n;
        let roster = roster_with(n, Some(auto_idx));
        let step = i32::try_from(auto_idx).unwrap();
        let decision = WorkflowEvaluator::evaluate(&EvaluationInput {
            status: ExpenseStatus::InReview,
            current_step: step,
            roster: &roster,
            policy: ApprovalPolicy { kind, threshold: Some(threshold) },
            approved_count: auto_idx as u64,
            action: ApprovalAction::Approve,
        })
        .unwrap();

        prop_assert_eq!(decision, Decision::Approved { step, reason: DecisionReason::AutoApproved });
    }

    /// Reject from any open state lands in Rejected with the step unchanged.
    #[test]
    fn prop_reject_is_unconditional(
        n in 0usize..8,
        step in 0i32..8,
        status in arb_status_open(),
        kind in arb_kind(),
        approved in 0u64..8,
    ) {
        let roster = roster_with(n, None);
        let decision = WorkflowEvaluator::evaluate(&EvaluationInput {
            status,
            current_step: step,
            roster: &roster,
            policy: ApprovalPolicy { kind, threshold: Some(50) },
            approved_count: approved,
            action: ApprovalAction::Reject,
        })
        .unwrap();

        prop_assert_eq!(decision, Decision::Rejected { step });
    }

    /// Terminal expenses accept nothing.
    #[test]
    fn prop_terminal_is_sealed(
        approved_status in any::<bool>(),
        approve in any::<bool>(),
        n in 1usize..5,
    ) {
        let roster = roster_with(n, None);
        let status = if approved_status { ExpenseStatus::Approved } else { ExpenseStatus::Rejected };
        let action = if approve { ApprovalAction::Approve } else { ApprovalAction::Reject };
        let result = WorkflowEvaluator::evaluate(&EvaluationInput {
            status,
            current_step: 0,
            roster: &roster,
            policy: ApprovalPolicy::sequential(),
            approved_count: 0,
            action,
        });

        let is_invalid_transition = matches!(
            result,
            Err(crate::workflow::WorkflowError::InvalidTransition { .. })
        );
        prop_assert!(is_invalid_transition);
    }

    /// The integer quorum check agrees with the displayed percentage.
    #[test]
    fn prop_quorum_matches_percentage(approved in 0u64..50, n in 1usize..50, threshold in 1i32..=100) {
        let reached = WorkflowEvaluator::quorum_reached(approved, n, threshold);
        let exact = rust_decimal::Decimal::from(approved) * rust_decimal::Decimal::ONE_HUNDRED
            / rust_decimal::Decimal::from(n);
        prop_assert_eq!(reached, exact >= rust_decimal::Decimal::from(threshold));
    }
}
