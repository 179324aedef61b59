//! Concurrency tests for the expense workflow controller.

mod common;

use std::time::Duration;

use futures::future::join_all;
use sea_orm::{DatabaseConnection, TransactionTrait};

use outlay_core::workflow::{
    ApprovalAction, ExpenseStatus, HistoryAction, PolicyKind, WorkflowError,
};
use outlay_db::ExpenseStore;
use outlay_db::entities::sea_orm_active_enums::UserRole;
use outlay_db::repositories::{
    ApprovalRuleRepository, ApproverInput, CreateApprovalRuleInput, ExpenseWorkflowController,
    SubmitExpenseInput,
};
use outlay_shared::types::{ApprovalRuleId, CompanyId, UserId};

use common::{create_company, create_user, setup_db, setup_postgres};

fn expense_input(
    company_id: CompanyId,
    submitted_by: UserId,
    rule_id: ApprovalRuleId,
) -> SubmitExpenseInput {
    SubmitExpenseInput {
        company_id,
        submitted_by,
        approval_rule_id: Some(rule_id),
        description: "Conference ticket".to_string(),
        amount_cents: 49_900,
        currency: "EUR".to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_transition_once() {
    let db = setup_db().await;
    let company = create_company(&db, "Acme").await;
    let employee = create_user(&db, company, "Employee", UserRole::Employee, None).await;
    let alice = create_user(&db, company, "Alice", UserRole::Manager, None).await;

    let rule = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            company,
            CreateApprovalRuleInput {
                name: "Single".to_string(),
                kind: PolicyKind::Specific,
                percentage_threshold: None,
                requires_manager_approval: false,
                approvers: vec![ApproverInput {
                    user_id: alice,
                    sequence_order: 1,
                    auto_approve: false,
                }],
            },
        )
        .await
        .expect("Failed to create rule");

    let controller = ExpenseWorkflowController::new(db.clone());
    let expense = controller
        .submit(expense_input(company, employee, rule.id))
        .await
        .expect("Failed to submit expense");

    let expense_id = expense.id;
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .record_action(expense_id, alice, ApprovalAction::Approve, None)
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("Task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one approval must win: {results:?}");
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                result,
                WorkflowError::InvalidTransition { .. } | WorkflowError::StorageConflict(_)
            ),
            "unexpected error: {result:?}"
        );
    }

    let history = controller
        .history(company, expense.id)
        .await
        .expect("Failed to load history");
    let approvals = history
        .iter()
        .filter(|h| h.action == HistoryAction::Approved)
        .count();
    assert_eq!(approvals, 1);

    let stored = ExpenseStore::get(&db, company, expense.id)
        .await
        .expect("Failed to load expense");
    assert_eq!(stored.status, ExpenseStatus::Approved);
    assert_eq!(stored.current_approval_step, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_actions_on_different_expenses() {
    let db = setup_db().await;
    let company = create_company(&db, "Acme").await;
    let manager = create_user(&db, company, "Manager", UserRole::Manager, None).await;
    let employee = create_user(&db, company, "Employee", UserRole::Employee, Some(manager)).await;

    let rule = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            company,
            CreateApprovalRuleInput {
                name: "Manager only".to_string(),
                kind: PolicyKind::Specific,
                percentage_threshold: None,
                requires_manager_approval: true,
                approvers: Vec::new(),
            },
        )
        .await
        .expect("Failed to create rule");

    let controller = ExpenseWorkflowController::new(db.clone());
    let mut expense_ids = Vec::new();
    for _ in 0..5 {
        let expense = controller
            .submit(expense_input(company, employee, rule.id))
            .await
            .expect("Failed to submit expense");
        expense_ids.push(expense.id);
    }

    let outcomes = join_all(expense_ids.iter().map(|&id| {
        let controller = controller.clone();
        async move {
            controller
                .record_action(id, manager, ApprovalAction::Approve, None)
                .await
        }
    }))
    .await;

    for outcome in outcomes {
        let outcome = outcome.expect("Approval failed");
        assert_eq!(outcome.status, ExpenseStatus::Approved);
    }
    assert!(
        controller
            .pending_for(manager)
            .await
            .expect("Failed to list pending")
            .is_empty()
    );
}

#[tokio::test]
async fn test_compare_and_set_detects_stale_state() {
    let db = setup_db().await;
    let company = create_company(&db, "Acme").await;
    let manager = create_user(&db, company, "Manager", UserRole::Manager, None).await;
    let employee = create_user(&db, company, "Employee", UserRole::Employee, Some(manager)).await;

    let rule = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            company,
            CreateApprovalRuleInput {
                name: "Manager only".to_string(),
                kind: PolicyKind::Specific,
                percentage_threshold: None,
                requires_manager_approval: true,
                approvers: Vec::new(),
            },
        )
        .await
        .expect("Failed to create rule");
    let expense = ExpenseWorkflowController::new(db.clone())
        .submit(expense_input(company, employee, rule.id))
        .await
        .expect("Failed to submit expense");

    ExpenseStore::compare_and_set(
        &db,
        expense.id,
        (ExpenseStatus::Pending, 0),
        (ExpenseStatus::InReview, 1),
    )
    .await
    .expect("First write should land");

    let stale = ExpenseStore::compare_and_set(
        &db,
        expense.id,
        (ExpenseStatus::Pending, 0),
        (ExpenseStatus::Approved, 1),
    )
    .await;
    assert!(matches!(stale, Err(WorkflowError::StorageConflict(_))));
    assert!(stale.is_err_and(|e| e.is_retryable()));

    let stored = ExpenseStore::get(&db, company, expense.id)
        .await
        .expect("Failed to load expense");
    assert_eq!(stored.status, ExpenseStatus::InReview);
}

// ============================================================================
// Postgres row locks (run when DATABASE_URL points at Postgres)
// ============================================================================

async fn manager_only_rule(db: &DatabaseConnection, company: CompanyId) -> ApprovalRuleId {
    ApprovalRuleRepository::new(db.clone())
        .create_rule(
            company,
            CreateApprovalRuleInput {
                name: "Manager only".to_string(),
                kind: PolicyKind::Specific,
                percentage_threshold: None,
                requires_manager_approval: true,
                approvers: Vec::new(),
            },
        )
        .await
        .expect("Failed to create rule")
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_postgres_same_step_race_advances_once() {
    let Some(db) = setup_postgres().await else {
        eprintln!("DATABASE_URL not set, skipping Postgres race test");
        return;
    };
    let company = create_company(&db, "Race Co").await;
    let employee = create_user(&db, company, "Employee", UserRole::Employee, None).await;
    let alice = create_user(&db, company, "Alice", UserRole::Manager, None).await;
    let bob = create_user(&db, company, "Bob", UserRole::Manager, None).await;

    let rule = ApprovalRuleRepository::new(db.clone())
        .create_rule(
            company,
            CreateApprovalRuleInput {
                name: "Two step".to_string(),
                kind: PolicyKind::Specific,
                percentage_threshold: None,
                requires_manager_approval: false,
                approvers: vec![
                    ApproverInput {
                        user_id: alice,
                        sequence_order: 1,
                        auto_approve: false,
                    },
                    ApproverInput {
                        user_id: bob,
                        sequence_order: 2,
                        auto_approve: false,
                    },
                ],
            },
        )
        .await
        .expect("Failed to create rule");
    let controller = ExpenseWorkflowController::new(db.clone());

    for round in 0..10 {
        let expense_id = controller
            .submit(expense_input(company, employee, rule.id))
            .await
            .expect("Failed to submit expense")
            .id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let controller = controller.clone();
                tokio::spawn(async move {
                    controller
                        .record_action(expense_id, alice, ApprovalAction::Approve, None)
                        .await
                })
            })
            .collect();
        let results: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.expect("Task panicked"))
            .collect();

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "round {round}: {results:?}");
        assert_eq!(winners[0].status, ExpenseStatus::InReview);
        assert_eq!(winners[0].current_step, 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    err,
                    WorkflowError::NotCurrentApprover { step: 1, .. }
                        | WorkflowError::StorageConflict(_)
                ),
                "round {round}: unexpected error {err:?}"
            );
        }

        let approvals = controller
            .history(company, expense_id)
            .await
            .expect("Failed to load history")
            .iter()
            .filter(|h| h.action == HistoryAction::Approved)
            .count();
        assert_eq!(approvals, 1, "round {round}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_row_lock_blocks_only_its_expense() {
    let Some(db) = setup_postgres().await else {
        eprintln!("DATABASE_URL not set, skipping Postgres row-lock test");
        return;
    };
    let company = create_company(&db, "Lock Co").await;
    let manager = create_user(&db, company, "Manager", UserRole::Manager, None).await;
    let employee = create_user(&db, company, "Employee", UserRole::Employee, Some(manager)).await;
    let rule_id = manager_only_rule(&db, company).await;

    let controller = ExpenseWorkflowController::new(db.clone());
    let held = controller
        .submit(expense_input(company, employee, rule_id))
        .await
        .expect("Failed to submit expense")
        .id;
    let free = controller
        .submit(expense_input(company, employee, rule_id))
        .await
        .expect("Failed to submit expense")
        .id;

    let txn = db.begin().await.expect("Failed to begin");
    ExpenseStore::lock(&txn, held)
        .await
        .expect("Failed to lock expense");

    let other = tokio::time::timeout(
        Duration::from_secs(5),
        controller.record_action(free, manager, ApprovalAction::Approve, None),
    )
    .await
    .expect("Unrelated expense must not wait on the lock")
    .expect("Approval failed");
    assert_eq!(other.status, ExpenseStatus::Approved);

    let blocked = tokio::time::timeout(
        Duration::from_millis(300),
        controller.record_action(held, manager, ApprovalAction::Approve, None),
    )
    .await;
    assert!(blocked.is_err(), "locked expense must wait: {blocked:?}");

    txn.rollback().await.expect("Failed to roll back");

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        controller.record_action(held, manager, ApprovalAction::Approve, None),
    )
    .await
    .expect("Lock should be released")
    .expect("Approval failed");
    assert_eq!(outcome.status, ExpenseStatus::Approved);

    let stored = ExpenseStore::get(&db, company, held)
        .await
        .expect("Failed to load expense");
    assert_eq!(stored.status, ExpenseStatus::Approved);
}
