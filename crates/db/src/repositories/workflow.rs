//! Expense workflow controller.
//!
//! Owns every change to an expense's `(status, current_approval_step)`.
//! Each action runs in one transaction: lock the expense row, rebuild the
//! roster, evaluate, append to the ledger, write the new state guarded by
//! compare-and-set, commit. Dropping the transaction before commit rolls
//! everything back.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use outlay_core::workflow::{
    ApprovalAction, ApprovalPolicy, Decision, DecisionReason, EvaluationInput, ExpenseStatus,
    HistoryAction, HistoryEntry, PolicyKind, RosterEntry, RosterSnapshot, RuleSnapshot, UserRole,
    WorkflowError, WorkflowEvaluator, build_roster, default_roster,
};
use outlay_shared::types::{ApprovalRuleId, CompanyId, ExpenseId, UserId};

use super::approval_history::{ApprovalLedger, NewHistoryEntry};
use super::approval_rule::ApprovalRuleRepository;
use super::expense::{ExpenseRecord, ExpenseStore, NewExpense};
use super::user::UserDirectory;
use crate::entities::users;

/// Input for submitting an expense.
#[derive(Debug, Clone)]
pub struct SubmitExpenseInput {
    /// Company the expense belongs to.
    pub company_id: CompanyId,
    /// Submitting user.
    pub submitted_by: UserId,
    /// Rule to evaluate against; `None` routes to the manager alone.
    pub approval_rule_id: Option<ApprovalRuleId>,
    /// Free-text description.
    pub description: String,
    /// Amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Result of recording an approval action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowOutcome {
    /// The expense acted upon.
    pub expense_id: ExpenseId,
    /// Status after the action.
    pub status: ExpenseStatus,
    /// Roster step after the action.
    pub current_step: i32,
    /// Who acts next, while in review.
    pub next_approver: Option<UserId>,
    /// Why the evaluator decided as it did.
    pub reason: DecisionReason,
    /// Approved share of the roster, for quorum policies.
    pub approval_percentage: Option<Decimal>,
    /// Ledger entry written for this action.
    pub history_entry_id: Uuid,
}

/// An open expense waiting on a given user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingExpense {
    /// The expense.
    pub expense: ExpenseRecord,
    /// Display name of the submitter.
    pub submitter_name: String,
    /// Number of positions on the expense's roster.
    pub roster_size: usize,
}

/// Current state of an expense with its resolved roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseView {
    /// The expense.
    pub expense: ExpenseRecord,
    /// Name of the approval rule, if any.
    pub rule_name: Option<String>,
    /// Policy in effect.
    pub policy_kind: PolicyKind,
    /// Roster as resolved now.
    pub roster: Vec<RosterEntry>,
    /// Occupant of the current step while the expense is open.
    pub next_approver: Option<UserId>,
    /// Approved ledger entries so far.
    pub approved_count: u64,
    /// Approved share of the roster, for quorum policies.
    pub approval_percentage: Option<Decimal>,
}

/// Roster and policy resolved for one expense.
struct ResolvedRoster {
    rule: Option<RuleSnapshot>,
    roster: RosterSnapshot,
    policy: ApprovalPolicy,
    manager: Option<UserId>,
}

/// Resolves rosters, memoising rules and users for the lifetime of one call.
#[derive(Default)]
struct RosterResolver {
    rules: HashMap<ApprovalRuleId, RuleSnapshot>,
    users: HashMap<UserId, users::Model>,
}

impl RosterResolver {
    async fn user<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        user_id: UserId,
    ) -> Result<&users::Model, WorkflowError> {
        if !self.users.contains_key(&user_id) {
            let user = UserDirectory::get(conn, user_id).await?;
            self.users.insert(user_id, user);
        }
        self.users
            .get(&user_id)
            .ok_or(WorkflowError::UserNotFound(user_id))
    }

    async fn rule<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        rule_id: ApprovalRuleId,
    ) -> Result<RuleSnapshot, WorkflowError> {
        if let Some(rule) = self.rules.get(&rule_id) {
            return Ok(rule.clone());
        }
        let rule = ApprovalRuleRepository::load_snapshot(conn, rule_id).await?;
        self.rules.insert(rule_id, rule.clone());
        Ok(rule)
    }

    async fn resolve<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        expense: &ExpenseRecord,
    ) -> Result<ResolvedRoster, WorkflowError> {
        let manager = self
            .user(conn, expense.submitted_by)
            .await?
            .manager_id
            .map(UserId::from_uuid);

        match expense.approval_rule_id {
            Some(rule_id) => {
                let rule = self.rule(conn, rule_id).await?;
                rule.validate()?;
                Ok(ResolvedRoster {
                    roster: build_roster(&rule, manager),
                    policy: rule.policy(),
                    rule: Some(rule),
                    manager,
                })
            }
            None => Ok(ResolvedRoster {
                rule: None,
                roster: default_roster(manager),
                policy: ApprovalPolicy::sequential(),
                manager,
            }),
        }
    }
}

/// Controller for expense submission and approval actions.
#[derive(Debug, Clone)]
pub struct ExpenseWorkflowController {
    db: DatabaseConnection,
}

impl ExpenseWorkflowController {
    /// Creates a new workflow controller.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Submits an expense for approval.
    ///
    /// The expense starts in Pending at step 0 and the ledger gets an
    /// anchor entry authored by the submitter.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The submitter is not a user of the company
    /// - The rule is missing, belongs to another company, is inactive or
    ///   is misconfigured
    /// - Database operation fails
    pub async fn submit(&self, input: SubmitExpenseInput) -> Result<ExpenseRecord, WorkflowError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        UserDirectory::get_in_company(&txn, input.company_id, input.submitted_by).await?;

        if let Some(rule_id) = input.approval_rule_id {
            let rule = ApprovalRuleRepository::load_snapshot(&txn, rule_id).await?;
            if rule.company_id != input.company_id {
                return Err(WorkflowError::RuleNotFound(rule_id));
            }
            if !rule.is_active {
                return Err(WorkflowError::Configuration(format!(
                    "approval rule {rule_id} is inactive"
                )));
            }
            rule.validate()?;
        }

        let submitted_by = input.submitted_by;
        let expense = ExpenseStore::insert(
            &txn,
            NewExpense {
                company_id: input.company_id,
                submitted_by,
                approval_rule_id: input.approval_rule_id,
                description: input.description,
                amount_cents: input.amount_cents,
                currency: input.currency,
            },
        )
        .await?;

        ApprovalLedger::append(
            &txn,
            NewHistoryEntry {
                expense_id: expense.id,
                approver_id: submitted_by,
                action: HistoryAction::Pending,
                comment: None,
                step_number: 0,
            },
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        info!(
            expense_id = %expense.id,
            submitted_by = %submitted_by,
            rule_id = ?expense.approval_rule_id.map(|id| id.to_string()),
            amount_cents = expense.amount_cents,
            currency = %expense.currency,
            "Expense submitted"
        );

        Ok(expense)
    }

    /// Records an approve or reject action by `actor_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The expense does not exist in the actor's company
    /// - The expense is already approved or rejected
    /// - The actor does not hold the current step (or, for a reject, any
    ///   step and is not an admin)
    /// - The rule cannot produce a decision
    /// - The expense changed concurrently (`StorageConflict`, retryable)
    /// - Database operation fails
    pub async fn record_action(
        &self,
        expense_id: ExpenseId,
        actor_id: UserId,
        action: ApprovalAction,
        comment: Option<String>,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let expense = ExpenseStore::lock(&txn, expense_id).await?;
        let actor = UserDirectory::get(&txn, actor_id).await?;
        if actor.company_id != expense.company_id.into_inner() {
            return Err(WorkflowError::ExpenseNotFound(expense_id));
        }

        let step = expense.current_approval_step;
        if let Err(err) = WorkflowEvaluator::ensure_open(expense.status, action) {
            warn!(
                expense_id = %expense_id,
                actor_id = %actor_id,
                status = %expense.status,
                action = %action,
                "Action on closed expense refused"
            );
            return Err(err);
        }

        let resolved = RosterResolver::default().resolve(&txn, &expense).await?;
        let actor_is_admin = UserRole::from(actor.role) == UserRole::Admin;
        if let Err(err) =
            WorkflowEvaluator::authorize(&resolved.roster, step, actor_id, action, actor_is_admin)
        {
            warn!(
                expense_id = %expense_id,
                actor_id = %actor_id,
                step,
                action = %action,
                error = %err,
                "Approval action refused"
            );
            return Err(err);
        }

        let approved_count = ApprovalLedger::count_approved(&txn, expense_id).await?;
        let decision = WorkflowEvaluator::evaluate(&EvaluationInput {
            status: expense.status,
            current_step: step,
            roster: &resolved.roster,
            policy: resolved.policy,
            approved_count,
            action,
        })?;

        let entry = ApprovalLedger::append(
            &txn,
            NewHistoryEntry {
                expense_id,
                approver_id: actor_id,
                action: action.into(),
                comment,
                step_number: step,
            },
        )
        .await?;

        ExpenseStore::compare_and_set(
            &txn,
            expense_id,
            (expense.status, step),
            (decision.status(), decision.current_step()),
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let next_approver = match decision {
            Decision::InReview { next_step } => {
                resolved.roster.occupant(next_step).map(|e| e.user_id)
            }
            Decision::Approved { .. } | Decision::Rejected { .. } => None,
        };
        let approval_percentage = (action == ApprovalAction::Approve
            && resolved.policy.kind.uses_quorum())
        .then(|| WorkflowEvaluator::approval_percentage(approved_count + 1, resolved.roster.len()));

        info!(
            expense_id = %expense_id,
            actor_id = %actor_id,
            from_status = %expense.status,
            status = %decision.status(),
            from_step = step,
            step = decision.current_step(),
            reason = ?decision.reason(),
            "Expense workflow advanced"
        );

        Ok(WorkflowOutcome {
            expense_id,
            status: decision.status(),
            current_step: decision.current_step(),
            next_approver,
            reason: decision.reason(),
            approval_percentage,
            history_entry_id: entry.id,
        })
    }

    /// Lists open expenses in the user's company that wait on the user.
    ///
    /// An expense waits on the user if the user is the submitter's manager
    /// and the expense is at step 0, or if the user occupies the roster
    /// position at the expense's current step.
    ///
    /// Expenses whose rule can no longer be evaluated are skipped.
    pub async fn pending_for(&self, user_id: UserId) -> Result<Vec<PendingExpense>, WorkflowError> {
        let user = UserDirectory::get(&self.db, user_id).await?;
        let company_id = CompanyId::from_uuid(user.company_id);
        let open = ExpenseStore::list_open(&self.db, company_id).await?;

        let mut resolver = RosterResolver::default();
        let mut pending = Vec::new();
        for expense in open {
            let resolved = match resolver.resolve(&self.db, &expense).await {
                Ok(resolved) => resolved,
                Err(WorkflowError::Configuration(reason)) => {
                    warn!(expense_id = %expense.id, %reason, "Skipping unevaluable expense");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let step = expense.current_approval_step;
            let awaiting_manager = step == 0 && resolved.manager == Some(user_id);
            let holds_step = resolved
                .roster
                .occupant(step)
                .is_some_and(|e| e.user_id == user_id);
            if !(awaiting_manager || holds_step) {
                continue;
            }

            let submitter_name = resolver
                .user(&self.db, expense.submitted_by)
                .await?
                .full_name
                .clone();
            pending.push(PendingExpense {
                roster_size: resolved.roster.len(),
                submitter_name,
                expense,
            });
        }

        Ok(pending)
    }

    /// Returns the ledger for an expense, oldest first.
    pub async fn history(
        &self,
        company_id: CompanyId,
        expense_id: ExpenseId,
    ) -> Result<Vec<HistoryEntry>, WorkflowError> {
        ExpenseStore::get(&self.db, company_id, expense_id).await?;
        ApprovalLedger::list(&self.db, expense_id).await
    }

    /// Returns the current state of an expense with its resolved roster.
    pub async fn snapshot(
        &self,
        company_id: CompanyId,
        expense_id: ExpenseId,
    ) -> Result<ExpenseView, WorkflowError> {
        let expense = ExpenseStore::get(&self.db, company_id, expense_id).await?;
        let resolved = RosterResolver::default().resolve(&self.db, &expense).await?;
        let approved_count = ApprovalLedger::count_approved(&self.db, expense_id).await?;

        let next_approver = if expense.status.is_open() {
            resolved
                .roster
                .occupant(expense.current_approval_step)
                .map(|e| e.user_id)
        } else {
            None
        };
        let approval_percentage = resolved.policy.kind.uses_quorum().then(|| {
            WorkflowEvaluator::approval_percentage(approved_count, resolved.roster.len())
        });

        Ok(ExpenseView {
            rule_name: resolved.rule.map(|r| r.name),
            policy_kind: resolved.policy.kind,
            roster: resolved.roster.entries().to_vec(),
            next_approver,
            approved_count,
            approval_percentage,
            expense,
        })
    }
}
