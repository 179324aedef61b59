//! Expense store.
//!
//! Reads and writes the expense row. Status changes go through
//! [`ExpenseStore::compare_and_set`] so a write only lands on the state
//! it was decided against.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;

use outlay_core::workflow::{ExpenseStatus, WorkflowError};
use outlay_shared::types::{ApprovalRuleId, CompanyId, ExpenseId, UserId};

use crate::entities::{expenses, sea_orm_active_enums};

/// Fields of a newly submitted expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Owning company.
    pub company_id: CompanyId,
    /// Submitting user.
    pub submitted_by: UserId,
    /// Rule to evaluate against, if any.
    pub approval_rule_id: Option<ApprovalRuleId>,
    /// Free-text description.
    pub description: String,
    /// Amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Domain view of an expense row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseRecord {
    /// Expense ID.
    pub id: ExpenseId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Submitting user.
    pub submitted_by: UserId,
    /// Rule the expense is evaluated against.
    pub approval_rule_id: Option<ApprovalRuleId>,
    /// Free-text description.
    pub description: String,
    /// Amount in minor units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Workflow status.
    pub status: ExpenseStatus,
    /// Index into the approval roster.
    pub current_approval_step: i32,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

impl From<expenses::Model> for ExpenseRecord {
    fn from(model: expenses::Model) -> Self {
        Self {
            id: ExpenseId::from_uuid(model.id),
            company_id: CompanyId::from_uuid(model.company_id),
            submitted_by: UserId::from_uuid(model.submitted_by),
            approval_rule_id: model.approval_rule_id.map(ApprovalRuleId::from_uuid),
            description: model.description,
            amount_cents: model.amount_cents,
            currency: model.currency,
            status: model.status.into(),
            current_approval_step: model.current_approval_step,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Expense row access.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseStore;

impl ExpenseStore {
    /// Inserts a new expense in Pending at step 0.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        input: NewExpense,
    ) -> Result<ExpenseRecord, WorkflowError> {
        let now = Utc::now().into();
        let model = expenses::ActiveModel {
            id: Set(ExpenseId::new().into_inner()),
            company_id: Set(input.company_id.into_inner()),
            submitted_by: Set(input.submitted_by.into_inner()),
            approval_rule_id: Set(input.approval_rule_id.map(ApprovalRuleId::into_inner)),
            description: Set(input.description),
            amount_cents: Set(input.amount_cents),
            currency: Set(input.currency),
            status: Set(sea_orm_active_enums::ExpenseStatus::Pending),
            current_approval_step: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(model.into())
    }

    /// Reads an expense and takes its row lock.
    ///
    /// Emits `SELECT ... FOR UPDATE` where the backend supports row locks.
    /// The lock is held until `conn`'s transaction ends.
    pub async fn lock<C: ConnectionTrait>(
        conn: &C,
        expense_id: ExpenseId,
    ) -> Result<ExpenseRecord, WorkflowError> {
        expenses::Entity::find_by_id(expense_id.into_inner())
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .map(ExpenseRecord::from)
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))
    }

    /// Reads an expense visible to `company_id`.
    ///
    /// Expenses of other companies are reported as not found.
    pub async fn get<C: ConnectionTrait>(
        conn: &C,
        company_id: CompanyId,
        expense_id: ExpenseId,
    ) -> Result<ExpenseRecord, WorkflowError> {
        expenses::Entity::find_by_id(expense_id.into_inner())
            .filter(expenses::Column::CompanyId.eq(company_id.into_inner()))
            .one(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .map(ExpenseRecord::from)
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))
    }

    /// Lists the company's expenses still awaiting a decision, oldest first.
    pub async fn list_open<C: ConnectionTrait>(
        conn: &C,
        company_id: CompanyId,
    ) -> Result<Vec<ExpenseRecord>, WorkflowError> {
        let rows = expenses::Entity::find()
            .filter(expenses::Column::CompanyId.eq(company_id.into_inner()))
            .filter(expenses::Column::Status.is_in([
                sea_orm_active_enums::ExpenseStatus::Pending,
                sea_orm_active_enums::ExpenseStatus::InReview,
            ]))
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id)
            .all(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(ExpenseRecord::from).collect())
    }

    /// Writes a new `(status, step)` pair if the row still holds `expected`.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::StorageConflict` if the row changed since it
    /// was read.
    pub async fn compare_and_set<C: ConnectionTrait>(
        conn: &C,
        expense_id: ExpenseId,
        expected: (ExpenseStatus, i32),
        next: (ExpenseStatus, i32),
    ) -> Result<(), WorkflowError> {
        let (expected_status, expected_step) = expected;
        let (next_status, next_step) = next;
        let expected_status: sea_orm_active_enums::ExpenseStatus = expected_status.into();

        let result = expenses::Entity::update_many()
            .set(expenses::ActiveModel {
                status: Set(next_status.into()),
                current_approval_step: Set(next_step),
                updated_at: Set(Utc::now().into()),
                ..Default::default()
            })
            .filter(expenses::Column::Id.eq(expense_id.into_inner()))
            .filter(expenses::Column::Status.eq(expected_status))
            .filter(expenses::Column::CurrentApprovalStep.eq(expected_step))
            .exec(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(WorkflowError::StorageConflict(format!(
                "expense {expense_id} is no longer {} at step {expected_step}",
                ExpenseStatus::from(expected_status)
            )));
        }
        Ok(())
    }
}
