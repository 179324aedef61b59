//! Approval ledger.
//!
//! Append-only record of every action on an expense. The number of
//! approved entries is the quorum numerator.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use outlay_core::workflow::{HistoryAction, HistoryEntry, WorkflowError};
use outlay_shared::types::{ExpenseId, UserId};

use crate::entities::{approval_history, sea_orm_active_enums};

/// Entry to append to the ledger.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    /// The expense acted upon.
    pub expense_id: ExpenseId,
    /// The acting user.
    pub approver_id: UserId,
    /// What happened.
    pub action: HistoryAction,
    /// Optional comment.
    pub comment: Option<String>,
    /// Step the action was taken at.
    pub step_number: i32,
}

/// Ledger access. There is no update or delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApprovalLedger;

impl ApprovalLedger {
    /// Appends an entry and returns it.
    pub async fn append<C: ConnectionTrait>(
        conn: &C,
        entry: NewHistoryEntry,
    ) -> Result<HistoryEntry, WorkflowError> {
        let model = approval_history::ActiveModel {
            id: Set(Uuid::now_v7()),
            expense_id: Set(entry.expense_id.into_inner()),
            approver_id: Set(entry.approver_id.into_inner()),
            action: Set(entry.action.into()),
            comment: Set(entry.comment),
            step_number: Set(entry.step_number),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
        .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(to_entry(model))
    }

    /// Counts approved entries for an expense.
    pub async fn count_approved<C: ConnectionTrait>(
        conn: &C,
        expense_id: ExpenseId,
    ) -> Result<u64, WorkflowError> {
        approval_history::Entity::find()
            .filter(approval_history::Column::ExpenseId.eq(expense_id.into_inner()))
            .filter(approval_history::Column::Action.eq(sea_orm_active_enums::HistoryAction::Approved))
            .count(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))
    }

    /// Lists all entries for an expense in the order they were written.
    pub async fn list<C: ConnectionTrait>(
        conn: &C,
        expense_id: ExpenseId,
    ) -> Result<Vec<HistoryEntry>, WorkflowError> {
        let rows = approval_history::Entity::find()
            .filter(approval_history::Column::ExpenseId.eq(expense_id.into_inner()))
            .order_by_asc(approval_history::Column::CreatedAt)
            .order_by_asc(approval_history::Column::Id)
            .all(conn)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(to_entry).collect())
    }
}

fn to_entry(model: approval_history::Model) -> HistoryEntry {
    HistoryEntry {
        id: model.id,
        expense_id: ExpenseId::from_uuid(model.expense_id),
        approver_id: UserId::from_uuid(model.approver_id),
        action: model.action.into(),
        comment: model.comment,
        step_number: model.step_number,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
