//! String-backed enums shared by several tables.
//!
//! Each enum converts to and from its `outlay-core` counterpart so that
//! repositories never hand raw strings to the workflow logic.

use outlay_core::workflow;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum UserRole {
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "employee")]
    Employee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum PolicyKind {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "specific")]
    Specific,
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ExpenseStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_review")]
    InReview,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum HistoryAction {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl From<UserRole> for workflow::UserRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self::Admin,
            UserRole::Manager => Self::Manager,
            UserRole::Employee => Self::Employee,
        }
    }
}

impl From<workflow::UserRole> for UserRole {
    fn from(role: workflow::UserRole) -> Self {
        match role {
            workflow::UserRole::Admin => Self::Admin,
            workflow::UserRole::Manager => Self::Manager,
            workflow::UserRole::Employee => Self::Employee,
        }
    }
}

impl From<PolicyKind> for workflow::PolicyKind {
    fn from(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Percentage => Self::Percentage,
            PolicyKind::Specific => Self::Specific,
            PolicyKind::Hybrid => Self::Hybrid,
        }
    }
}

impl From<workflow::PolicyKind> for PolicyKind {
    fn from(kind: workflow::PolicyKind) -> Self {
        match kind {
            workflow::PolicyKind::Percentage => Self::Percentage,
            workflow::PolicyKind::Specific => Self::Specific,
            workflow::PolicyKind::Hybrid => Self::Hybrid,
        }
    }
}

impl From<ExpenseStatus> for workflow::ExpenseStatus {
    fn from(status: ExpenseStatus) -> Self {
        match status {
            ExpenseStatus::Pending => Self::Pending,
            ExpenseStatus::InReview => Self::InReview,
            ExpenseStatus::Approved => Self::Approved,
            ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<workflow::ExpenseStatus> for ExpenseStatus {
    fn from(status: workflow::ExpenseStatus) -> Self {
        match status {
            workflow::ExpenseStatus::Pending => Self::Pending,
            workflow::ExpenseStatus::InReview => Self::InReview,
            workflow::ExpenseStatus::Approved => Self::Approved,
            workflow::ExpenseStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<HistoryAction> for workflow::HistoryAction {
    fn from(action: HistoryAction) -> Self {
        match action {
            HistoryAction::Pending => Self::Pending,
            HistoryAction::Approved => Self::Approved,
            HistoryAction::Rejected => Self::Rejected,
        }
    }
}

impl From<workflow::HistoryAction> for HistoryAction {
    fn from(action: workflow::HistoryAction) -> Self {
        match action {
            workflow::HistoryAction::Pending => Self::Pending,
            workflow::HistoryAction::Approved => Self::Approved,
            workflow::HistoryAction::Rejected => Self::Rejected,
        }
    }
}
