//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Stores used inside the workflow controller's transaction take the
//! connection as an argument so they run on whatever `ConnectionTrait`
//! the caller holds.

pub mod approval_history;
pub mod approval_rule;
pub mod expense;
pub mod user;
pub mod workflow;

pub use approval_history::{ApprovalLedger, NewHistoryEntry};
pub use approval_rule::{
    ApprovalRuleError, ApprovalRuleRepository, ApproverInput, CreateApprovalRuleInput,
};
pub use expense::{ExpenseRecord, ExpenseStore, NewExpense};
pub use user::UserDirectory;
pub use workflow::{
    ExpenseView, ExpenseWorkflowController, PendingExpense, SubmitExpenseInput, WorkflowOutcome,
};
