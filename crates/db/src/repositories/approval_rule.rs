//! Approval Rule Repository
//!
//! Stores approval rules with their ordered approvers and serves the
//! rule snapshots the workflow controller evaluates.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use outlay_core::workflow::{
    ApproverEntry, PolicyKind, RuleSnapshot, WorkflowError, validate_rule_shape,
};
use outlay_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::entities::{
    approval_rule_approvers, approval_rules, sea_orm_active_enums::UserRole, users,
};

/// Errors that can occur during approval rule operations.
#[derive(Debug, Error)]
pub enum ApprovalRuleError {
    /// Approval rule not found.
    #[error("Approval rule {0} not found")]
    NotFound(ApprovalRuleId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The rule's policy or approver positions are invalid.
    #[error("Invalid approval rule: {0}")]
    InvalidRule(String),

    /// An approver is not a user of the rule's company.
    #[error("Approver {0} is not a member of this company")]
    UnknownApprover(UserId),
}

impl From<ApprovalRuleError> for WorkflowError {
    fn from(err: ApprovalRuleError) -> Self {
        match err {
            ApprovalRuleError::NotFound(id) => Self::RuleNotFound(id),
            ApprovalRuleError::Database(e) => Self::Database(e.to_string()),
            ApprovalRuleError::InvalidRule(msg) => Self::Configuration(msg),
            ApprovalRuleError::UnknownApprover(user_id) => Self::UserNotFound(user_id),
        }
    }
}

/// One approver on a new rule.
#[derive(Debug, Clone)]
pub struct ApproverInput {
    /// The approving user.
    pub user_id: UserId,
    /// 1-based position, unique within the rule.
    pub sequence_order: i32,
    /// Approval by this user resolves the expense immediately.
    pub auto_approve: bool,
}

/// Input for creating or replacing an approval rule.
#[derive(Debug, Clone)]
pub struct CreateApprovalRuleInput {
    /// Name of the approval rule.
    pub name: String,
    /// Policy kind.
    pub kind: PolicyKind,
    /// Percentage threshold; required for percentage and hybrid rules.
    pub percentage_threshold: Option<i32>,
    /// Whether the submitter's manager approves first.
    pub requires_manager_approval: bool,
    /// Designated approvers.
    pub approvers: Vec<ApproverInput>,
}

/// Repository for approval rule operations.
#[derive(Debug, Clone)]
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new ApprovalRuleRepository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new approval rule with its approvers.
    ///
    /// Specific rules store no threshold.
    pub async fn create_rule(
        &self,
        company_id: CompanyId,
        input: CreateApprovalRuleInput,
    ) -> Result<RuleSnapshot, ApprovalRuleError> {
        let threshold = validated_threshold(&input)?;

        let txn = self.db.begin().await?;
        check_approvers(&txn, company_id, &input.approvers).await?;

        let rule_id = ApprovalRuleId::new();
        let now = Utc::now().into();
        approval_rules::ActiveModel {
            id: Set(rule_id.into_inner()),
            company_id: Set(company_id.into_inner()),
            name: Set(input.name),
            kind: Set(input.kind.into()),
            percentage_threshold: Set(threshold),
            requires_manager_approval: Set(input.requires_manager_approval),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        insert_approvers(&txn, rule_id, &input.approvers).await?;

        let snapshot = Self::load_snapshot(&txn, rule_id).await?;
        txn.commit().await?;

        tracing::info!(
            rule_id = %rule_id,
            company_id = %company_id,
            kind = %snapshot.kind,
            approvers = snapshot.approvers.len(),
            "Approval rule created"
        );

        Ok(snapshot)
    }

    /// Replaces a rule's policy and approver list.
    ///
    /// The approvers are swapped in the same transaction as the policy
    /// columns. Open expenses pick the new roster up on their next action.
    pub async fn update_rule(
        &self,
        company_id: CompanyId,
        rule_id: ApprovalRuleId,
        input: CreateApprovalRuleInput,
    ) -> Result<RuleSnapshot, ApprovalRuleError> {
        let threshold = validated_threshold(&input)?;

        let txn = self.db.begin().await?;
        let existing = approval_rules::Entity::find_by_id(rule_id.into_inner())
            .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
            .one(&txn)
            .await?
            .ok_or(ApprovalRuleError::NotFound(rule_id))?;
        check_approvers(&txn, company_id, &input.approvers).await?;

        let mut rule: approval_rules::ActiveModel = existing.into();
        rule.name = Set(input.name);
        rule.kind = Set(input.kind.into());
        rule.percentage_threshold = Set(threshold);
        rule.requires_manager_approval = Set(input.requires_manager_approval);
        rule.updated_at = Set(Utc::now().into());
        rule.update(&txn).await?;

        approval_rule_approvers::Entity::delete_many()
            .filter(approval_rule_approvers::Column::RuleId.eq(rule_id.into_inner()))
            .exec(&txn)
            .await?;
        insert_approvers(&txn, rule_id, &input.approvers).await?;

        let snapshot = Self::load_snapshot(&txn, rule_id).await?;
        txn.commit().await?;

        tracing::info!(
            rule_id = %rule_id,
            kind = %snapshot.kind,
            approvers = snapshot.approvers.len(),
            "Approval rule updated"
        );

        Ok(snapshot)
    }

    /// Gets a specific approval rule by ID.
    ///
    /// Inactive rules are still returned so in-flight expenses can resolve.
    pub async fn get_rule(
        &self,
        company_id: CompanyId,
        rule_id: ApprovalRuleId,
    ) -> Result<RuleSnapshot, ApprovalRuleError> {
        let snapshot = Self::load_snapshot(&self.db, rule_id).await?;
        if snapshot.company_id != company_id {
            return Err(ApprovalRuleError::NotFound(rule_id));
        }
        Ok(snapshot)
    }

    /// Lists all active approval rules for a company, newest first.
    pub async fn list_rules(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<RuleSnapshot>, ApprovalRuleError> {
        let rules = approval_rules::Entity::find()
            .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
            .filter(approval_rules::Column::IsActive.eq(true))
            .order_by_desc(approval_rules::Column::CreatedAt)
            .order_by_desc(approval_rules::Column::Id)
            .all(&self.db)
            .await?;

        let rule_ids: Vec<Uuid> = rules.iter().map(|r| r.id).collect();
        let mut approvers_by_rule: HashMap<Uuid, Vec<ApproverEntry>> = HashMap::new();
        for approver in approval_rule_approvers::Entity::find()
            .filter(approval_rule_approvers::Column::RuleId.is_in(rule_ids))
            .order_by_asc(approval_rule_approvers::Column::SequenceOrder)
            .all(&self.db)
            .await?
        {
            approvers_by_rule
                .entry(approver.rule_id)
                .or_default()
                .push(approver_entry(&approver));
        }

        Ok(rules
            .into_iter()
            .map(|rule| {
                let approvers = approvers_by_rule.remove(&rule.id).unwrap_or_default();
                to_snapshot(rule, approvers)
            })
            .collect())
    }

    /// Soft deletes an approval rule by setting is_active to false.
    pub async fn deactivate_rule(
        &self,
        company_id: CompanyId,
        rule_id: ApprovalRuleId,
    ) -> Result<(), ApprovalRuleError> {
        let existing = approval_rules::Entity::find_by_id(rule_id.into_inner())
            .filter(approval_rules::Column::CompanyId.eq(company_id.into_inner()))
            .one(&self.db)
            .await?
            .ok_or(ApprovalRuleError::NotFound(rule_id))?;

        let mut rule: approval_rules::ActiveModel = existing.into();
        rule.is_active = Set(false);
        rule.updated_at = Set(Utc::now().into());
        rule.update(&self.db).await?;

        tracing::info!(rule_id = %rule_id, "Approval rule deactivated");
        Ok(())
    }

    /// Loads a rule and its approvers ordered by sequence position.
    ///
    /// Runs on the caller's connection so the workflow controller can read
    /// inside its own transaction.
    pub async fn load_snapshot<C: ConnectionTrait>(
        conn: &C,
        rule_id: ApprovalRuleId,
    ) -> Result<RuleSnapshot, ApprovalRuleError> {
        let rule = approval_rules::Entity::find_by_id(rule_id.into_inner())
            .one(conn)
            .await?
            .ok_or(ApprovalRuleError::NotFound(rule_id))?;

        let approvers = approval_rule_approvers::Entity::find()
            .filter(approval_rule_approvers::Column::RuleId.eq(rule.id))
            .order_by_asc(approval_rule_approvers::Column::SequenceOrder)
            .all(conn)
            .await?
            .iter()
            .map(approver_entry)
            .collect();

        Ok(to_snapshot(rule, approvers))
    }
}

/// Checks the policy shape and returns the threshold to store.
fn validated_threshold(input: &CreateApprovalRuleInput) -> Result<Option<i32>, ApprovalRuleError> {
    let orders: Vec<i32> = input.approvers.iter().map(|a| a.sequence_order).collect();
    validate_rule_shape(input.kind, input.percentage_threshold, &orders).map_err(|e| match e {
        WorkflowError::Configuration(msg) => ApprovalRuleError::InvalidRule(msg),
        other => ApprovalRuleError::InvalidRule(other.to_string()),
    })?;
    Ok(input
        .percentage_threshold
        .filter(|_| input.kind.uses_quorum()))
}

/// Every approver must belong to the company and hold a reviewing role.
async fn check_approvers<C: ConnectionTrait>(
    conn: &C,
    company_id: CompanyId,
    approvers: &[ApproverInput],
) -> Result<(), ApprovalRuleError> {
    let approver_ids: Vec<Uuid> = approvers.iter().map(|a| a.user_id.into_inner()).collect();
    let members: HashMap<Uuid, UserRole> = users::Entity::find()
        .filter(users::Column::Id.is_in(approver_ids))
        .filter(users::Column::CompanyId.eq(company_id.into_inner()))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u.role))
        .collect();

    for approver in approvers {
        match members.get(&approver.user_id.into_inner()) {
            None => return Err(ApprovalRuleError::UnknownApprover(approver.user_id)),
            Some(UserRole::Employee) => {
                return Err(ApprovalRuleError::InvalidRule(format!(
                    "approver {} has the employee role and cannot approve",
                    approver.user_id
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

async fn insert_approvers<C: ConnectionTrait>(
    conn: &C,
    rule_id: ApprovalRuleId,
    approvers: &[ApproverInput],
) -> Result<(), ApprovalRuleError> {
    let now = Utc::now();
    for approver in approvers {
        approval_rule_approvers::ActiveModel {
            id: Set(Uuid::now_v7()),
            rule_id: Set(rule_id.into_inner()),
            user_id: Set(approver.user_id.into_inner()),
            sequence_order: Set(approver.sequence_order),
            auto_approve: Set(approver.auto_approve),
            created_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

fn approver_entry(model: &approval_rule_approvers::Model) -> ApproverEntry {
    ApproverEntry {
        user_id: UserId::from_uuid(model.user_id),
        sequence_order: model.sequence_order,
        auto_approve: model.auto_approve,
    }
}

fn to_snapshot(rule: approval_rules::Model, approvers: Vec<ApproverEntry>) -> RuleSnapshot {
    RuleSnapshot {
        id: ApprovalRuleId::from_uuid(rule.id),
        company_id: CompanyId::from_uuid(rule.company_id),
        name: rule.name,
        kind: rule.kind.into(),
        percentage_threshold: rule.percentage_threshold,
        requires_manager_approval: rule.requires_manager_approval,
        is_active: rule.is_active,
        approvers,
    }
}
