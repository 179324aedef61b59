//! Initial schema: companies, users, approval rules, expenses and the
//! approval ledger.
//!
//! Built with the schema builders so the same migration runs on Postgres
//! and SQLite.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Companies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Companies::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Companies::BaseCurrency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::CompanyId).uuid().not_null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::FullName).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                    .col(ColumnDef::new(Users::ManagerId).uuid().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_company")
                            .from(Users::Table, Users::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_manager")
                            .from(Users::Table, Users::ManagerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApprovalRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalRules::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApprovalRules::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(ApprovalRules::Name).string_len(255).not_null())
                    .col(ColumnDef::new(ApprovalRules::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(ApprovalRules::PercentageThreshold).integer().null())
                    .col(
                        ColumnDef::new(ApprovalRules::RequiresManagerApproval)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ApprovalRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ApprovalRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(
                        Expr::col(ApprovalRules::PercentageThreshold)
                            .is_null()
                            .or(Expr::col(ApprovalRules::PercentageThreshold).between(1, 100)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_rules_company")
                            .from(ApprovalRules::Table, ApprovalRules::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApprovalRuleApprovers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalRuleApprovers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApprovalRuleApprovers::RuleId).uuid().not_null())
                    .col(ColumnDef::new(ApprovalRuleApprovers::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ApprovalRuleApprovers::SequenceOrder)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApprovalRuleApprovers::AutoApprove)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ApprovalRuleApprovers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(ApprovalRuleApprovers::SequenceOrder).gte(1))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rule_approvers_rule")
                            .from(ApprovalRuleApprovers::Table, ApprovalRuleApprovers::RuleId)
                            .to(ApprovalRules::Table, ApprovalRules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rule_approvers_user")
                            .from(ApprovalRuleApprovers::Table, ApprovalRuleApprovers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rule_approvers_sequence")
                    .table(ApprovalRuleApprovers::Table)
                    .col(ApprovalRuleApprovers::RuleId)
                    .col(ApprovalRuleApprovers::SequenceOrder)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::SubmittedBy).uuid().not_null())
                    .col(ColumnDef::new(Expenses::ApprovalRuleId).uuid().null())
                    .col(ColumnDef::new(Expenses::Description).text().not_null())
                    .col(ColumnDef::new(Expenses::AmountCents).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Expenses::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Expenses::CurrentApprovalStep)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Expenses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Expenses::CurrentApprovalStep).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_company")
                            .from(Expenses::Table, Expenses::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_submitter")
                            .from(Expenses::Table, Expenses::SubmittedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_rule")
                            .from(Expenses::Table, Expenses::ApprovalRuleId)
                            .to(ApprovalRules::Table, ApprovalRules::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_company_status")
                    .table(Expenses::Table)
                    .col(Expenses::CompanyId)
                    .col(Expenses::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApprovalHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApprovalHistory::ExpenseId).uuid().not_null())
                    .col(ColumnDef::new(ApprovalHistory::ApproverId).uuid().not_null())
                    .col(ColumnDef::new(ApprovalHistory::Action).string_len(20).not_null())
                    .col(ColumnDef::new(ApprovalHistory::Comment).text().null())
                    .col(ColumnDef::new(ApprovalHistory::StepNumber).integer().not_null())
                    .col(
                        ColumnDef::new(ApprovalHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_history_expense")
                            .from(ApprovalHistory::Table, ApprovalHistory::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_history_approver")
                            .from(ApprovalHistory::Table, ApprovalHistory::ApproverId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_approval_history_expense")
                    .table(ApprovalHistory::Table)
                    .col(ApprovalHistory::ExpenseId)
                    .col(ApprovalHistory::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApprovalHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApprovalRuleApprovers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApprovalRules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    BaseCurrency,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    CompanyId,
    Email,
    FullName,
    Role,
    ManagerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ApprovalRules {
    Table,
    Id,
    CompanyId,
    Name,
    Kind,
    PercentageThreshold,
    RequiresManagerApproval,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApprovalRuleApprovers {
    Table,
    Id,
    RuleId,
    UserId,
    SequenceOrder,
    AutoApprove,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    CompanyId,
    SubmittedBy,
    ApprovalRuleId,
    Description,
    AmountCents,
    Currency,
    Status,
    CurrentApprovalStep,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApprovalHistory {
    Table,
    Id,
    ExpenseId,
    ApproverId,
    Action,
    Comment,
    StepNumber,
    CreatedAt,
}
