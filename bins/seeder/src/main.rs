//! Database seeder for Outlay development.
//!
//! Seeds a demo company with an admin, a manager, an employee reporting to
//! the manager, two finance approvers and a hybrid approval rule. When a
//! JWT secret is configured it also prints bearer tokens for each user.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use outlay_core::workflow::{self, PolicyKind};
use outlay_db::entities::{companies, sea_orm_active_enums::UserRole, users};
use outlay_db::repositories::{ApprovalRuleRepository, ApproverInput, CreateApprovalRuleInput};
use outlay_shared::config::DatabaseConfig;
use outlay_shared::types::{CompanyId, UserId};
use outlay_shared::{AppConfig, JwtService};

/// Demo company ID (consistent for all seeds)
const DEMO_COMPANY_ID: Uuid = Uuid::from_u128(1);

/// Demo users: (id, name, role, reports to).
const DEMO_USERS: [(u128, &str, UserRole, Option<u128>); 5] = [
    (0x10, "Ada Admin", UserRole::Admin, None),
    (0x11, "Max Manager", UserRole::Manager, None),
    (0x12, "Eve Employee", UserRole::Employee, Some(0x11)),
    (0x13, "Fin Controller", UserRole::Manager, None),
    (0x14, "Cleo CFO", UserRole::Admin, None),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().ok();
    let database = match &config {
        Some(config) => config.database.clone(),
        None => DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set when no configuration is available")?,
            max_connections: 2,
            min_connections: 1,
            acquire_timeout_secs: 30,
        },
    };

    println!("Connecting to database...");
    let db = outlay_db::connect(&database)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding demo company...");
    seed_company(&db).await?;

    println!("Seeding demo users...");
    seed_users(&db).await?;

    println!("Seeding approval rule...");
    seed_rule(&db).await?;

    if let Some(config) = config {
        println!("Bearer tokens:");
        let jwt = JwtService::new(&config.jwt);
        for (id, name, role, _) in DEMO_USERS {
            let role = workflow::UserRole::from(role);
            let token =
                jwt.generate_access_token(Uuid::from_u128(id), DEMO_COMPANY_ID, role.as_str())?;
            println!("  {name}: {token}");
        }
    }

    println!("Seeding complete!");
    Ok(())
}

async fn seed_company(db: &DatabaseConnection) -> anyhow::Result<()> {
    if companies::Entity::find_by_id(DEMO_COMPANY_ID)
        .one(db)
        .await?
        .is_some()
    {
        println!("  Demo company already exists, skipping...");
        return Ok(());
    }

    companies::ActiveModel {
        id: Set(DEMO_COMPANY_ID),
        name: Set("Demo Company".to_string()),
        base_currency: Set("USD".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    println!("  Created Demo Company ({DEMO_COMPANY_ID})");
    Ok(())
}

async fn seed_users(db: &DatabaseConnection) -> anyhow::Result<()> {
    // Managers before their reports
    for (id, name, role, manager) in DEMO_USERS {
        let id = Uuid::from_u128(id);
        if users::Entity::find_by_id(id).one(db).await?.is_some() {
            println!("  {name} already exists, skipping...");
            continue;
        }

        let email = format!("{}@outlay.dev", name.to_lowercase().replace(' ', "."));
        users::ActiveModel {
            id: Set(id),
            company_id: Set(DEMO_COMPANY_ID),
            email: Set(email.clone()),
            full_name: Set(name.to_string()),
            role: Set(role),
            manager_id: Set(manager.map(Uuid::from_u128)),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        println!("  Created {name} <{email}> ({id})");
    }
    Ok(())
}

async fn seed_rule(db: &DatabaseConnection) -> anyhow::Result<()> {
    let company_id = CompanyId::from_uuid(DEMO_COMPANY_ID);
    let repo = ApprovalRuleRepository::new(db.clone());

    if repo
        .list_rules(company_id)
        .await?
        .iter()
        .any(|r| r.name == "Travel and entertainment")
    {
        println!("  Approval rule already exists, skipping...");
        return Ok(());
    }

    let rule = repo
        .create_rule(
            company_id,
            CreateApprovalRuleInput {
                name: "Travel and entertainment".to_string(),
                kind: PolicyKind::Hybrid,
                percentage_threshold: Some(60),
                requires_manager_approval: true,
                approvers: vec![
                    ApproverInput {
                        user_id: UserId::from_uuid(Uuid::from_u128(0x13)),
                        sequence_order: 1,
                        auto_approve: false,
                    },
                    ApproverInput {
                        user_id: UserId::from_uuid(Uuid::from_u128(0x14)),
                        sequence_order: 2,
                        auto_approve: true,
                    },
                ],
            },
        )
        .await?;
    println!("  Created hybrid 60% rule ({})", rule.id);
    Ok(())
}
