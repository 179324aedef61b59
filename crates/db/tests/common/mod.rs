//! Shared fixtures for the database integration tests.
//!
//! Every test gets its own in-memory SQLite database with the schema
//! migrated, so tests never see each other's rows.

#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use outlay_db::entities::{companies, sea_orm_active_enums::UserRole, users};
use outlay_db::migration::{Migrator, MigratorTrait};
use outlay_shared::config::DatabaseConfig;
use outlay_shared::types::{CompanyId, UserId};

/// Connects to a fresh in-memory database and applies all migrations.
pub async fn setup_db() -> DatabaseConnection {
    let db = outlay_db::connect(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// Connects to the Postgres database named by `DATABASE_URL`.
///
/// Returns `None` when the variable is unset so row-lock tests can be
/// skipped on machines without a server. Each test seeds its own company,
/// so runs against a shared database do not collide.
pub async fn setup_postgres() -> Option<DatabaseConnection> {
    let url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("OUTLAY__DATABASE__URL"))
        .ok()
        .filter(|url| url.starts_with("postgres"))?;

    let config = DatabaseConfig {
        url,
        max_connections: 10,
        min_connections: 1,
        acquire_timeout_secs: 30,
    };
    let db = outlay_db::connect(&config)
        .await
        .expect("Failed to connect to Postgres");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    Some(db)
}

/// Inserts a company.
pub async fn create_company(db: &DatabaseConnection, name: &str) -> CompanyId {
    let id = CompanyId::new();
    companies::ActiveModel {
        id: Set(id.into_inner()),
        name: Set(name.to_string()),
        base_currency: Set("USD".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to create company");
    id
}

/// Inserts a user.
pub async fn create_user(
    db: &DatabaseConnection,
    company_id: CompanyId,
    name: &str,
    role: UserRole,
    manager: Option<UserId>,
) -> UserId {
    let id = UserId::new();
    users::ActiveModel {
        id: Set(id.into_inner()),
        company_id: Set(company_id.into_inner()),
        email: Set(format!("{}-{}@example.com", name.to_lowercase(), id)),
        full_name: Set(name.to_string()),
        role: Set(role),
        manager_id: Set(manager.map(UserId::into_inner)),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("Failed to create user");
    id
}
