//! Fixtures for route tests: an in-memory database behind the full router.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;

use outlay_db::entities::{companies, sea_orm_active_enums::UserRole, users};
use outlay_db::migration::{Migrator, MigratorTrait};
use outlay_shared::JwtService;
use outlay_shared::config::{DatabaseConfig, JwtConfig};
use outlay_shared::types::{CompanyId, UserId};

use crate::{AppState, create_router};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = outlay_db::connect(&DatabaseConfig::in_memory())
            .await
            .expect("Failed to connect to database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let state = AppState {
            db: Arc::new(db),
            jwt_service: Arc::new(JwtService::new(&JwtConfig {
                secret: "route-test-secret".to_string(),
                access_token_expiry_secs: 900,
            })),
        };
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn company(&self, name: &str) -> CompanyId {
        let id = CompanyId::new();
        companies::ActiveModel {
            id: Set(id.into_inner()),
            name: Set(name.to_string()),
            base_currency: Set("USD".to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db())
        .await
        .expect("Failed to create company");
        id
    }

    pub async fn user(
        &self,
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
        .insert(self.db())
        .await
        .expect("Failed to create user");
        id
    }

    pub fn token(&self, user_id: UserId, company_id: CompanyId, role: &str) -> String {
        self.state
            .jwt_service
            .generate_access_token(user_id.into_inner(), company_id.into_inner(), role)
            .expect("should generate token")
    }

    /// Sends one request through the router and decodes the JSON reply.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).expect("valid request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, json)
    }
}
