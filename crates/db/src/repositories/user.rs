//! User directory lookups.
//!
//! Users and companies are managed elsewhere; the workflow only reads
//! them to resolve managers and the admin reject privilege.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

use outlay_core::workflow::WorkflowError;
use outlay_shared::types::{CompanyId, UserId};

use crate::entities::users;

/// Read-only access to users.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserDirectory;

impl UserDirectory {
    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
    ) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(user_id.into_inner()).one(conn).await
    }

    /// Gets a user, failing with `UserNotFound` if absent.
    pub async fn get<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
    ) -> Result<users::Model, WorkflowError> {
        Self::find(conn, user_id)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::UserNotFound(user_id))
    }

    /// Gets a user that belongs to `company_id`.
    ///
    /// Users of other companies are reported as not found.
    pub async fn get_in_company<C: ConnectionTrait>(
        conn: &C,
        company_id: CompanyId,
        user_id: UserId,
    ) -> Result<users::Model, WorkflowError> {
        let user = Self::get(conn, user_id).await?;
        if user.company_id == company_id.into_inner() {
            Ok(user)
        } else {
            Err(WorkflowError::UserNotFound(user_id))
        }
    }
}
