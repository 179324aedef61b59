//! Bearer token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CompanyId, UserId};

/// JWT claims carried by access tokens from the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Company the user acts within.
    pub company: Uuid,
    /// User's role in the company (`admin`, `manager`, `employee`).
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, company_id: Uuid, role: &str, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            company: company_id,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }

    /// Returns the company ID from claims.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        CompanyId::from_uuid(self.company)
    }

    /// Returns true if the role may act on approvals (admin or manager).
    #[must_use]
    pub fn can_review(&self) -> bool {
        matches!(self.role.to_lowercase().as_str(), "admin" | "manager")
    }
}
