//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{AppState, routes::app_error_response};
use outlay_core::workflow::UserRole;
use outlay_shared::types::{CompanyId, UserId};
use outlay_shared::{AppError, Claims, JwtError};

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return app_error_response(&AppError::unauthorized(
            "missing_token",
            "Authorization header with Bearer token is required",
        ));
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            let err = match e {
                JwtError::Expired => AppError::unauthorized("token_expired", "Token has expired"),
                _ => AppError::unauthorized("invalid_token", "Invalid or malformed token"),
            };
            app_error_response(&err)
        }
    }
}

/// Extractor for authenticated user claims.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0.user_id()
    }

    /// Returns the company ID from the claims.
    #[must_use]
    pub const fn company_id(&self) -> CompanyId {
        self.0.company_id()
    }

    /// Returns the user's role as carried by the token.
    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        UserRole::parse(&self.0.role)
    }

    /// Fails with `Forbidden` unless the user is an admin or manager.
    pub fn require_reviewer(&self) -> Result<(), AppError> {
        if self.0.can_review() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Admin or Manager role required for this operation".to_string(),
            ))
        }
    }

    /// Fails with `Forbidden` unless the user is an admin.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role() == Some(UserRole::Admin) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Admin role required for this operation".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                app_error_response(&AppError::unauthorized(
                    "unauthorized",
                    "Authentication required",
                ))
            })
    }
}
