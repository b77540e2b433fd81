//! Caller identity extraction
//!
//! Authentication happens at the gateway in front of this service. It forwards the
//! caller's id in `X-User-Id` and role in `X-User-Role`; these extractors only parse
//! and check those headers.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::models::UserRole;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller identity forwarded by the gateway
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Error response for identity failures
#[derive(Debug, Serialize)]
struct AuthError {
    #[serde(skip)]
    status: StatusCode,
    error: AuthErrorDetails,
}

#[derive(Debug, Serialize)]
struct AuthErrorDetails {
    code: String,
    message: String,
}

impl AuthError {
    fn unauthorized(code: &str, message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            error: AuthErrorDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header(parts, USER_ID_HEADER).ok_or_else(|| {
            AuthError::unauthorized("MISSING_IDENTITY", "X-User-Id header required")
                .into_response()
        })?;

        let user_id = Uuid::parse_str(raw_id).map_err(|_| {
            AuthError::unauthorized("INVALID_IDENTITY", "X-User-Id must be a UUID").into_response()
        })?;

        let role = match header(parts, USER_ROLE_HEADER).map(str::to_lowercase).as_deref() {
            None | Some("user") => UserRole::User,
            Some("admin") => UserRole::Admin,
            Some(_) => {
                return Err(
                    AuthError::unauthorized("INVALID_ROLE", "Unknown X-User-Role").into_response(),
                )
            }
        };

        Ok(AuthenticatedUser { user_id, role })
    }
}

/// Extractor that requires the admin role
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(
                AuthError::new(StatusCode::FORBIDDEN, "FORBIDDEN", "Admin access required")
                    .into_response(),
            );
        }

        Ok(AdminUser(user))
    }
}
