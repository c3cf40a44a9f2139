use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use qf_db::models::UserRole;
use uuid::Uuid;

use super::{cookies::AUTH_COOKIE, jwt::verify_jwt_token};
use crate::{error::ApiError, state::AuthConfig};

/// Authenticated user extractor
///
/// Reads the access token from `Authorization: Bearer <token>` and falls
/// back to the private `auth_token` cookie.
///
/// # Example
/// ```
/// use axum::extract::State;
/// use qf_api::{error::ApiError, auth::AuthUser, ApiState};
///
/// async fn protected_route(
///     auth_user: AuthUser,
///     State(state): State<ApiState>,
/// ) -> Result<(), ApiError> {
///     // auth_user.user_id, auth_user.email and auth_user.role are available
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_teacher(&self) -> bool {
        self.role == UserRole::Teacher
    }
}

/// Non-empty token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_config = AuthConfig::from_ref(state);

        let token = match bearer_token(&parts.headers) {
            Some(token) => token.to_owned(),
            None => {
                let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::Auth("Failed to read cookies".to_string()))?;

                jar.get(AUTH_COOKIE)
                    .ok_or(ApiError::Auth("Not authenticated".to_string()))?
                    .value()
                    .to_owned()
            }
        };

        let claims = verify_jwt_token(&token, &auth_config.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Auth("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Authenticated user holding the teacher role; students get 403
#[derive(Debug, Clone)]
pub struct RequireTeacher(pub AuthUser);

impl<S> FromRequestParts<S> for RequireTeacher
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_teacher() {
            return Err(ApiError::Forbidden(
                "Only teachers can perform this action".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

/// Authenticated user holding the student role; teachers get 403
#[derive(Debug, Clone)]
pub struct RequireStudent(pub AuthUser);

impl<S> FromRequestParts<S> for RequireStudent
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.is_teacher() {
            return Err(ApiError::Forbidden(
                "Only students can perform this action".to_string(),
            ));
        }
        Ok(Self(user))
    }
}
