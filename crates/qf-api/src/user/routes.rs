use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use axum_extra::extract::PrivateCookieJar;
use qf_db::{
    models::{PublicProfile, User},
    repositories::user as user_repo,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    ApiState,
    auth::{
        AuthUser,
        cookies::{self, AUTH_COOKIE, REFRESH_COOKIE},
        refresh_token as rt, service, validation,
    },
    error::ApiError,
    extract::JsonBody,
    middleware::rate_limit,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    let profile_routes = Router::new()
        .route("/users/{id}", get(get_profile))
        .route("/users/me", patch(update_profile))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ));

    let sensitive_routes = Router::new()
        .route("/users/me/password", post(change_password))
        .route("/users/me", delete(delete_account))
        .layer(make_rate_limit_layer!(
            rate_limit::SENSITIVE_REPLENISH_PERIOD,
            rate_limit::SENSITIVE_BURST_SIZE
        ));

    Router::new().merge(profile_routes).merge(sensitive_routes)
}

async fn get_profile(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicProfile>, ApiError> {
    let profile = user_repo::find_public_profile(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}

/// Absent fields are left unchanged; empty strings clear the field
#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    display_name: Option<String>,
    bio: Option<String>,
    profile_picture_url: Option<String>,
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.display_name.is_none() && self.bio.is_none() && self.profile_picture_url.is_none()
        {
            return Err(ApiError::Validation("No profile fields to update".to_string()));
        }
        if let Some(name) = &self.display_name {
            validation::validate_display_name(name.trim())?;
        }
        if let Some(bio) = &self.bio {
            validation::validate_bio(bio.trim())?;
        }
        if let Some(url) = &self.profile_picture_url {
            validation::validate_profile_picture_url(url.trim())?;
        }
        Ok(())
    }
}

async fn update_profile(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    payload.validate()?;

    let user = user_repo::update_profile(
        &state.pool,
        auth_user.user_id,
        payload.display_name.as_deref().map(str::trim),
        payload.bio.as_deref().map(str::trim),
        payload.profile_picture_url.as_deref().map(str::trim),
    )
    .await?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

async fn change_password(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    validation::validate_password(&payload.new_password)?;
    if payload.current_password == payload.new_password {
        return Err(ApiError::Validation(
            "New password must differ from the current password".to_string(),
        ));
    }

    let current_hash = user_repo::find_password_hash(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::Auth("User not found".to_string()))?;

    if !service::verify_password(payload.current_password, current_hash).await? {
        return Err(ApiError::Auth("Current password is incorrect".to_string()));
    }

    let new_hash = service::hash_password(payload.new_password, state.bcrypt_cost).await?;
    user_repo::update_password_hash(&state.pool, auth_user.user_id, &new_hash).await?;

    // Other sessions must log in again
    let revoked = rt::revoke_all_user_tokens(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = %auth_user.user_id, revoked, "Password changed");

    Ok(Json(serde_json::json!({
        "message": "Password changed successfully",
        "revoked_sessions": revoked
    })))
}

async fn delete_account(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
) -> Result<(StatusCode, PrivateCookieJar), ApiError> {
    let deleted = user_repo::delete_user(&state.pool, auth_user.user_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %auth_user.user_id, "Account deleted");

    // Owned quizzes and sets disappear with the account
    state.cache.delete_prefix(crate::cache::keys::PUBLIC_QUIZZES_PREFIX);
    state
        .cache
        .delete_prefix(crate::cache::keys::PUBLIC_FLASHCARD_SETS_PREFIX);

    let jar = jar
        .remove(cookies::removal_cookie(AUTH_COOKIE, &state.cookies.domain))
        .remove(cookies::removal_cookie(REFRESH_COOKIE, &state.cookies.domain));

    Ok((StatusCode::NO_CONTENT, jar))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> UpdateProfileRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_update_profile_validation() {
        assert!(request(r#"{}"#).validate().is_err());
        assert!(request(r#"{"bio": ""}"#).validate().is_ok());
        assert!(request(r#"{"display_name": "Mr. Okafor"}"#).validate().is_ok());
        assert!(
            request(r#"{"profile_picture_url": "http://insecure.example/a.png"}"#)
                .validate()
                .is_err()
        );
    }
}
