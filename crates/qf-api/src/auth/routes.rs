use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::{get, post},
};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use base64::Engine;
use qf_db::{models::User, repositories::user as user_repo};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    cookies::{self, AUTH_COOKIE, REFRESH_COOKIE},
    jwt,
    middleware::AuthUser,
    refresh_token as rt,
    service::{self, Registration},
};
use crate::{
    ApiState, error::ApiError, extract::JsonBody, metrics::record_auth_event,
    middleware::rate_limit,
};

const MAX_DEVICE_INFO_LEN: usize = 255;

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    // Credential endpoints with strict rate limiting
    let credential_routes = Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/auth/refresh", post(refresh))
        .layer(make_rate_limit_layer!(
            rate_limit::AUTH_REPLENISH_PERIOD,
            rate_limit::AUTH_BURST_SIZE
        ));

    let session_routes = Router::new()
        .route("/auth/me", get(auth_me))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/csrf", get(csrf_token))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ));

    Router::new().merge(credential_routes).merge(session_routes)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

fn device_info(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_DEVICE_INFO_LEN).collect())
}

/// Optional JSON body carrying a refresh token; an empty body is allowed
fn refresh_token_from_body(body: &Bytes) -> Result<Option<String>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: RefreshRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))?;
    Ok(request.refresh_token.filter(|t| !t.is_empty()))
}

/// Issue an access token and a stored refresh token, and set both cookies
async fn issue_session(
    state: &ApiState,
    jar: PrivateCookieJar,
    user: User,
    device_info: Option<&str>,
) -> Result<(PrivateCookieJar, AuthResponse), ApiError> {
    let token = jwt::generate_jwt_token(
        user.id,
        &user.email,
        user.role,
        &state.auth.jwt_secret,
        state.auth.jwt_expiry_hours,
    )?;

    let (refresh_token, refresh_token_hash) = rt::generate_refresh_token();
    rt::store_refresh_token(
        &state.pool,
        user.id,
        &refresh_token_hash,
        device_info,
        state.auth.refresh_token_expiry_days,
    )
    .await?;

    let jar = jar
        .add(cookies::create_auth_cookie(
            token.clone(),
            &state.cookies.environment,
            state.auth.jwt_expiry_hours,
            &state.cookies.domain,
        ))
        .add(cookies::create_refresh_token_cookie(
            refresh_token.clone(),
            &state.cookies.environment,
            state.auth.refresh_token_expiry_days,
            &state.cookies.domain,
        ));

    Ok((
        jar,
        AuthResponse {
            token,
            refresh_token,
            user,
        },
    ))
}

async fn register(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, PrivateCookieJar, Json<AuthResponse>), ApiError> {
    let registration = Registration::parse(
        &payload.username,
        &payload.email,
        payload.password,
        &payload.role,
    )?;

    let user = service::register_user(&state.pool, registration, state.bcrypt_cost).await?;
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
    record_auth_event("register", "password", true);

    let (jar, response) = issue_session(&state, jar, user, device_info(&headers).as_deref()).await?;
    Ok((StatusCode::CREATED, jar, Json(response)))
}

async fn login(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<(PrivateCookieJar, Json<AuthResponse>), ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = match service::authenticate(&state.pool, &payload.email, payload.password).await {
        Ok(user) => user,
        Err(e) => {
            record_auth_event("login", "password", false);
            return Err(e);
        }
    };
    record_auth_event("login", "password", true);
    tracing::debug!(user_id = %user.id, "User logged in");

    let (jar, response) = issue_session(&state, jar, user, device_info(&headers).as_deref()).await?;
    Ok((jar, Json(response)))
}

async fn auth_me(auth_user: AuthUser, State(state): State<ApiState>) -> Result<Json<User>, ApiError> {
    let user = user_repo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::Auth("User not found".to_string()))?;

    Ok(Json(user))
}

async fn refresh(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> Result<(PrivateCookieJar, Json<AuthResponse>), ApiError> {
    let presented = match jar.get(REFRESH_COOKIE) {
        Some(cookie) => cookie.value().to_owned(),
        None => refresh_token_from_body(&body)?
            .ok_or_else(|| ApiError::Auth("No refresh token found".to_string()))?,
    };

    let (user_id, new_refresh_token) = match rt::verify_and_rotate_refresh_token(
        &state.pool,
        &presented,
        state.auth.refresh_token_expiry_days,
    )
    .await
    {
        Ok(rotated) => rotated,
        Err(e) => {
            record_auth_event("refresh", "refresh_token", false);
            return Err(e);
        }
    };

    let user = user_repo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::Auth("User not found".to_string()))?;

    let token = jwt::generate_jwt_token(
        user.id,
        &user.email,
        user.role,
        &state.auth.jwt_secret,
        state.auth.jwt_expiry_hours,
    )?;
    record_auth_event("refresh", "refresh_token", true);

    let jar = jar
        .add(cookies::create_auth_cookie(
            token.clone(),
            &state.cookies.environment,
            state.auth.jwt_expiry_hours,
            &state.cookies.domain,
        ))
        .add(cookies::create_refresh_token_cookie(
            new_refresh_token.clone(),
            &state.cookies.environment,
            state.auth.refresh_token_expiry_days,
            &state.cookies.domain,
        ));

    Ok((
        jar,
        Json(AuthResponse {
            token,
            refresh_token: new_refresh_token,
            user,
        }),
    ))
}

fn clear_session_cookies(jar: PrivateCookieJar, cookie_domain: &str) -> PrivateCookieJar {
    jar.remove(cookies::removal_cookie(AUTH_COOKIE, cookie_domain))
        .remove(cookies::removal_cookie(REFRESH_COOKIE, cookie_domain))
}

async fn logout(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    body: Bytes,
) -> Result<(PrivateCookieJar, Json<serde_json::Value>), ApiError> {
    let presented = match jar.get(REFRESH_COOKIE) {
        Some(cookie) => Some(cookie.value().to_owned()),
        None => refresh_token_from_body(&body)?,
    };

    if let Some(token) = presented {
        rt::revoke_refresh_token(&state.pool, &token).await?;
    }

    let jar = clear_session_cookies(jar, &state.cookies.domain);
    Ok((
        jar,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

async fn logout_all(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<serde_json::Value>), ApiError> {
    let revoked = rt::revoke_all_user_tokens(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = %auth_user.user_id, revoked, "Revoked all sessions");

    let jar = clear_session_cookies(jar, &state.cookies.domain);
    Ok((
        jar,
        Json(serde_json::json!({
            "message": "Logged out from all devices",
            "revoked_sessions": revoked
        })),
    ))
}

/// Issue a fresh CSRF token as a readable cookie and in the body
async fn csrf_token(
    State(state): State<ApiState>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

    let jar = jar.add(cookies::create_csrf_cookie(
        token.clone(),
        &state.cookies.environment,
        &state.cookies.domain,
    ));

    (jar, Json(serde_json::json!({ "csrf_token": token })))
}
