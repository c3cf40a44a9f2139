use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, post},
};
use qf_db::{
    models::{Connection, ConnectionStatus, ConnectionWithUser},
    repositories::{connection as connection_repo, user as user_repo},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    ApiState, auth::AuthUser, error::ApiError, extract::JsonBody, middleware::rate_limit,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/connections", post(request_connection).get(list_connections))
        .route("/connections/{id}", delete(delete_connection))
        .route("/connections/{id}/accept", post(accept_connection))
        .route("/connections/{id}/decline", post(decline_connection))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

#[derive(Debug, Deserialize)]
struct ConnectionRequest {
    username: String,
}

async fn request_connection(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<ConnectionRequest>,
) -> Result<(StatusCode, Json<Connection>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("Username is required".to_string()));
    }

    let target = user_repo::find_public_profile_by_username(&state.pool, username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if target.id == auth_user.user_id {
        return Err(ApiError::Validation(
            "You cannot connect with yourself".to_string(),
        ));
    }
    if target.role == auth_user.role {
        return Err(ApiError::Validation(
            "Connections link a teacher with a student".to_string(),
        ));
    }
    if connection_repo::exists_between(&state.pool, auth_user.user_id, target.id).await? {
        return Err(ApiError::Conflict(
            "A connection with this user already exists".to_string(),
        ));
    }

    // The pair index still catches a concurrent request from the other side
    let connection = connection_repo::create_connection(&state.pool, auth_user.user_id, target.id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("A connection with this user already exists".to_string())
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(connection)))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<ConnectionStatus>,
}

async fn list_connections(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ConnectionWithUser>>, ApiError> {
    let connections =
        connection_repo::list_for_user(&state.pool, auth_user.user_id, query.status).await?;
    Ok(Json(connections))
}

/// Accept or decline a pending request addressed to the caller
async fn respond(
    state: &ApiState,
    auth_user: &AuthUser,
    connection_id: Uuid,
    status: ConnectionStatus,
) -> Result<Connection, ApiError> {
    let connection = connection_repo::find_by_id(&state.pool, connection_id)
        .await?
        .filter(|c| c.requester_id == auth_user.user_id || c.recipient_id == auth_user.user_id)
        .ok_or_else(|| ApiError::NotFound("Connection not found".to_string()))?;

    if connection.recipient_id != auth_user.user_id {
        return Err(ApiError::Forbidden(
            "Only the recipient can respond to a connection request".to_string(),
        ));
    }

    connection_repo::respond(&state.pool, connection_id, status)
        .await?
        .ok_or_else(|| ApiError::Conflict("Connection request was already answered".to_string()))
}

async fn accept_connection(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<Connection>, ApiError> {
    respond(&state, &auth_user, connection_id, ConnectionStatus::Accepted)
        .await
        .map(Json)
}

async fn decline_connection(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<Connection>, ApiError> {
    respond(&state, &auth_user, connection_id, ConnectionStatus::Declined)
        .await
        .map(Json)
}

async fn delete_connection(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(connection_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    connection_repo::find_by_id(&state.pool, connection_id)
        .await?
        .filter(|c| c.requester_id == auth_user.user_id || c.recipient_id == auth_user.user_id)
        .ok_or_else(|| ApiError::NotFound("Connection not found".to_string()))?;

    connection_repo::delete_connection(&state.pool, connection_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
