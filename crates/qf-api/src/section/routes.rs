use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use qf_db::{
    models::{Section, SectionMember, SectionSummary},
    repositories::section as section_repo,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::join_code::{generate_join_code, normalize_join_code};
use crate::{
    ApiState,
    auth::{AuthUser, RequireStudent, RequireTeacher},
    error::ApiError,
    extract::JsonBody,
    middleware::rate_limit,
    validation::{optional_text, required_text},
};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 1000;
/// Attempts at finding an unused join code before giving up
const JOIN_CODE_ATTEMPTS: usize = 5;

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    let section_routes = Router::new()
        .route("/sections", post(create_section).get(list_sections))
        .route(
            "/sections/{id}",
            get(get_section).patch(update_section).delete(delete_section),
        )
        .route("/sections/{id}/join-code", post(rotate_join_code))
        .route("/sections/{id}/members/{user_id}", delete(remove_member))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ));

    // Join codes are short, so guessing them is throttled hard
    let join_routes = Router::new()
        .route("/sections/join", post(join_section))
        .layer(make_rate_limit_layer!(
            rate_limit::SENSITIVE_REPLENISH_PERIOD,
            rate_limit::SENSITIVE_BURST_SIZE
        ));

    Router::new().merge(section_routes).merge(join_routes)
}

fn is_join_code_conflict(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.constraint() == Some("sections_join_code_key"))
}

/// Load a section owned by `user_id`; anything else is reported as missing
async fn owned_section(pool: &PgPool, section_id: Uuid, user_id: Uuid) -> Result<Section, ApiError> {
    section_repo::find_by_id(pool, section_id)
        .await?
        .filter(|s| s.owner_id == user_id)
        .ok_or_else(|| ApiError::NotFound("Section not found".to_string()))
}

#[derive(Debug, Deserialize)]
struct CreateSectionRequest {
    name: String,
    description: Option<String>,
}

async fn create_section(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<CreateSectionRequest>,
) -> Result<(StatusCode, Json<Section>), ApiError> {
    let name = required_text("Name", &payload.name, MAX_NAME_LEN)?;
    let description = optional_text("Description", payload.description.as_deref(), MAX_DESCRIPTION_LEN)?;

    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = generate_join_code(&mut rand::thread_rng());
        match section_repo::create_section(
            &state.pool,
            teacher.user_id,
            &name,
            description.as_deref(),
            &code,
        )
        .await
        {
            Ok(section) => {
                tracing::info!(section_id = %section.id, owner_id = %teacher.user_id, "Section created");
                return Ok((StatusCode::CREATED, Json(section)));
            }
            Err(e) if is_join_code_conflict(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Internal(anyhow::anyhow!(
        "could not find an unused join code"
    )))
}

async fn list_sections(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<SectionSummary>>, ApiError> {
    let sections = if auth_user.is_teacher() {
        section_repo::list_owned(&state.pool, auth_user.user_id).await?
    } else {
        section_repo::list_joined(&state.pool, auth_user.user_id).await?
    };
    Ok(Json(sections))
}

#[derive(Serialize)]
struct SectionDetail {
    #[serde(flatten)]
    section: SectionView,
    /// Only present for the owner
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<Vec<SectionMember>>,
}

/// Section as shown to its members; the join code is for the owner only
#[derive(Serialize)]
struct SectionView {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    join_code: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl SectionView {
    fn new(section: Section, is_owner: bool) -> Self {
        Self {
            id: section.id,
            owner_id: section.owner_id,
            name: section.name,
            description: section.description,
            join_code: is_owner.then_some(section.join_code),
            created_at: section.created_at,
            updated_at: section.updated_at,
        }
    }
}

async fn get_section(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(section_id): Path<Uuid>,
) -> Result<Json<SectionDetail>, ApiError> {
    let section = section_repo::find_by_id(&state.pool, section_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Section not found".to_string()))?;

    let is_owner = section.owner_id == auth_user.user_id;
    if !is_owner && !section_repo::is_member(&state.pool, section_id, auth_user.user_id).await? {
        return Err(ApiError::NotFound("Section not found".to_string()));
    }

    let members = if is_owner {
        Some(section_repo::list_members(&state.pool, section_id).await?)
    } else {
        None
    };

    Ok(Json(SectionDetail {
        section: SectionView::new(section, is_owner),
        members,
    }))
}

#[derive(Debug, Deserialize)]
struct UpdateSectionRequest {
    name: Option<String>,
    /// Empty string clears the description
    description: Option<String>,
}

async fn update_section(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    Path(section_id): Path<Uuid>,
    JsonBody(payload): JsonBody<UpdateSectionRequest>,
) -> Result<Json<Section>, ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(|n| required_text("Name", n, MAX_NAME_LEN))
        .transpose()?;
    let description = match payload.description.as_deref().map(str::trim) {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => {
            return Err(ApiError::Validation(format!(
                "Description must be at most {MAX_DESCRIPTION_LEN} characters long"
            )));
        }
        other => other,
    };

    owned_section(&state.pool, section_id, teacher.user_id).await?;
    let section = section_repo::update_section(&state.pool, section_id, name.as_deref(), description).await?;
    Ok(Json(section))
}

async fn delete_section(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    Path(section_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    owned_section(&state.pool, section_id, teacher.user_id).await?;
    section_repo::delete_section(&state.pool, section_id).await?;
    tracing::info!(%section_id, "Section deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn rotate_join_code(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    Path(section_id): Path<Uuid>,
) -> Result<Json<Section>, ApiError> {
    owned_section(&state.pool, section_id, teacher.user_id).await?;

    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = generate_join_code(&mut rand::thread_rng());
        match section_repo::update_join_code(&state.pool, section_id, &code).await {
            Ok(section) => return Ok(Json(section)),
            Err(e) if is_join_code_conflict(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Internal(anyhow::anyhow!(
        "could not find an unused join code"
    )))
}

#[derive(Debug, Deserialize)]
struct JoinSectionRequest {
    join_code: String,
}

async fn join_section(
    RequireStudent(student): RequireStudent,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<JoinSectionRequest>,
) -> Result<Json<SectionView>, ApiError> {
    let code = normalize_join_code(&payload.join_code)
        .ok_or_else(|| ApiError::Validation("Join code must be 8 letters or digits".to_string()))?;

    let section = section_repo::find_by_join_code(&state.pool, &code)
        .await?
        .ok_or_else(|| ApiError::NotFound("No section with that join code".to_string()))?;

    if !section_repo::add_member(&state.pool, section.id, student.user_id).await? {
        return Err(ApiError::Conflict(
            "You are already a member of this section".to_string(),
        ));
    }
    tracing::info!(section_id = %section.id, user_id = %student.user_id, "Student joined section");

    Ok(Json(SectionView::new(section, false)))
}

async fn remove_member(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path((section_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let section = section_repo::find_by_id(&state.pool, section_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Section not found".to_string()))?;

    let is_owner = section.owner_id == auth_user.user_id;
    if !is_owner && auth_user.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Only the section owner can remove other members".to_string(),
        ));
    }

    if !section_repo::remove_member(&state.pool, section_id, user_id).await? {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
