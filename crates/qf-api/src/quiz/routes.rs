use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use qf_db::{
    models::{Quiz, QuizDraft, QuizSummary, RatingSummary, Visibility},
    repositories::{quiz as quiz_repo, section as section_repo},
};
use uuid::Uuid;

use super::{
    access::{can_view, load_quiz_with_questions, owned_quiz, quiz_not_found, viewable_quiz},
    model::{PublishRequest, QuizInput, QuizWithQuestions, RatingRequest, ValidQuiz},
};
use crate::{
    ApiState,
    auth::{AuthUser, RequireTeacher},
    cache::keys,
    error::ApiError,
    extract::JsonBody,
    middleware::rate_limit,
    validation::PageQuery,
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/quizzes", post(create_quiz).get(list_quizzes))
        .route("/quizzes/public", get(list_public_quizzes))
        .route(
            "/quizzes/{id}",
            get(get_quiz).put(replace_quiz).delete(delete_quiz),
        )
        .route("/quizzes/{id}/publish", post(publish_quiz))
        .route("/quizzes/{id}/rating", post(rate_quiz))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

/// Drop cached reads touched by a change to `quiz`
fn invalidate_quiz(state: &ApiState, quiz_id: Uuid, was_public: bool) {
    state.cache.delete(&keys::quiz(quiz_id));
    if was_public {
        state.cache.delete_prefix(keys::PUBLIC_QUIZZES_PREFIX);
    }
}

fn draft_of(valid: &ValidQuiz, source_set_id: Option<Uuid>) -> QuizDraft<'_> {
    QuizDraft {
        title: &valid.title,
        description: valid.description.as_deref(),
        visibility: valid.visibility,
        time_limit_minutes: valid.time_limit_minutes,
        source_set_id,
    }
}

async fn create_quiz(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    JsonBody(payload): JsonBody<QuizInput>,
) -> Result<(StatusCode, Json<QuizWithQuestions>), ApiError> {
    let valid = payload.validate(false)?;

    let mut tx = state.pool.begin().await?;
    let quiz = quiz_repo::create_quiz(&mut *tx, teacher.user_id, &draft_of(&valid, None)).await?;
    quiz_repo::insert_questions(&mut *tx, quiz.id, &valid.questions).await?;
    tx.commit().await?;

    if quiz.visibility == Visibility::Public {
        state.cache.delete_prefix(keys::PUBLIC_QUIZZES_PREFIX);
    }
    tracing::info!(quiz_id = %quiz.id, questions = valid.questions.len(), "Quiz created");

    Ok((
        StatusCode::CREATED,
        Json(QuizWithQuestions {
            quiz,
            questions: valid.questions,
        }),
    ))
}

async fn list_quizzes(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    let quizzes = if auth_user.is_teacher() {
        quiz_repo::list_owned(&state.pool, auth_user.user_id).await?
    } else {
        quiz_repo::list_assigned(&state.pool, auth_user.user_id).await?
    };
    Ok(Json(quizzes))
}

async fn list_public_quizzes(
    _auth_user: AuthUser,
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    let page = query.page()?;
    let key = keys::public_quizzes(page);
    if let Some(cached) = state.cache.get::<Vec<QuizSummary>>(&key) {
        return Ok(Json(cached));
    }

    let (limit, offset) = query.limit_offset()?;
    let quizzes = quiz_repo::list_public(&state.pool, limit, offset).await?;
    state.cache.set(key, &quizzes);

    Ok(Json(quizzes))
}

/// Owners get the answer key, everyone else the redacted questions
async fn get_quiz(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let loaded = load_quiz_with_questions(&state, quiz_id)
        .await?
        .ok_or_else(quiz_not_found)?;

    if loaded.quiz.owner_id == auth_user.user_id {
        return Ok(Json(loaded).into_response());
    }
    if !can_view(&state.pool, &loaded.quiz, &auth_user).await? {
        return Err(quiz_not_found());
    }
    Ok(Json(loaded.redacted()).into_response())
}

async fn replace_quiz(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
    JsonBody(payload): JsonBody<QuizInput>,
) -> Result<Json<QuizWithQuestions>, ApiError> {
    let valid = payload.validate(true)?;
    let previous = owned_quiz(&state.pool, quiz_id, &auth_user).await?;

    let mut tx = state.pool.begin().await?;
    if !quiz_repo::lock_quiz(&mut *tx, quiz_id).await? {
        return Err(quiz_not_found());
    }
    if quiz_repo::has_submitted_attempts(&mut *tx, quiz_id).await? {
        return Err(ApiError::Conflict(
            "Quiz already has submitted attempts and can no longer be edited".to_string(),
        ));
    }
    let quiz =
        quiz_repo::update_quiz(&mut *tx, quiz_id, &draft_of(&valid, previous.source_set_id)).await?;
    quiz_repo::delete_questions(&mut *tx, quiz_id).await?;
    quiz_repo::insert_questions(&mut *tx, quiz_id, &valid.questions).await?;
    tx.commit().await?;

    invalidate_quiz(
        &state,
        quiz_id,
        previous.visibility == Visibility::Public || quiz.visibility == Visibility::Public,
    );
    tracing::info!(%quiz_id, questions = valid.questions.len(), "Quiz replaced");

    Ok(Json(QuizWithQuestions {
        quiz,
        questions: valid.questions,
    }))
}

async fn delete_quiz(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let quiz = owned_quiz(&state.pool, quiz_id, &auth_user).await?;
    quiz_repo::delete_quiz(&state.pool, quiz_id).await?;

    invalidate_quiz(&state, quiz_id, quiz.visibility == Visibility::Public);
    tracing::info!(%quiz_id, "Quiz deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Assign the quiz to some of the owner's sections
async fn publish_quiz(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
    JsonBody(payload): JsonBody<PublishRequest>,
) -> Result<Json<Quiz>, ApiError> {
    let section_ids = payload.validate()?;
    let mut quiz = owned_quiz(&state.pool, quiz_id, &teacher).await?;

    let owned = section_repo::count_owned(&state.pool, teacher.user_id, &section_ids).await?;
    if owned != section_ids.len() as i64 {
        return Err(ApiError::Validation(
            "Quizzes can only be published to your own sections".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    let assigned = quiz_repo::assign_sections(&mut *tx, quiz_id, &section_ids).await?;
    if quiz.visibility != Visibility::Public {
        quiz_repo::set_visibility(&mut *tx, quiz_id, Visibility::Sections).await?;
        quiz.visibility = Visibility::Sections;
    }
    tx.commit().await?;

    invalidate_quiz(&state, quiz_id, false);
    tracing::info!(%quiz_id, sections = section_ids.len(), assigned, "Quiz published");

    Ok(Json(quiz))
}

async fn rate_quiz(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
    JsonBody(payload): JsonBody<RatingRequest>,
) -> Result<Json<RatingSummary>, ApiError> {
    let rating = payload.validate()?;
    let quiz = viewable_quiz(&state.pool, quiz_id, &auth_user).await?;
    if quiz.owner_id == auth_user.user_id {
        return Err(ApiError::Forbidden(
            "You cannot rate your own quiz".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;
    if !quiz_repo::lock_quiz(&mut *tx, quiz_id).await? {
        return Err(quiz_not_found());
    }
    quiz_repo::upsert_rating(&mut *tx, quiz_id, auth_user.user_id, rating).await?;
    let summary = quiz_repo::refresh_rating(&mut *tx, quiz_id).await?;
    tx.commit().await?;

    invalidate_quiz(&state, quiz_id, quiz.visibility == Visibility::Public);
    tracing::debug!(%quiz_id, rating, avg = summary.rating_avg, "Quiz rated");

    Ok(Json(summary))
}
