use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use chrono::Utc;
use qf_db::{
    models::{Attempt, AttemptStatus, AttemptWithQuiz, AttemptWithUser, GradedSubmission},
    repositories::{attempt as attempt_repo, quiz as quiz_repo},
};
use qf_grading::{Question, grade};
use uuid::Uuid;

use super::model::{
    LiveParticipant, LiveSession, ProgressRequest, StartedAttempt, SubmitRequest, is_idle, is_late,
};
use crate::{
    ApiState,
    auth::{AuthUser, RequireStudent},
    error::ApiError,
    extract::JsonBody,
    metrics::record_quiz_submission,
    middleware::rate_limit,
    quiz::access::{can_view, load_quiz_with_questions, owned_quiz, quiz_not_found},
};

pub fn routes() -> Router<ApiState> {
    use crate::make_rate_limit_layer;

    Router::new()
        .route("/quizzes/{id}/attempts", post(start_attempt).get(list_quiz_attempts))
        .route("/quizzes/{id}/live", get(live_session))
        .route("/attempts", get(list_own_attempts))
        .route("/attempts/{id}", get(get_attempt))
        .route("/attempts/{id}/progress", patch(update_progress))
        .route("/attempts/{id}/submit", post(submit_attempt))
        .layer(make_rate_limit_layer!(
            rate_limit::GENERAL_REPLENISH_PERIOD,
            rate_limit::GENERAL_BURST_SIZE
        ))
}

fn attempt_not_found() -> ApiError {
    ApiError::NotFound("Attempt not found".to_string())
}

fn not_open() -> ApiError {
    ApiError::Conflict("Attempt is no longer in progress".to_string())
}

/// Start an attempt, or resume the one already open for this quiz
async fn start_attempt(
    RequireStudent(student): RequireStudent,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StartedAttempt>), ApiError> {
    let loaded = load_quiz_with_questions(&state, quiz_id)
        .await?
        .ok_or_else(quiz_not_found)?;
    if !can_view(&state.pool, &loaded.quiz, &student).await? {
        return Err(quiz_not_found());
    }

    if let Some(open) = attempt_repo::find_open(&state.pool, quiz_id, student.user_id).await? {
        return Ok((
            StatusCode::OK,
            Json(StartedAttempt {
                attempt: open,
                quiz: loaded.redacted(),
            }),
        ));
    }

    let (status, attempt) =
        match attempt_repo::create_attempt(&state.pool, quiz_id, student.user_id).await? {
            Some(created) => {
                tracing::info!(attempt_id = %created.id, %quiz_id, "Attempt started");
                (StatusCode::CREATED, created)
            }
            // Lost a race with a concurrent start
            None => {
                let open = attempt_repo::find_open(&state.pool, quiz_id, student.user_id)
                    .await?
                    .ok_or_else(not_open)?;
                (StatusCode::OK, open)
            }
        };

    Ok((
        status,
        Json(StartedAttempt {
            attempt,
            quiz: loaded.redacted(),
        }),
    ))
}

async fn own_attempt(state: &ApiState, attempt_id: Uuid, user: &AuthUser) -> Result<Attempt, ApiError> {
    attempt_repo::find_by_id(&state.pool, attempt_id)
        .await?
        .filter(|a| a.user_id == user.user_id)
        .ok_or_else(attempt_not_found)
}

async fn update_progress(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(attempt_id): Path<Uuid>,
    JsonBody(payload): JsonBody<ProgressRequest>,
) -> Result<Json<Attempt>, ApiError> {
    let attempt = own_attempt(&state, attempt_id, &auth_user).await?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(not_open());
    }

    let question_count = load_quiz_with_questions(&state, attempt.quiz_id)
        .await?
        .ok_or_else(quiz_not_found)?
        .questions
        .len();
    payload.validate(question_count)?;

    let updated = attempt_repo::update_progress(
        &state.pool,
        attempt_id,
        payload.answered_count,
        payload.focus_lost_count,
    )
    .await?
    .ok_or_else(not_open)?;

    Ok(Json(updated))
}

async fn submit_attempt(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(attempt_id): Path<Uuid>,
    JsonBody(payload): JsonBody<SubmitRequest>,
) -> Result<Json<Attempt>, ApiError> {
    let mut tx = state.pool.begin().await?;

    let attempt = attempt_repo::find_for_update(&mut *tx, attempt_id)
        .await?
        .filter(|a| a.user_id == auth_user.user_id)
        .ok_or_else(attempt_not_found)?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(ApiError::Conflict(
            "Attempt has already been submitted".to_string(),
        ));
    }

    // Blocks a concurrent replace until this submission commits
    if !quiz_repo::lock_quiz_shared(&mut *tx, attempt.quiz_id).await? {
        return Err(quiz_not_found());
    }
    let quiz = quiz_repo::find_quiz(&mut *tx, attempt.quiz_id)
        .await?
        .ok_or_else(quiz_not_found)?;
    let questions: Vec<Question> = quiz_repo::find_questions(&mut *tx, quiz.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let answers = payload.into_answer_map(&questions)?;
    let report = grade(&questions, &answers);
    let late = is_late(attempt.started_at, quiz.time_limit_minutes, Utc::now());

    let submission = GradedSubmission {
        answers,
        report,
        late,
    };
    let submitted = attempt_repo::submit(&mut *tx, attempt_id, &submission).await?;
    tx.commit().await?;

    record_quiz_submission(late, submission.report.percentage);
    tracing::info!(
        %attempt_id,
        quiz_id = %quiz.id,
        score = submission.report.score,
        max_score = submission.report.max_score,
        late,
        "Attempt submitted"
    );

    Ok(Json(submitted))
}

/// Visible to the student who made it and to the quiz owner
async fn get_attempt(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<Attempt>, ApiError> {
    let attempt = attempt_repo::find_by_id(&state.pool, attempt_id)
        .await?
        .ok_or_else(attempt_not_found)?;

    if attempt.user_id != auth_user.user_id {
        let quiz_owner = quiz_repo::find_quiz(&state.pool, attempt.quiz_id)
            .await?
            .map(|q| q.owner_id);
        if quiz_owner != Some(auth_user.user_id) {
            return Err(attempt_not_found());
        }
    }

    Ok(Json(attempt))
}

async fn list_own_attempts(
    auth_user: AuthUser,
    State(state): State<ApiState>,
) -> Result<Json<Vec<AttemptWithQuiz>>, ApiError> {
    let attempts = attempt_repo::list_for_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(attempts))
}

async fn list_quiz_attempts(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<Vec<AttemptWithUser>>, ApiError> {
    owned_quiz(&state.pool, quiz_id, &auth_user).await?;
    let attempts = attempt_repo::list_for_quiz(&state.pool, quiz_id).await?;
    Ok(Json(attempts))
}

async fn live_session(
    auth_user: AuthUser,
    State(state): State<ApiState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<LiveSession>, ApiError> {
    owned_quiz(&state.pool, quiz_id, &auth_user).await?;

    let total_questions = load_quiz_with_questions(&state, quiz_id)
        .await?
        .ok_or_else(quiz_not_found)?
        .questions
        .len();
    let live = attempt_repo::list_live(&state.pool, quiz_id).await?;
    let stats = attempt_repo::submission_stats(&state.pool, quiz_id).await?;

    let now = Utc::now();
    let in_progress = live
        .into_iter()
        .map(|attempt| LiveParticipant {
            idle: is_idle(attempt.last_heartbeat_at, now),
            attempt,
        })
        .collect();

    Ok(Json(LiveSession {
        quiz_id,
        total_questions,
        in_progress,
        submitted_count: stats.submitted_count,
        average_percentage: stats.average_percentage,
    }))
}
