//! Quiz visibility checks shared by the quiz and attempt routes.

use qf_db::{
    models::{Quiz, Visibility},
    repositories::quiz as quiz_repo,
};
use qf_grading::Question;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::QuizWithQuestions;
use crate::{ApiState, auth::AuthUser, cache::keys, error::ApiError};

pub fn quiz_not_found() -> ApiError {
    ApiError::NotFound("Quiz not found".to_string())
}

/// Whether `user` may see `quiz`
pub async fn can_view(pool: &PgPool, quiz: &Quiz, user: &AuthUser) -> Result<bool, ApiError> {
    if quiz.owner_id == user.user_id {
        return Ok(true);
    }
    Ok(match quiz.visibility {
        Visibility::Public => true,
        Visibility::Sections => quiz_repo::is_assigned_to_user(pool, quiz.id, user.user_id).await?,
        Visibility::Private => false,
    })
}

/// Load a quiz the user may see; hidden quizzes are reported as missing
pub async fn viewable_quiz(pool: &PgPool, quiz_id: Uuid, user: &AuthUser) -> Result<Quiz, ApiError> {
    let quiz = quiz_repo::find_quiz(pool, quiz_id)
        .await?
        .ok_or_else(quiz_not_found)?;

    if can_view(pool, &quiz, user).await? {
        Ok(quiz)
    } else {
        Err(quiz_not_found())
    }
}

/// Load a quiz owned by `user`
pub async fn owned_quiz(pool: &PgPool, quiz_id: Uuid, user: &AuthUser) -> Result<Quiz, ApiError> {
    quiz_repo::find_quiz(pool, quiz_id)
        .await?
        .filter(|q| q.owner_id == user.user_id)
        .ok_or_else(quiz_not_found)
}

/// Quiz and questions, from the cache when possible
pub async fn load_quiz_with_questions(
    state: &ApiState,
    quiz_id: Uuid,
) -> Result<Option<QuizWithQuestions>, ApiError> {
    let key = keys::quiz(quiz_id);
    if let Some(cached) = state.cache.get::<QuizWithQuestions>(&key) {
        return Ok(Some(cached));
    }

    let Some(quiz) = quiz_repo::find_quiz(&state.pool, quiz_id).await? else {
        return Ok(None);
    };
    let questions: Vec<Question> = quiz_repo::find_questions(&state.pool, quiz_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let loaded = QuizWithQuestions { quiz, questions };
    state.cache.set(key, &loaded);
    Ok(Some(loaded))
}
